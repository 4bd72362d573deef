//! rumqttc-backed MQTT session.
//!
//! [`RumqttSession`] implements the synchronous [`MqttClient`] trait on top
//! of rumqttc's `AsyncClient`. Each [`connect`](MqttClient::connect) spawns
//! a task that drives the event loop and reports the broker's ConnAck and
//! any connection error through a channel, which
//! [`poll_event`](MqttClient::poll_event) drains without blocking.
//!
//! The event loop task ends at the first connection error instead of
//! letting rumqttc reconnect by itself, so retry timing stays with the
//! connectivity manager's backoff.
//!
//! **Publish Topics:**
//! - `SENSOR/<device>/PORT/<door>` - `Garage Door <n> => Open` / `Close`
//! - `ALERT/<device>/PORT/<door>` - `Garage Door <n> => Open for <m> minutes`
//! - `SENSOR/<device>/STATUS` - `STARTED`, then `ACTIVE` every heartbeat

use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MqttConfig as SharedMqttConfig;
use crate::traits::{ConnectStatus, LinkEvent, MqttClient, NetworkLink, SessionEvent};

/// Requests buffered between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 10;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// This struct uses `String` for runtime compatibility with the `rumqttc` library.
/// For embedded/no-alloc contexts, use [`crate::config::MqttConfig`] which uses
/// fixed-size `ShortString` types and convert with [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Username and password, if the broker requires them
    pub credentials: Option<(String, String)>,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "garage-sentry".to_string(),
            credentials: None,
            keep_alive_secs: 30,
        }
    }
}

impl MqttRuntimeConfig {
    /// Create a new config with the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &SharedMqttConfig) -> Self {
        let credentials = config.has_auth().then(|| {
            (
                config.username.as_str().to_string(),
                config.password.as_str().to_string(),
            )
        });
        Self {
            host: config.host.as_str().to_string(),
            port: config.port,
            client_id: config.client_id.as_str().to_string(),
            credentials,
            keep_alive_secs: config.keep_alive_secs,
        }
    }

    /// Set the client ID
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set the broker credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs as u64));
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

// ============================================================================
// Session
// ============================================================================

/// MQTT session over rumqttc, polled from the monitor loop.
pub struct RumqttSession {
    config: MqttRuntimeConfig,
    runtime: Handle,
    client: Option<AsyncClient>,
    task: Option<JoinHandle<()>>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    connected: bool,
}

impl RumqttSession {
    /// Create a session that spawns its event loop on `runtime`.
    ///
    /// Nothing is sent until [`MqttClient::connect`].
    pub fn new(config: MqttRuntimeConfig, runtime: Handle) -> Self {
        Self {
            config,
            runtime,
            client: None,
            task: None,
            events: None,
            connected: false,
        }
    }

    /// The broker configuration.
    pub fn config(&self) -> &MqttRuntimeConfig {
        &self.config
    }

    fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.client = None;
        self.events = None;
        self.connected = false;
    }
}

impl Drop for RumqttSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl MqttClient for RumqttSession {
    type Error = MqttError;

    fn connect(&mut self) -> Result<ConnectStatus, Self::Error> {
        self.teardown();

        let (client, mut eventloop) = AsyncClient::new(self.config.options(), REQUEST_CAPACITY);
        let (tx, rx) = mpsc::unbounded_channel();

        info!(
            "mqtt: connecting to {}:{}",
            self.config.host, self.config.port
        );
        let task = self.runtime.spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        debug!("mqtt: connack {:?}", ack.code);
                        if tx.send(SessionEvent::Connected).is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("mqtt: event loop error: {}", e);
                        let _ = tx.send(SessionEvent::Disconnected);
                        return;
                    }
                }
            }
        });

        self.client = Some(client);
        self.task = Some(task);
        self.events = Some(rx);
        Ok(ConnectStatus::Pending)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(MqttError::NotConnected);
        }
        let client = self.client.as_ref().ok_or(MqttError::NotConnected)?;
        client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.to_vec())
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn poll_event(&mut self) -> Option<SessionEvent> {
        let rx = self.events.as_mut()?;
        match rx.try_recv() {
            Ok(SessionEvent::Connected) => {
                self.connected = true;
                Some(SessionEvent::Connected)
            }
            Ok(SessionEvent::Disconnected) => {
                self.teardown();
                Some(SessionEvent::Disconnected)
            }
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                let was_connected = self.connected;
                self.teardown();
                was_connected.then_some(SessionEvent::Disconnected)
            }
        }
    }
}

// ============================================================================
// Host link
// ============================================================================

/// Network link of a desktop host. The operating system manages the
/// interface, so the link is always reported up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostLink;

impl NetworkLink for HostLink {
    type Error = core::convert::Infallible;

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_up(&self) -> bool {
        true
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        None
    }
}

/// MQTT-related errors
#[derive(Debug)]
pub enum MqttError {
    /// No session to publish on
    NotConnected,
    /// Failed to publish message
    Publish(String),
}

impl std::fmt::Display for MqttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "MQTT not connected"),
            Self::Publish(e) => write!(f, "MQTT publish error: {}", e),
        }
    }
}

impl std::error::Error for MqttError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttConfig;

    // ========================================================================
    // MqttRuntimeConfig tests
    // ========================================================================

    #[test]
    fn test_mqtt_config_default() {
        let config = MqttRuntimeConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.client_id, "garage-sentry");
        assert_eq!(config.credentials, None);
        assert_eq!(config.keep_alive_secs, 30);
    }

    #[test]
    fn test_mqtt_config_new() {
        let config = MqttRuntimeConfig::new("mqtt.example.com", 8883);
        assert_eq!(config.host, "mqtt.example.com");
        assert_eq!(config.port, 8883);
        // Other fields should be defaults
        assert_eq!(config.client_id, "garage-sentry");
    }

    #[test]
    fn test_mqtt_config_from_shared() {
        let shared = MqttConfig::default()
            .with_host("broker.local")
            .with_port(1884)
            .with_auth("garage", "hunter2");
        let config = MqttRuntimeConfig::from_config(&shared);
        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 1884);
        assert_eq!(
            config.credentials,
            Some(("garage".to_string(), "hunter2".to_string()))
        );
    }

    #[test]
    fn test_mqtt_config_from_shared_without_auth() {
        let config = MqttRuntimeConfig::from_config(&MqttConfig::default());
        assert_eq!(config.credentials, None);
    }

    // ========================================================================
    // Session tests
    // ========================================================================

    #[tokio::test]
    async fn test_publish_before_connect_fails() {
        let mut session = RumqttSession::new(MqttRuntimeConfig::default(), Handle::current());
        assert!(!session.is_connected());
        assert!(matches!(
            session.publish("SENSOR/GARAGE/STATUS", b"ACTIVE", false),
            Err(MqttError::NotConnected)
        ));
        assert_eq!(session.poll_event(), None);
    }

    #[tokio::test]
    async fn test_refused_connect_reports_disconnected() {
        // Nothing listens on port 1
        let config = MqttRuntimeConfig::new("127.0.0.1", 1);
        let mut session = RumqttSession::new(config, Handle::current());
        assert_eq!(session.connect().unwrap(), ConnectStatus::Pending);

        let mut event = None;
        for _ in 0..100 {
            event = session.poll_event();
            if event.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(event, Some(SessionEvent::Disconnected));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_host_link_always_up() {
        let mut link = HostLink;
        assert!(link.is_up());
        assert!(link.reconnect().is_ok());
        assert_eq!(link.poll_event(), None);
    }
}
