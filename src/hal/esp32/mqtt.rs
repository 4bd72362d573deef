//! MQTT session for ESP32.
//!
//! Publishes through esp-idf-svc's `EspMqttClient`. The client's connection
//! is drained on a background thread that forwards connect and disconnect
//! notifications over a channel; [`MqttClient::poll_event`] reads that
//! channel without blocking.
//!
//! The esp-idf client reconnects on its own once created, so `connect`
//! only creates the client the first time and afterwards reports the
//! attempt as pending.
//!
//! # Example
//!
//! ```ignore
//! use garage_sentry::hal::esp32::Esp32Mqtt;
//! use garage_sentry::config::MqttConfig;
//! use garage_sentry::traits::MqttClient;
//!
//! let config = MqttConfig::default().with_host("192.168.1.100");
//! let mut mqtt = Esp32Mqtt::new(&config);
//! mqtt.connect()?;
//! ```

use crate::config::MqttConfig;
use crate::traits::{ConnectStatus, MqttClient, SessionEvent};
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use log::{debug, info, warn};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

/// Error type for ESP32 MQTT operations.
#[derive(Debug)]
pub struct Esp32MqttError(pub String);

impl core::fmt::Display for Esp32MqttError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "MQTT error: {}", self.0)
    }
}

impl std::error::Error for Esp32MqttError {}

/// MQTT session over esp-idf-svc.
pub struct Esp32Mqtt {
    config: MqttConfig,
    client: Option<EspMqttClient<'static>>,
    events: Option<Receiver<SessionEvent>>,
    connected: bool,
}

impl Esp32Mqtt {
    /// Prepare a session for the broker in `config`. Nothing is sent until
    /// [`MqttClient::connect`].
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            config: config.clone(),
            client: None,
            events: None,
            connected: false,
        }
    }

    fn create_client(&mut self) -> Result<(), Esp32MqttError> {
        let broker_url = format!("mqtt://{}:{}", self.config.host.as_str(), self.config.port);

        let username = self.config.has_auth().then(|| self.config.username.as_str());
        let password = self.config.has_auth().then(|| self.config.password.as_str());
        let mqtt_config = MqttClientConfiguration {
            client_id: Some(self.config.client_id.as_str()),
            username,
            password,
            keep_alive_interval: Some(Duration::from_secs(self.config.keep_alive_secs as u64)),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(&broker_url, &mqtt_config)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;

        let (tx, rx) = channel::<SessionEvent>();
        thread::Builder::new()
            .stack_size(6 * 1024)
            .spawn(move || handle_mqtt_events(&mut connection, tx))
            .map_err(|e| Esp32MqttError(e.to_string()))?;

        info!("mqtt: client created for {}", broker_url);
        self.client = Some(client);
        self.events = Some(rx);
        Ok(())
    }
}

// ============================================================================
// MqttClient Trait Implementation
// ============================================================================

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn connect(&mut self) -> Result<ConnectStatus, Self::Error> {
        if self.client.is_none() {
            self.create_client()?;
        } else if self.connected {
            return Ok(ConnectStatus::Connected);
        }
        Ok(ConnectStatus::Pending)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| Esp32MqttError("not connected".into()))?;
        client
            .enqueue(topic, QoS::AtMostOnce, retain, payload)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn poll_event(&mut self) -> Option<SessionEvent> {
        let rx = self.events.as_ref()?;
        match rx.try_recv() {
            Ok(event) => {
                self.connected = event == SessionEvent::Connected;
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.events = None;
                self.client = None;
                if self.connected {
                    self.connected = false;
                    Some(SessionEvent::Disconnected)
                } else {
                    None
                }
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn handle_mqtt_events(connection: &mut EspMqttConnection, tx: Sender<SessionEvent>) {
    loop {
        match connection.next() {
            Err(e) => {
                warn!("mqtt: connection closed: {:?}", e);
                return;
            }
            Ok(event) => {
                let forwarded = match event.payload() {
                    EventPayload::Connected(_) => Some(SessionEvent::Connected),
                    EventPayload::Disconnected => Some(SessionEvent::Disconnected),
                    other => {
                        debug!("mqtt: {:?}", other);
                        None
                    }
                };
                if let Some(session_event) = forwarded {
                    if tx.send(session_event).is_err() {
                        return;
                    }
                }
            }
        }
    }
}
