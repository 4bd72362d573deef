//! Network abstraction traits for the link layer and the MQTT session.
//!
//! The connectivity manager is written against these two traits so the
//! same reconnect state machine runs on the ESP32 (esp-idf WiFi + MQTT) and
//! on a desktop (rumqttc), and under test with mocks.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`NetworkLink`] | WiFi (or other) link: reconnect requests and up/down events |
//! | [`MqttClient`] | Pub/sub session: connect, publish, session events |
//!
//! # Topics
//!
//! ```text
//! SENSOR/<device>/PORT/<door>  - door opened / closed
//! ALERT/<device>/PORT/<door>   - door open too long
//! SENSOR/<device>/STATUS       - STARTED / ACTIVE heartbeat
//! ```
//!
//! # Polling model
//!
//! Neither trait may block for long. Transports that run their own event
//! loop (threads, callbacks) buffer what they observe and hand it out
//! through `poll_event`, which the monitor drains once per loop tick.

/// Link-layer notifications delivered to the connectivity manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link is associated and has an address.
    Up,
    /// The link was lost.
    Down,
}

/// Session-layer notifications delivered to the connectivity manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The broker acknowledged the connection.
    Connected,
    /// The session dropped (or an asynchronous connect attempt failed).
    Disconnected,
}

/// Outcome of a successful [`MqttClient::connect`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectStatus {
    /// The session is established now.
    Connected,
    /// The attempt is in flight; completion arrives as a [`SessionEvent`].
    Pending,
}

/// Network link (WiFi station or similar).
pub trait NetworkLink {
    /// Error type for link operations.
    type Error: core::fmt::Debug;

    /// Start (or restart) an association attempt. Must not block until
    /// the link is up; success is reported as [`LinkEvent::Up`].
    fn reconnect(&mut self) -> Result<(), Self::Error>;

    /// Whether the link currently has connectivity.
    fn is_up(&self) -> bool;

    /// Whether an association attempt the link started itself is still in
    /// flight. The connectivity manager leaves such an attempt alone at
    /// start-up instead of restarting it.
    fn is_associating(&self) -> bool {
        false
    }

    /// Next pending link notification, if any (non-blocking).
    fn poll_event(&mut self) -> Option<LinkEvent>;
}

/// Link and session for a device running without a network.
///
/// The link never comes up, so no session is ever attempted and door
/// notifications go to the offline policy.
///
/// ```rust
/// use garage_sentry::traits::{MqttClient, NetworkLink, Offline};
///
/// let mut link = Offline;
/// assert!(link.reconnect().is_ok());
/// assert!(!link.is_up());
/// assert_eq!(NetworkLink::poll_event(&mut link), None);
/// assert!(!MqttClient::is_connected(&link));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offline;

impl NetworkLink for Offline {
    type Error = core::convert::Infallible;

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_up(&self) -> bool {
        false
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        None
    }
}

impl MqttClient for Offline {
    type Error = core::convert::Infallible;

    fn connect(&mut self) -> Result<ConnectStatus, Self::Error> {
        Ok(ConnectStatus::Pending)
    }

    fn publish(&mut self, _topic: &str, _payload: &[u8], _retain: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn poll_event(&mut self) -> Option<SessionEvent> {
        None
    }
}

/// MQTT client trait for the pub/sub session.
///
/// This trait uses a **sync-first design** that works on both ESP32
/// (blocking I/O with an event thread) and desktop (rumqttc with an
/// event thread). Reconnection policy lives in
/// [`ConnectivityManager`](crate::connectivity::ConnectivityManager), not
/// in the client.
///
/// # Example
///
/// ```rust
/// use garage_sentry::hal::MockMqtt;
/// use garage_sentry::traits::{ConnectStatus, MqttClient};
///
/// let mut mqtt = MockMqtt::new();
/// assert_eq!(mqtt.connect(), Ok(ConnectStatus::Connected));
/// mqtt.publish("SENSOR/GARAGE/STATUS", b"ACTIVE", false).unwrap();
/// assert_eq!(mqtt.published_to("SENSOR/GARAGE/STATUS").len(), 1);
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error: core::fmt::Debug;

    /// Attempt to establish the session.
    fn connect(&mut self) -> Result<ConnectStatus, Self::Error>;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;

    /// Next pending session notification, if any (non-blocking).
    fn poll_event(&mut self) -> Option<SessionEvent>;
}
