//! Desktop transports for the connectivity manager.
//!
//! This module provides a network-backed [`MqttClient`](crate::traits::MqttClient)
//! for running the monitor on a desktop or server:
//! - `mqtt` feature: rumqttc session driven by a tokio task, plus a
//!   host network link that is always up
//!
//! ```ignore
//! use garage_sentry::services::{HostLink, MqttRuntimeConfig, RumqttSession};
//!
//! let session = RumqttSession::new(
//!     MqttRuntimeConfig::from_config(&config.mqtt),
//!     tokio::runtime::Handle::current(),
//! );
//! let monitor = GarageMonitor::new(&config, inputs, session, HostLink, indicator, status)?;
//! ```

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::{HostLink, MqttError, MqttRuntimeConfig, RumqttSession};
