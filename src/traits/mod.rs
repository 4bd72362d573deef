//! Trait definitions for hardware and network abstraction.
//!
//! This module defines the collaborator boundaries that allow garage-sentry
//! to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Use different network implementations (esp-idf, rumqttc)
//! - Drive whatever status indicator is fitted
//!
//! # Submodules
//!
//! - `hardware`: Input bank, status output, clock
//! - `network`: Network link and MQTT session traits
//! - `display`: Per-door colour indicator

pub mod display;
pub mod hardware;
pub mod network;

pub use display::*;
pub use hardware::*;
pub use network::*;
