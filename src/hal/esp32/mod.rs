//! ESP32 hardware abstraction layer for the garage door monitor.
//!
//! This module provides hardware implementations for an ESP32 board with
//! reed switches on three garage doors and a status LED.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32 (esp-idf)
//! - **Sensors**: Magnetic reed switches to ground, internal pull-ups
//! - **Status LED**: On-board LED, blinks while the loop is alive
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments.

mod clock;
mod inputs;
mod status;

pub use clock::Esp32Clock;
pub use inputs::{Esp32Inputs, InputError};
pub use status::Esp32StatusLed;

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-mqtt")]
mod mqtt;
#[cfg(feature = "esp32-mqtt")]
pub use mqtt::{Esp32Mqtt, Esp32MqttError};

/// Pin assignments.
///
/// These constants match the stock wiring:
/// - Door reed switches on GPIO13, 12 and 14 (D7, D6, D5)
/// - Status LED on GPIO2 (D4)
pub mod pins {
    // =========================================================================
    // Door sensors
    // =========================================================================

    /// Garage door 1 reed switch
    pub const DOOR_1: u8 = 13;

    /// Garage door 2 reed switch
    pub const DOOR_2: u8 = 12;

    /// Garage door 3 reed switch
    pub const DOOR_3: u8 = 14;

    // =========================================================================
    // Outputs
    // =========================================================================

    /// Status LED
    pub const STATUS_LED: u8 = 2;
}
