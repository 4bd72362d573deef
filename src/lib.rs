//! # garage-sentry
//!
//! A garage door monitor: debounced reed switch inputs, per-door open
//! tracking with repeating "open too long" alerts, and MQTT notifications
//! over a link that is allowed to come and go.
//!
//! ## Features
//!
//! - **Debouncing**: Multi-channel debouncer with per-channel edge policy
//!   (skip rising, skip falling, invert, fast callback)
//! - **Cooperative timers**: Periodic, one-shot and oscillating timers driven
//!   from the main loop, with generation-checked handles
//! - **Door tracking**: One state machine per door, alerting every interval
//!   while a door stays open
//! - **Resilient connectivity**: Non-blocking link and session reconnects
//!   with backoff, heartbeat, and an offline queue
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and network abstractions
//! - `debounce` - Input debouncer
//! - `timer` - Timer scheduler
//! - `door` - Per-door state machine
//! - `connectivity` - Link and MQTT session supervision
//! - `monitor` - Context object that ties everything together
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use garage_sentry::{
//!     config::Config,
//!     hal::{MockIndicator, MockInputs, MockLink, MockMqtt, MockOutput},
//!     GarageMonitor,
//! };
//!
//! let mut monitor = GarageMonitor::new(
//!     &Config::default(),
//!     MockInputs::new(),
//!     MockMqtt::new(),
//!     MockLink::up(),
//!     MockIndicator::new(),
//!     MockOutput::new(),
//! )
//! .unwrap();
//! monitor.start(0).unwrap();
//!
//! // Update in your main loop
//! monitor.poll(20);
//! assert!(monitor.connectivity().is_connected());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Link and MQTT session supervision with backoff reconnects.
pub mod connectivity;
/// Multi-channel input debouncer.
pub mod debounce;
/// Per-door open/closed state machine.
pub mod door;
/// Error type for registration operations.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Outgoing MQTT topics and payloads.
pub mod messages;
/// The monitor context object.
pub mod monitor;
/// Cooperative software timers.
pub mod timer;
/// Core traits for hardware and network abstraction.
pub mod traits;

/// Shared configuration system for desktop and ESP32.
pub mod config;

/// Desktop network services (feature-gated).
#[cfg(feature = "mqtt")]
pub mod services;

// Re-exports for convenience
pub use connectivity::{Backoff, ConnectivityManager, LinkState, SessionState};
pub use debounce::{ChannelHandle, DebounceSettings, Debouncer, Edge, EdgeHandler};
pub use door::DoorTracker;
pub use error::Error;
pub use messages::Notification;
pub use monitor::{GarageMonitor, MonitorTimer, Timers};
pub use timer::{Scheduler, TimerHandle, TimerHandler, TimerKind};
pub use traits::{
    // Hardware
    Clock,
    // Network
    ConnectStatus,
    // Display
    Indicator,
    InputBank,
    LinkEvent,
    MqttClient,
    NetworkLink,
    PullMode,
    Rgb,
    SessionEvent,
    StatusOutput,
};

// Config re-exports
pub use config::{
    Config, DeviceConfig, DoorConfig, MqttConfig, OfflinePolicy, ReconnectConfig, TimingConfig,
    WifiConfig,
};
