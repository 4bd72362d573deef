//! Outgoing MQTT topics and payloads.
//!
//! Everything the monitor publishes goes through [`Notification`], which
//! renders into fixed-capacity strings so no allocation is needed.
//!
//! | Notification | Topic | Payload |
//! |--------------|-------|---------|
//! | `DoorOpened` | `SENSOR/<device>/PORT/<n>` | `Garage Door <n> => Open` |
//! | `DoorClosed` | `SENSOR/<device>/PORT/<n>` | `Garage Door <n> => Close` |
//! | `OpenTooLong` | `ALERT/<device>/PORT/<n>` | `Garage Door <n> => Open for <m> minutes` |
//! | `Started` | `SENSOR/<device>/STATUS` | `STARTED` |
//! | `Heartbeat` | `SENSOR/<device>/STATUS` | `ACTIVE` |
//!
//! # Example
//!
//! ```
//! use garage_sentry::messages::Notification;
//!
//! let alert = Notification::OpenTooLong { door: 1, minutes: 10 };
//! assert_eq!(alert.topic("GARAGE").as_str(), "ALERT/GARAGE/PORT/1");
//! assert_eq!(alert.payload().as_str(), "Garage Door 1 => Open for 10 minutes");
//! ```

use core::fmt::Write;

use heapless::String as HString;

use crate::config::LongString;

/// Maximum payload length.
pub const MAX_PAYLOAD: usize = 64;

/// Rendered topic.
pub type Topic = LongString;

/// Rendered payload.
pub type Payload = HString<MAX_PAYLOAD>;

/// Payload published once per successful session connect.
pub const STATUS_STARTED: &str = "STARTED";

/// Payload of the periodic liveness beacon.
pub const STATUS_ACTIVE: &str = "ACTIVE";

// ============================================================================
// Notification
// ============================================================================

/// A message the monitor wants delivered to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Door `door` went from closed to open.
    DoorOpened {
        /// 1-based door number
        door: u8,
    },
    /// Door `door` went from open to closed.
    DoorClosed {
        /// 1-based door number
        door: u8,
    },
    /// Door `door` has now been open for `minutes` in total.
    OpenTooLong {
        /// 1-based door number
        door: u8,
        /// Cumulative open time
        minutes: u32,
    },
    /// The session just came up.
    Started,
    /// Periodic liveness beacon.
    Heartbeat,
}

impl Notification {
    /// Door state change for `door`.
    pub fn door_state(door: u8, open: bool) -> Self {
        if open {
            Self::DoorOpened { door }
        } else {
            Self::DoorClosed { door }
        }
    }

    /// Status messages are tied to the current session and are never
    /// held back for later delivery.
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Started | Self::Heartbeat)
    }

    /// Topic under the given device name.
    pub fn topic(&self, device: &str) -> Topic {
        match *self {
            Self::DoorOpened { door } | Self::DoorClosed { door } => state_topic(device, door),
            Self::OpenTooLong { door, .. } => alert_topic(device, door),
            Self::Started | Self::Heartbeat => status_topic(device),
        }
    }

    /// Payload text.
    pub fn payload(&self) -> Payload {
        let mut out = Payload::new();
        let _ = match *self {
            Self::DoorOpened { door } => write!(out, "Garage Door {door} => Open"),
            Self::DoorClosed { door } => write!(out, "Garage Door {door} => Close"),
            Self::OpenTooLong { door, minutes } => {
                write!(out, "Garage Door {door} => Open for {minutes} minutes")
            }
            Self::Started => out.push_str(STATUS_STARTED).map_err(|_| core::fmt::Error),
            Self::Heartbeat => out.push_str(STATUS_ACTIVE).map_err(|_| core::fmt::Error),
        };
        out
    }
}

// ============================================================================
// Topic builders
// ============================================================================

/// `SENSOR/<device>/PORT/<door>`
pub fn state_topic(device: &str, door: u8) -> Topic {
    let mut topic = Topic::new();
    let _ = write!(topic, "SENSOR/{device}/PORT/{door}");
    topic
}

/// `ALERT/<device>/PORT/<door>`
pub fn alert_topic(device: &str, door: u8) -> Topic {
    let mut topic = Topic::new();
    let _ = write!(topic, "ALERT/{device}/PORT/{door}");
    topic
}

/// `SENSOR/<device>/STATUS`
pub fn status_topic(device: &str) -> Topic {
    let mut topic = Topic::new();
    let _ = write!(topic, "SENSOR/{device}/STATUS");
    topic
}

// ============================================================================
// Tests
// ============================================================================
