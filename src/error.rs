//! Error type for the monitor core.
//!
//! Only capacity exhaustion, bad door references and rejected input pins
//! are errors. Stale timer
//! handles are silent no-ops and transport failures are recovered inside
//! the connectivity manager, so neither shows up here.

use core::fmt;

/// Errors returned by registration operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Every debouncer channel slot is in use.
    ChannelCapacity,
    /// Every scheduler timer slot is in use.
    TimerCapacity,
    /// The monitor cannot track another door.
    DoorCapacity,
    /// No door with this number is registered.
    UnknownDoor(u8),
    /// The input bank rejected the pin configuration.
    InputConfig(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelCapacity => write!(f, "debouncer channel capacity exhausted"),
            Self::TimerCapacity => write!(f, "timer capacity exhausted"),
            Self::DoorCapacity => write!(f, "door capacity exhausted"),
            Self::UnknownDoor(id) => write!(f, "unknown door {id}"),
            Self::InputConfig(pin) => write!(f, "input pin {pin} could not be configured"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
