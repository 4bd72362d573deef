//! Hardware abstraction traits for sensor inputs, status output and time.
//!
//! This module defines the hardware interfaces that allow garage-sentry to
//! run on the ESP32 as well as on a desktop with mocks.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`InputBank`] | Raw level reads for the reed sensor pins |
//! | [`StatusOutput`] | Single binary output (status LED) |
//! | [`Clock`] | Wrapping millisecond time source |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use garage_sentry::traits::{InputBank, PullMode};
//! use garage_sentry::hal::MockInputs;
//!
//! let mut inputs = MockInputs::new();
//! inputs.configure(13, PullMode::PullUp).unwrap();
//! inputs.set(13, true);
//! assert!(inputs.read(13));
//! ```

/// Electrical configuration requested for an input pin.
///
/// Reed switches are usually wired to ground with the internal pull-up
/// enabled, so an open switch reads high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PullMode {
    /// No internal resistor.
    Floating,
    /// Internal pull-up enabled.
    #[default]
    PullUp,
    /// Internal pull-down enabled.
    PullDown,
}

impl PullMode {
    /// Returns the mode as a lowercase string.
    ///
    /// ```
    /// use garage_sentry::traits::PullMode;
    ///
    /// assert_eq!(PullMode::PullUp.as_str(), "pull_up");
    /// assert_eq!(PullMode::Floating.as_str(), "floating");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PullMode::Floating => "floating",
            PullMode::PullUp => "pull_up",
            PullMode::PullDown => "pull_down",
        }
    }
}

/// A bank of digital input lines addressed by pin number.
///
/// The debouncer owns one of these and reads every registered pin once per
/// tick. Reads must not block.
///
/// # Implementation Notes
///
/// - `configure` is called once per pin when a channel is registered
/// - `read` returns the raw electrical level (`true` = high), before any
///   inversion
pub trait InputBank {
    /// Error type for pin configuration.
    type Error: core::fmt::Debug;

    /// Configure `pin` as an input with the given pull mode.
    fn configure(&mut self, pin: u8, mode: PullMode) -> Result<(), Self::Error>;

    /// Read the raw level of `pin`.
    fn read(&mut self, pin: u8) -> bool;
}

/// A single binary output, typically the status LED.
pub trait StatusOutput {
    /// Drive the output high (`true`) or low (`false`).
    fn set_level(&mut self, high: bool);
}

/// Time source trait for `no_std` compatibility.
///
/// Provides a millisecond counter that wraps at `u32::MAX`, like the
/// Arduino-style `millis()` found on most microcontrollers. All consumers
/// compare timestamps with [`elapsed_ms`], never directly, so the wrap is
/// harmless for intervals much shorter than ~49 days.
///
/// # Example
///
/// ```rust
/// use garage_sentry::traits::Clock;
/// use garage_sentry::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be non-decreasing modulo `2^32`.
    fn now_ms(&self) -> u32;
}

/// Milliseconds elapsed from `since` to `now`, tolerant of counter wrap.
///
/// ```
/// use garage_sentry::traits::elapsed_ms;
///
/// assert_eq!(elapsed_ms(150, 100), 50);
/// assert_eq!(elapsed_ms(10, u32::MAX - 9), 20);
/// ```
#[inline]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}
