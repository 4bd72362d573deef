//! Multi-channel input debouncer.
//!
//! [`Debouncer`] samples every registered pin once per [`update`](Debouncer::update)
//! and reports an [`Edge`] only after the raw level has held still for
//! longer than the bounce delay. Every wobble of the line restarts the
//! stabilisation window.
//!
//! # Settings
//!
//! Per-channel [`DebounceSettings`] flags combine freely:
//!
//! | Flag | Effect |
//! |------|--------|
//! | `SKIP_RISING` | no callback when the reported state becomes `true` |
//! | `SKIP_FALLING` | no callback when the reported state becomes `false` |
//! | `INVERT` | reported state is the inverse of the raw level |
//! | `FAST_CALLBACK` | fire on the first change; noise may cause spurious edges |
//!
//! # Example
//!
//! ```rust
//! use garage_sentry::debounce::{Debouncer, DebounceSettings, Edge};
//! use garage_sentry::hal::MockInputs;
//! use garage_sentry::traits::PullMode;
//!
//! let mut debouncer: Debouncer<MockInputs, u8> = Debouncer::new(MockInputs::new());
//! debouncer.set_bounce_delay(50);
//! debouncer
//!     .add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL)
//!     .unwrap();
//!
//! let mut edges = Vec::new();
//! debouncer.inputs_mut().set(13, true);
//! debouncer.update(100, &mut |door: &u8, edge: Edge| edges.push((*door, edge.state)));
//! debouncer.update(151, &mut |door: &u8, edge: Edge| edges.push((*door, edge.state)));
//! assert_eq!(edges, vec![(1, true)]);
//! ```

use core::ops::{BitOr, BitOrAssign};

use heapless::Vec;
use log::{debug, warn};

use crate::error::Error;
use crate::traits::{elapsed_ms, InputBank, PullMode};

/// Default number of channels a debouncer can hold.
pub const DEFAULT_CAPACITY: usize = 5;

/// Default stabilisation window in milliseconds.
pub const DEFAULT_BOUNCE_DELAY_MS: u32 = 10;

/// Per-channel reporting flags.
///
/// ```
/// use garage_sentry::debounce::DebounceSettings;
///
/// let s = DebounceSettings::SKIP_RISING | DebounceSettings::INVERT;
/// assert!(s.contains(DebounceSettings::INVERT));
/// assert!(!s.contains(DebounceSettings::FAST_CALLBACK));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebounceSettings(u8);

impl DebounceSettings {
    /// No flags.
    pub const NORMAL: Self = Self(0x00);
    /// Suppress callbacks for reported `true` (rising) edges.
    pub const SKIP_RISING: Self = Self(0x01);
    /// Suppress callbacks for reported `false` (falling) edges.
    pub const SKIP_FALLING: Self = Self(0x02);
    /// Report the inverse of the raw level.
    pub const INVERT: Self = Self(0x04);
    /// Fire on the first observed change instead of waiting for the line
    /// to settle.
    pub const FAST_CALLBACK: Self = Self(0x08);

    const ALL: u8 = 0x0F;

    /// Builds settings from raw bits, ignoring unknown bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DebounceSettings {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DebounceSettings {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A debounced transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Pin the transition was observed on.
    pub pin: u8,
    /// Reported state after inversion (`true` = rising).
    pub state: bool,
}

/// Receives debounced edges from [`Debouncer::update`].
///
/// `callback` is the tag the channel was registered with. Closures of the
/// form `FnMut(&C, Edge)` implement this trait directly.
pub trait EdgeHandler<C> {
    /// Called once per committed, non-suppressed edge.
    fn on_edge(&mut self, callback: &C, edge: Edge);
}

impl<C, F> EdgeHandler<C> for F
where
    F: FnMut(&C, Edge),
{
    fn on_edge(&mut self, callback: &C, edge: Edge) {
        self(callback, edge)
    }
}

/// Opaque reference to a registered channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelHandle(u8);

impl ChannelHandle {
    /// Registration index of the channel.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Channel<C> {
    pin: u8,
    callback: C,
    settings: DebounceSettings,
    state: bool,
    transient: bool,
    last_change_ms: u32,
}

/// Fixed-capacity debouncer over an owned [`InputBank`].
///
/// # Type Parameters
///
/// - `I`: the input bank that provides raw levels
/// - `C`: callback tag stored per channel and handed back on each edge
/// - `N`: channel capacity (at most 255)
pub struct Debouncer<I: InputBank, C, const N: usize = DEFAULT_CAPACITY> {
    inputs: I,
    channels: Vec<Channel<C>, N>,
    bounce_delay_ms: u32,
}

impl<I: InputBank, C, const N: usize> Debouncer<I, C, N> {
    /// Create an empty debouncer with the default bounce delay.
    pub fn new(inputs: I) -> Self {
        const { assert!(N <= u8::MAX as usize, "channel capacity must fit in a u8") };
        Self {
            inputs,
            channels: Vec::new(),
            bounce_delay_ms: DEFAULT_BOUNCE_DELAY_MS,
        }
    }

    /// Set the stabilisation window applied to every channel.
    pub fn set_bounce_delay(&mut self, delay_ms: u32) {
        self.bounce_delay_ms = delay_ms;
    }

    /// Current stabilisation window.
    pub fn bounce_delay(&self) -> u32 {
        self.bounce_delay_ms
    }

    /// Register a channel.
    ///
    /// The pin is configured with `mode` and read once; that level becomes
    /// both the stable and the transient state, so no edge is reported for
    /// the level the line already has.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelCapacity`] when all `N` slots are taken, and
    /// [`Error::InputConfig`] when the input bank rejects the pin. Existing
    /// channels are left untouched.
    pub fn add_input(
        &mut self,
        pin: u8,
        mode: PullMode,
        callback: C,
        settings: DebounceSettings,
    ) -> Result<ChannelHandle, Error> {
        if self.channels.is_full() {
            return Err(Error::ChannelCapacity);
        }

        self.inputs.configure(pin, mode).map_err(|e| {
            warn!("debounce: pin {} configure failed: {:?}", pin, e);
            Error::InputConfig(pin)
        })?;
        let level = self.inputs.read(pin);
        let index = self.channels.len() as u8;

        self.channels
            .push(Channel {
                pin,
                callback,
                settings,
                state: level,
                transient: level,
                last_change_ms: 0,
            })
            .map_err(|_| Error::ChannelCapacity)?;

        debug!("debounce: pin {} registered (level={}, {:?})", pin, level, settings);
        Ok(ChannelHandle(index))
    }

    /// Sample every channel once and report settled edges.
    ///
    /// Must be called on every loop tick. Callbacks run synchronously, in
    /// registration order, before this returns. Returns the number of
    /// edges delivered to `handler`.
    pub fn update<H: EdgeHandler<C>>(&mut self, now_ms: u32, handler: &mut H) -> usize {
        let mut fired = 0;

        for ch in self.channels.iter_mut() {
            let measured = self.inputs.read(ch.pin);
            let fast = ch.settings.contains(DebounceSettings::FAST_CALLBACK);

            if !fast && measured != ch.transient {
                ch.transient = measured;
                ch.last_change_ms = now_ms;
            }

            if measured != ch.state
                && elapsed_ms(now_ms, ch.last_change_ms) > self.bounce_delay_ms
            {
                ch.state = measured;

                let reported = if ch.settings.contains(DebounceSettings::INVERT) {
                    !measured
                } else {
                    measured
                };

                let skip = if reported {
                    DebounceSettings::SKIP_RISING
                } else {
                    DebounceSettings::SKIP_FALLING
                };

                if !ch.settings.contains(skip) {
                    debug!("debounce: pin {} -> {}", ch.pin, reported);
                    handler.on_edge(
                        &ch.callback,
                        Edge {
                            pin: ch.pin,
                            state: reported,
                        },
                    );
                    fired += 1;
                }
            }

            if measured != ch.transient {
                ch.transient = measured;
                ch.last_change_ms = now_ms;
            }
        }

        fired
    }

    /// Committed raw level of a channel.
    pub fn stable_state(&self, handle: ChannelHandle) -> Option<bool> {
        self.channels.get(handle.index()).map(|ch| ch.state)
    }

    /// Committed level after inversion, i.e. what a callback would report.
    pub fn reported_state(&self, handle: ChannelHandle) -> Option<bool> {
        self.channels.get(handle.index()).map(|ch| {
            if ch.settings.contains(DebounceSettings::INVERT) {
                !ch.state
            } else {
                ch.state
            }
        })
    }

    /// Pin a channel is attached to.
    pub fn pin(&self, handle: ChannelHandle) -> Option<u8> {
        self.channels.get(handle.index()).map(|ch| ch.pin)
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Maximum number of channels.
    pub fn capacity(&self) -> usize {
        N
    }

    /// The owned input bank.
    pub fn inputs(&self) -> &I {
        &self.inputs
    }

    /// Mutable access to the owned input bank.
    pub fn inputs_mut(&mut self) -> &mut I {
        &mut self.inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockInputs;

    type Recorded = std::vec::Vec<(u8, bool)>;

    fn debouncer(level: bool, settings: DebounceSettings) -> Debouncer<MockInputs, u8> {
        let mut inputs = MockInputs::new();
        inputs.set(4, level);
        let mut d = Debouncer::new(inputs);
        d.set_bounce_delay(10);
        d.add_input(4, PullMode::PullUp, 7, settings).unwrap();
        d
    }

    fn tick(d: &mut Debouncer<MockInputs, u8>, now: u32, out: &mut Recorded) {
        d.update(now, &mut |tag: &u8, e: Edge| out.push((*tag, e.state)));
    }

    #[test]
    fn settings_combine() {
        let mut s = DebounceSettings::NORMAL;
        assert_eq!(s.bits(), 0);
        s |= DebounceSettings::SKIP_FALLING;
        s |= DebounceSettings::FAST_CALLBACK;
        assert_eq!(s.bits(), 0x0A);
        assert!(s.contains(DebounceSettings::SKIP_FALLING));
        assert!(!s.contains(DebounceSettings::INVERT));
    }

    #[test]
    fn from_bits_drops_unknown() {
        assert_eq!(DebounceSettings::from_bits(0xF5).bits(), 0x05);
    }

    #[test]
    fn no_edge_for_initial_level() {
        let mut d = debouncer(true, DebounceSettings::NORMAL);
        let mut out = Recorded::new();
        for t in 0..100 {
            tick(&mut d, t, &mut out);
        }
        assert!(out.is_empty());
        assert_eq!(d.stable_state(ChannelHandle(0)), Some(true));
    }

    #[test]
    fn edge_after_window() {
        let mut d = debouncer(false, DebounceSettings::NORMAL);
        let mut out = Recorded::new();

        d.inputs_mut().set(4, true);
        tick(&mut d, 100, &mut out);
        tick(&mut d, 110, &mut out); // exactly the delay: not yet
        assert!(out.is_empty());
        tick(&mut d, 111, &mut out);
        assert_eq!(out, vec![(7, true)]);
    }

    #[test]
    fn wobble_restarts_window() {
        let mut d = debouncer(false, DebounceSettings::NORMAL);
        let mut out = Recorded::new();

        d.inputs_mut().set(4, true);
        tick(&mut d, 100, &mut out);
        d.inputs_mut().set(4, false);
        tick(&mut d, 105, &mut out);
        d.inputs_mut().set(4, true);
        tick(&mut d, 108, &mut out);
        tick(&mut d, 115, &mut out);
        assert!(out.is_empty());
        tick(&mut d, 119, &mut out);
        assert_eq!(out, vec![(7, true)]);
    }

    #[test]
    fn invert_flips_report() {
        let mut d = debouncer(false, DebounceSettings::INVERT);
        let mut out = Recorded::new();
        assert_eq!(d.reported_state(ChannelHandle(0)), Some(true));

        d.inputs_mut().set(4, true);
        tick(&mut d, 50, &mut out);
        tick(&mut d, 61, &mut out);
        assert_eq!(out, vec![(7, false)]);
    }

    #[test]
    fn skip_rising_still_commits_state() {
        let mut d = debouncer(false, DebounceSettings::SKIP_RISING);
        let mut out = Recorded::new();

        d.inputs_mut().set(4, true);
        tick(&mut d, 50, &mut out);
        tick(&mut d, 61, &mut out);
        assert!(out.is_empty());
        assert_eq!(d.stable_state(ChannelHandle(0)), Some(true));

        d.inputs_mut().set(4, false);
        tick(&mut d, 70, &mut out);
        tick(&mut d, 81, &mut out);
        assert_eq!(out, vec![(7, false)]);
    }

    #[test]
    fn fast_callback_fires_on_first_sample() {
        let mut d = debouncer(false, DebounceSettings::FAST_CALLBACK);
        let mut out = Recorded::new();

        d.inputs_mut().set(4, true);
        tick(&mut d, 500, &mut out);
        assert_eq!(out, vec![(7, true)]);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut d: Debouncer<MockInputs, u8, 2> = Debouncer::new(MockInputs::new());
        assert!(d.add_input(1, PullMode::PullUp, 1, DebounceSettings::NORMAL).is_ok());
        assert!(d.add_input(2, PullMode::PullUp, 2, DebounceSettings::NORMAL).is_ok());
        assert_eq!(
            d.add_input(3, PullMode::PullUp, 3, DebounceSettings::NORMAL),
            Err(Error::ChannelCapacity)
        );
        assert_eq!(d.len(), 2);
        assert_eq!(d.capacity(), 2);
    }

    #[test]
    fn add_input_configures_pin() {
        let mut d: Debouncer<MockInputs, u8> = Debouncer::new(MockInputs::new());
        d.add_input(12, PullMode::PullDown, 0, DebounceSettings::NORMAL)
            .unwrap();
        assert_eq!(d.inputs().mode(12), Some(PullMode::PullDown));
    }

    #[test]
    fn rejected_pin_is_not_registered() {
        let mut inputs = MockInputs::new();
        inputs.reject(14);
        let mut d: Debouncer<MockInputs, u8> = Debouncer::new(inputs);

        assert_eq!(
            d.add_input(14, PullMode::PullUp, 0, DebounceSettings::NORMAL),
            Err(Error::InputConfig(14))
        );
        assert!(d.is_empty());
        assert!(d.add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL).is_ok());
    }

    #[test]
    fn timing_survives_clock_wrap() {
        let mut d = debouncer(false, DebounceSettings::NORMAL);
        let mut out = Recorded::new();
        let start = u32::MAX - 4;

        d.inputs_mut().set(4, true);
        tick(&mut d, start, &mut out);
        tick(&mut d, start.wrapping_add(8), &mut out);
        assert!(out.is_empty());
        tick(&mut d, start.wrapping_add(11), &mut out);
        assert_eq!(out, vec![(7, true)]);
    }
}
