//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without physical hardware.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockInputs`] | [`InputBank`] | Settable pin levels, records pull modes |
//! | [`MockOutput`] | [`StatusOutput`] | Records every level driven |
//! | [`MockIndicator`] | [`Indicator`] | Pixel buffer and show count |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockMqtt`] | [`MqttClient`] | Scripted connects, captured publishes |
//! | [`MockLink`] | [`NetworkLink`] | Scripted link state and events |
//!
//! # Example
//!
//! ```rust
//! use garage_sentry::debounce::{DebounceSettings, Debouncer, Edge};
//! use garage_sentry::hal::MockInputs;
//! use garage_sentry::traits::PullMode;
//!
//! let mut debouncer: Debouncer<MockInputs, u8> = Debouncer::new(MockInputs::new());
//! debouncer.add_input(13, PullMode::PullUp, 1, DebounceSettings::NORMAL).unwrap();
//!
//! debouncer.inputs_mut().set(13, true);
//! let mut edges = Vec::new();
//! for now in 0..=20 {
//!     debouncer.update(now, &mut |door: &u8, edge: Edge| edges.push((*door, edge.state)));
//! }
//! assert_eq!(edges, vec![(1, true)]);
//! ```
//!
//! [`InputBank`]: crate::traits::InputBank
//! [`StatusOutput`]: crate::traits::StatusOutput
//! [`Indicator`]: crate::traits::Indicator
//! [`Clock`]: crate::traits::Clock
//! [`MqttClient`]: crate::traits::MqttClient
//! [`NetworkLink`]: crate::traits::NetworkLink

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;

use crate::traits::{
    Clock, ConnectStatus, Indicator, InputBank, LinkEvent, MqttClient, NetworkLink, PullMode, Rgb,
    SessionEvent, StatusOutput,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock input bank.
///
/// Unset pins read low. Levels are changed with [`set`](Self::set) and take
/// effect on the next read.
///
/// # Example
///
/// ```rust
/// use garage_sentry::hal::MockInputs;
/// use garage_sentry::traits::{InputBank, PullMode};
///
/// let mut inputs = MockInputs::new();
/// inputs.configure(12, PullMode::PullDown).unwrap();
/// assert_eq!(inputs.mode(12), Some(PullMode::PullDown));
/// assert!(!inputs.read(12));
///
/// inputs.set(12, true);
/// assert!(inputs.read(12));
/// assert_eq!(inputs.reads, 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockInputs {
    levels: BTreeMap<u8, bool>,
    modes: BTreeMap<u8, PullMode>,
    rejected: BTreeSet<u8>,
    /// Number of `read` calls.
    pub reads: usize,
}

impl MockInputs {
    /// Creates a bank with every pin low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw level of `pin`.
    pub fn set(&mut self, pin: u8, level: bool) {
        self.levels.insert(pin, level);
    }

    /// Current raw level of `pin`.
    pub fn level(&self, pin: u8) -> bool {
        self.levels.get(&pin).copied().unwrap_or(false)
    }

    /// Make `configure` fail for `pin`.
    pub fn reject(&mut self, pin: u8) {
        self.rejected.insert(pin);
    }

    /// Pull mode `pin` was configured with, if any.
    pub fn mode(&self, pin: u8) -> Option<PullMode> {
        self.modes.get(&pin).copied()
    }
}

impl InputBank for MockInputs {
    type Error = ();

    fn configure(&mut self, pin: u8, mode: PullMode) -> Result<(), ()> {
        if self.rejected.contains(&pin) {
            return Err(());
        }
        self.modes.insert(pin, mode);
        Ok(())
    }

    fn read(&mut self, pin: u8) -> bool {
        self.reads += 1;
        self.level(pin)
    }
}

/// Mock status output.
///
/// Records every level driven, in order.
#[derive(Debug, Default, Clone)]
pub struct MockOutput {
    levels: Vec<bool>,
}

impl MockOutput {
    /// Creates an output that has never been driven.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every level driven so far.
    pub fn levels(&self) -> &[bool] {
        &self.levels
    }

    /// Most recent level.
    pub fn level(&self) -> Option<bool> {
        self.levels.last().copied()
    }
}

impl StatusOutput for MockOutput {
    fn set_level(&mut self, high: bool) {
        self.levels.push(high);
    }
}

/// Mock indicator pixels.
///
/// # Example
///
/// ```rust
/// use garage_sentry::hal::MockIndicator;
/// use garage_sentry::traits::{Indicator, Rgb};
///
/// let mut pixels = MockIndicator::new();
/// pixels.set_color(2, Rgb::OPEN);
/// pixels.show();
///
/// assert_eq!(pixels.color(2), Rgb::OPEN);
/// assert_eq!(pixels.color(0), Rgb::OFF);
/// assert_eq!(pixels.show_count(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockIndicator {
    pixels: Vec<Rgb>,
    shows: usize,
}

impl MockIndicator {
    /// Creates a strip with every pixel off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered colour of `channel`.
    pub fn color(&self, channel: u8) -> Rgb {
        self.pixels.get(channel as usize).copied().unwrap_or(Rgb::OFF)
    }

    /// Number of `show` calls.
    pub fn show_count(&self) -> usize {
        self.shows
    }
}

impl Indicator for MockIndicator {
    fn set_color(&mut self, channel: u8, color: Rgb) {
        let index = channel as usize;
        if self.pixels.len() <= index {
            self.pixels.resize(index + 1, Rgb::OFF);
        }
        self.pixels[index] = color;
    }

    fn show(&mut self) {
        self.shows += 1;
    }
}

/// Mock clock for testing.
///
/// Provides manual control over time for deterministic tests. Time wraps
/// at `u32::MAX` like the real millisecond counter.
///
/// # Example
///
/// ```rust
/// use garage_sentry::hal::MockClock;
/// use garage_sentry::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
///
/// clock.set(u32::MAX);
/// clock.advance(2);
/// assert_eq!(clock.now_ms(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockClock {
    current_ms: u32,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u32) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u32) {
        self.current_ms = self.current_ms.wrapping_add(ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.current_ms
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// `connect` pops the next scripted result; with nothing scripted it
/// succeeds immediately unless [`refuse`](Self::refuse) is set. Every
/// publish is recorded.
///
/// # Example
///
/// ```rust
/// use garage_sentry::hal::MockMqtt;
/// use garage_sentry::traits::{ConnectStatus, MqttClient};
///
/// let mut mqtt = MockMqtt::new();
/// mqtt.script_connect(Err(()));
/// mqtt.script_connect(Ok(ConnectStatus::Pending));
///
/// assert_eq!(mqtt.connect(), Err(()));
/// assert_eq!(mqtt.connect(), Ok(ConnectStatus::Pending));
/// assert!(!mqtt.is_connected());
/// assert_eq!(mqtt.connect(), Ok(ConnectStatus::Connected));
/// assert_eq!(mqtt.connect_attempts, 3);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Whether the client is connected.
    pub connected: bool,
    /// Number of `connect` calls.
    pub connect_attempts: usize,
    /// Fail every unscripted connect.
    pub refuse: bool,
    /// Fail every publish.
    pub fail_publish: bool,
    script: VecDeque<Result<ConnectStatus, ()>>,
    events: VecDeque<SessionEvent>,
}

impl MockMqtt {
    /// Creates a disconnected client that accepts connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of a future `connect` call.
    pub fn script_connect(&mut self, result: Result<ConnectStatus, ()>) {
        self.script.push_back(result);
    }

    /// The broker acknowledged an earlier pending connect.
    pub fn complete_connect(&mut self) {
        self.connected = true;
        self.events.push_back(SessionEvent::Connected);
    }

    /// The broker dropped the session.
    pub fn drop_session(&mut self) {
        self.connected = false;
        self.events.push_back(SessionEvent::Disconnected);
    }

    /// Payloads published to `topic`, as text.
    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, payload, _)| String::from_utf8_lossy(payload).into_owned())
            .collect()
    }

    /// Topics published so far, in order.
    pub fn topics(&self) -> Vec<&str> {
        self.published.iter().map(|(t, _, _)| t.as_str()).collect()
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn connect(&mut self) -> Result<ConnectStatus, ()> {
        self.connect_attempts += 1;
        let result = match self.script.pop_front() {
            Some(result) => result,
            None if self.refuse => Err(()),
            None => Ok(ConnectStatus::Connected),
        };
        self.connected = result == Ok(ConnectStatus::Connected);
        result
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if self.fail_publish || !self.connected {
            return Err(());
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn poll_event(&mut self) -> Option<SessionEvent> {
        self.events.pop_front()
    }
}

/// Mock network link.
///
/// # Example
///
/// ```rust
/// use garage_sentry::hal::MockLink;
/// use garage_sentry::traits::{LinkEvent, NetworkLink};
///
/// let mut link = MockLink::down();
/// link.reconnect().unwrap();
/// assert_eq!(link.reconnects, 1);
///
/// link.bring_up();
/// assert!(link.is_up());
/// assert_eq!(link.poll_event(), Some(LinkEvent::Up));
/// assert_eq!(link.poll_event(), None);
/// ```
#[derive(Debug, Default)]
pub struct MockLink {
    up: bool,
    events: VecDeque<LinkEvent>,
    /// Number of `reconnect` calls.
    pub reconnects: usize,
    /// Fail every `reconnect` call.
    pub fail_reconnect: bool,
    associating: bool,
}

impl MockLink {
    /// A link that is already associated.
    pub fn up() -> Self {
        Self {
            up: true,
            ..Default::default()
        }
    }

    /// A link with no connectivity.
    pub fn down() -> Self {
        Self::default()
    }

    /// A link with no connectivity that has started associating on its own.
    pub fn associating() -> Self {
        Self {
            associating: true,
            ..Default::default()
        }
    }

    /// Association succeeded.
    pub fn bring_up(&mut self) {
        self.up = true;
        self.associating = false;
        self.events.push_back(LinkEvent::Up);
    }

    /// Association lost.
    pub fn drop_link(&mut self) {
        self.up = false;
        self.events.push_back(LinkEvent::Down);
    }
}

impl NetworkLink for MockLink {
    type Error = ();

    fn reconnect(&mut self) -> Result<(), ()> {
        self.reconnects += 1;
        self.associating = false;
        if self.fail_reconnect {
            Err(())
        } else {
            Ok(())
        }
    }

    fn is_up(&self) -> bool {
        self.up
    }

    fn is_associating(&self) -> bool {
        self.associating
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.events.pop_front()
    }
}

// ============================================================================
// Tests
// ============================================================================
