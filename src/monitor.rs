//! The garage monitor: single owner of every moving part.
//!
//! [`GarageMonitor`] holds the debouncer, the timer scheduler, one
//! [`DoorTracker`] per configured door, the [`ConnectivityManager`], the
//! indicator pixels and the status LED. The main loop only has to call
//! [`poll`](GarageMonitor::poll) with the current time.
//!
//! # Tick order
//!
//! 1. Drain link and session events from the transports.
//! 2. Poll the debouncer; edges go to the matching door tracker.
//! 3. Poll the scheduler; expiries go to doors, connectivity or the LED.
//!
//! # Example
//!
//! ```rust
//! use garage_sentry::config::Config;
//! use garage_sentry::hal::{MockIndicator, MockInputs, MockLink, MockMqtt, MockOutput};
//! use garage_sentry::monitor::GarageMonitor;
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
//! // Door 1 (GPIO13) opens; the edge lands after the 150ms debounce window
//! monitor.inputs_mut().set(13, true);
//! for now in (0..=200).step_by(10) {
//!     monitor.poll(now);
//! }
//! assert!(monitor.door(1).unwrap().is_open());
//! ```

use heapless::Vec;
use log::{debug, warn};

use crate::config::{Config, DoorConfig, TimingConfig, MAX_DOORS};
use crate::connectivity::ConnectivityManager;
use crate::debounce::{ChannelHandle, Debouncer, Edge, EdgeHandler};
use crate::door::DoorTracker;
use crate::error::Error;
use crate::timer::{self, Scheduler, TimerHandle, TimerHandler};
use crate::traits::{Indicator, InputBank, MqttClient, NetworkLink, PullMode, StatusOutput};

/// Timer capacity of the monitor's scheduler.
pub const TIMER_CAPACITY: usize = timer::DEFAULT_CAPACITY;

/// What a monitor timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorTimer {
    /// Open-duration alert for the door at this index (door number - 1).
    DoorOpen(u8),
    /// `ACTIVE` status beacon.
    Heartbeat,
    /// Ask the link to reassociate.
    LinkRetry,
    /// Try the MQTT session again.
    SessionRetry,
    /// Status LED blink.
    StatusLed,
}

/// Scheduler type used by the monitor.
pub type Timers = Scheduler<MonitorTimer, TIMER_CAPACITY>;

/// Everything timer and edge callbacks need, split from the debouncer and
/// scheduler so both can dispatch into it while borrowed.
struct MonitorCore<M: MqttClient, L: NetworkLink, X: Indicator, S: StatusOutput> {
    doors: Vec<DoorTracker, MAX_DOORS>,
    connectivity: ConnectivityManager<M, L>,
    indicator: X,
    status: S,
}

impl<M: MqttClient, L: NetworkLink, X: Indicator, S: StatusOutput> MonitorCore<M, L, X, S> {
    fn on_door_edge(&mut self, index: u8, open: bool, timers: &mut Timers, now_ms: u32) {
        let Some(door) = self.doors.get_mut(index as usize) else {
            warn!("edge for unknown door index {}", index);
            return;
        };
        let result = match door.on_edge(open, timers, now_ms, &mut self.indicator) {
            Ok(Some(notification)) => self.connectivity.publish(notification, timers, now_ms),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("door {}: {}", index as u16 + 1, e);
        }
    }
}

impl<M, L, X, S> TimerHandler<MonitorTimer, TIMER_CAPACITY> for MonitorCore<M, L, X, S>
where
    M: MqttClient,
    L: NetworkLink,
    X: Indicator,
    S: StatusOutput,
{
    fn on_timer(&mut self, timers: &mut Timers, handle: TimerHandle, context: &MonitorTimer, now_ms: u32) {
        let result = match *context {
            MonitorTimer::DoorOpen(index) => {
                let alert = self
                    .doors
                    .get_mut(index as usize)
                    .and_then(|door| door.on_open_too_long(handle));
                match alert {
                    Some(notification) => self.connectivity.publish(notification, timers, now_ms),
                    None => Ok(()),
                }
            }
            MonitorTimer::Heartbeat => self.connectivity.on_heartbeat(timers, now_ms),
            MonitorTimer::LinkRetry => self.connectivity.on_link_retry(timers, now_ms),
            MonitorTimer::SessionRetry => self.connectivity.on_session_retry(timers, now_ms),
            MonitorTimer::StatusLed => Ok(()),
        };
        if let Err(e) = result {
            warn!("timer {:?}: {}", context, e);
        }
    }

    fn drive_output(&mut self, context: &MonitorTimer, level: bool) {
        if *context == MonitorTimer::StatusLed {
            self.status.set_level(level);
        }
    }
}

/// Routes debounced edges (tagged with the door index) to the core.
struct EdgeRouter<'a, M: MqttClient, L: NetworkLink, X: Indicator, S: StatusOutput> {
    core: &'a mut MonitorCore<M, L, X, S>,
    timers: &'a mut Timers,
    now_ms: u32,
}

impl<M, L, X, S> EdgeHandler<u8> for EdgeRouter<'_, M, L, X, S>
where
    M: MqttClient,
    L: NetworkLink,
    X: Indicator,
    S: StatusOutput,
{
    fn on_edge(&mut self, index: &u8, edge: Edge) {
        debug!("edge: pin {} -> {}", edge.pin, edge.state);
        self.core.on_door_edge(*index, edge.state, self.timers, self.now_ms);
    }
}

/// Garage door monitor.
///
/// # Type Parameters
///
/// - `I`: reed switch inputs
/// - `M`: MQTT client
/// - `L`: network link
/// - `X`: door indicator pixels
/// - `S`: status LED
pub struct GarageMonitor<I, M, L, X, S>
where
    I: InputBank,
    M: MqttClient,
    L: NetworkLink,
    X: Indicator,
    S: StatusOutput,
{
    debouncer: Debouncer<I, u8, MAX_DOORS>,
    channels: Vec<ChannelHandle, MAX_DOORS>,
    timers: Timers,
    core: MonitorCore<M, L, X, S>,
    timing: TimingConfig,
    started: bool,
    last_poll_ms: u32,
}

impl<I, M, L, X, S> GarageMonitor<I, M, L, X, S>
where
    I: InputBank,
    M: MqttClient,
    L: NetworkLink,
    X: Indicator,
    S: StatusOutput,
{
    /// Build a monitor and register every door in `config`.
    ///
    /// Registering configures the input pins but publishes nothing; call
    /// [`start`](Self::start) once the loop is about to run.
    pub fn new(config: &Config, inputs: I, mqtt: M, link: L, indicator: X, status: S) -> Result<Self, Error> {
        let mut debouncer = Debouncer::new(inputs);
        debouncer.set_bounce_delay(config.timing.bounce_delay_ms);

        let connectivity = ConnectivityManager::new(
            mqtt,
            link,
            &config.device.name,
            &config.reconnect,
            config.timing.heartbeat_ms,
        );

        let mut monitor = Self {
            debouncer,
            channels: Vec::new(),
            timers: Scheduler::new(),
            core: MonitorCore {
                doors: Vec::new(),
                connectivity,
                indicator,
                status,
            },
            timing: config.timing,
            started: false,
            last_poll_ms: 0,
        };
        for door in &config.doors {
            monitor.add_door(door)?;
        }
        Ok(monitor)
    }

    /// Register another door. Returns its 1-based number.
    ///
    /// A door added after [`start`](Self::start) announces its state
    /// immediately.
    pub fn add_door(&mut self, door: &DoorConfig) -> Result<u8, Error> {
        if self.core.doors.is_full() {
            return Err(Error::DoorCapacity);
        }
        let index = self.core.doors.len() as u8;
        let handle = self
            .debouncer
            .add_input(door.pin, PullMode::PullUp, index, door.settings)?;

        let tracker = DoorTracker::new(index + 1, door.indicator_channel, &self.timing);
        self.core
            .doors
            .push(tracker)
            .map_err(|_| Error::DoorCapacity)?;
        self.channels.push(handle).map_err(|_| Error::DoorCapacity)?;
        debug!("door {}: pin {} registered as channel {}", index + 1, door.pin, handle.index());

        if self.started {
            self.announce(index as usize, self.last_poll_ms)?;
        }
        Ok(index + 1)
    }

    /// Announce every door's boot state, start the status LED and begin
    /// connecting.
    pub fn start(&mut self, now_ms: u32) -> Result<(), Error> {
        for index in 0..self.core.doors.len() {
            self.announce(index, now_ms)?;
        }
        self.timers
            .oscillate(now_ms, self.timing.status_blink_ms, false, MonitorTimer::StatusLed)?;
        self.core.connectivity.start(&mut self.timers, now_ms)?;
        self.started = true;
        self.last_poll_ms = now_ms;
        Ok(())
    }

    fn announce(&mut self, index: usize, now_ms: u32) -> Result<(), Error> {
        let open = self
            .channels
            .get(index)
            .and_then(|handle| self.debouncer.reported_state(*handle))
            .unwrap_or(false);
        let core = &mut self.core;
        let Some(door) = core.doors.get_mut(index) else {
            return Ok(());
        };
        let notification = door.start(open, &mut self.timers, now_ms, &mut core.indicator)?;
        core.connectivity.publish(notification, &mut self.timers, now_ms)
    }

    /// Run one loop iteration at `now_ms`.
    pub fn poll(&mut self, now_ms: u32) {
        self.last_poll_ms = now_ms;
        if let Err(e) = self.core.connectivity.poll_events(&mut self.timers, now_ms) {
            warn!("connectivity: {}", e);
        }

        let mut router = EdgeRouter {
            core: &mut self.core,
            timers: &mut self.timers,
            now_ms,
        };
        self.debouncer.update(now_ms, &mut router);

        self.timers.update(now_ms, &mut self.core);
    }

    /// Whether [`start`](Self::start) has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Door by 1-based number.
    pub fn door(&self, door: u8) -> Result<&DoorTracker, Error> {
        door.checked_sub(1)
            .and_then(|index| self.core.doors.get(index as usize))
            .ok_or(Error::UnknownDoor(door))
    }

    /// All doors, in number order.
    pub fn doors(&self) -> &[DoorTracker] {
        &self.core.doors
    }

    /// Connectivity manager.
    pub fn connectivity(&self) -> &ConnectivityManager<M, L> {
        &self.core.connectivity
    }

    /// Mutable connectivity manager (for injecting transport state).
    pub fn connectivity_mut(&mut self) -> &mut ConnectivityManager<M, L> {
        &mut self.core.connectivity
    }

    /// The scheduler.
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// The debouncer.
    pub fn debouncer(&self) -> &Debouncer<I, u8, MAX_DOORS> {
        &self.debouncer
    }

    /// Mutable access to the raw inputs.
    pub fn inputs_mut(&mut self) -> &mut I {
        self.debouncer.inputs_mut()
    }

    /// Indicator pixels.
    pub fn indicator(&self) -> &X {
        &self.core.indicator
    }

    /// Status LED.
    pub fn status(&self) -> &S {
        &self.core.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockIndicator, MockInputs, MockLink, MockMqtt, MockOutput};
    use crate::traits::Rgb;

    type TestMonitor = GarageMonitor<MockInputs, MockMqtt, MockLink, MockIndicator, MockOutput>;

    fn monitor_with(inputs: MockInputs) -> TestMonitor {
        GarageMonitor::new(
            &Config::default(),
            inputs,
            MockMqtt::new(),
            MockLink::up(),
            MockIndicator::new(),
            MockOutput::new(),
        )
        .unwrap()
    }

    #[test]
    fn registers_default_doors() {
        let monitor = monitor_with(MockInputs::new());
        assert_eq!(monitor.doors().len(), 3);
        assert_eq!(monitor.debouncer().len(), 3);
        assert_eq!(monitor.door(3).unwrap().indicator_channel(), 2);
        assert!(matches!(monitor.door(4), Err(Error::UnknownDoor(4))));
        assert!(matches!(monitor.door(0), Err(Error::UnknownDoor(0))));
    }

    #[test]
    fn start_announces_boot_state() {
        let mut inputs = MockInputs::new();
        inputs.set(12, true);
        let mut monitor = monitor_with(inputs);
        monitor.start(0).unwrap();

        assert!(!monitor.door(1).unwrap().is_open());
        assert!(monitor.door(2).unwrap().is_open());
        assert_eq!(monitor.indicator().color(1), Rgb::OPEN);
        assert_eq!(monitor.indicator().color(0), Rgb::CLOSED);

        let mqtt = monitor.connectivity().mqtt();
        assert_eq!(mqtt.published_to("SENSOR/GARAGE/PORT/2"), vec!["Garage Door 2 => Open"]);
        assert_eq!(mqtt.published_to("SENSOR/GARAGE/STATUS"), vec!["STARTED"]);
    }

    #[test]
    fn status_led_blinks() {
        let mut monitor = monitor_with(MockInputs::new());
        monitor.start(0).unwrap();
        for now in (0..=1000).step_by(50) {
            monitor.poll(now);
        }
        assert_eq!(monitor.status().levels(), &[false, true, false]);
    }

    #[test]
    fn sixth_door_rejected() {
        let mut monitor = monitor_with(MockInputs::new());
        monitor.add_door(&DoorConfig::new(4, 3)).unwrap();
        monitor.add_door(&DoorConfig::new(5, 4)).unwrap();
        assert_eq!(
            monitor.add_door(&DoorConfig::new(15, 5)),
            Err(Error::DoorCapacity)
        );
        assert_eq!(monitor.debouncer().len(), 5);
    }
}
