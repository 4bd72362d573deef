//! Per-door open/closed state machine.
//!
//! A [`DoorTracker`] consumes debounced edges for one reed switch. While the
//! door is open it keeps exactly one periodic open-duration timer armed;
//! every expiry adds the interval (in whole minutes) to a running total and
//! produces an alert. Closing the door stops the timer and clears the
//! total.
//!
//! ```text
//!            rising edge: arm timer, DoorOpened
//!   CLOSED ─────────────────────────────────────► OPEN ──┐ timer: minutes += M
//!      ▲                                            │    │ OpenTooLong{minutes}
//!      └────────────────────────────────────────────┘ ◄──┘
//!            falling edge: stop timer, minutes = 0, DoorClosed
//! ```
//!
//! The tracker does not publish anything itself. Transitions return the
//! [`Notification`] to send and the owner routes it to the connectivity
//! manager.

use log::{debug, info, warn};

use crate::config::TimingConfig;
use crate::error::Error;
use crate::messages::Notification;
use crate::monitor::MonitorTimer;
use crate::timer::{Scheduler, TimerHandle};
use crate::traits::{Indicator, Rgb};

/// State of one monitored door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorTracker {
    door: u8,
    indicator_channel: u8,
    max_open_ms: u32,
    minutes_per_alert: u32,
    is_open: bool,
    open_timer: Option<TimerHandle>,
    open_minutes: u32,
}

impl DoorTracker {
    /// Tracker for door number `door` (1-based), shown on
    /// `indicator_channel`, alerting every `timing.max_open_ms` while open.
    pub fn new(door: u8, indicator_channel: u8, timing: &TimingConfig) -> Self {
        Self {
            door,
            indicator_channel,
            max_open_ms: timing.max_open_ms,
            minutes_per_alert: timing.minutes_per_alert(),
            is_open: false,
            open_timer: None,
            open_minutes: 0,
        }
    }

    /// 1-based door number.
    pub fn door(&self) -> u8 {
        self.door
    }

    /// Indicator pixel for this door.
    pub fn indicator_channel(&self) -> u8 {
        self.indicator_channel
    }

    /// Whether the door is currently open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Minutes accumulated by open-duration alerts since the door opened.
    pub fn open_minutes(&self) -> u32 {
        self.open_minutes
    }

    /// Handle of the armed open-duration timer, if the door is open.
    pub fn open_timer(&self) -> Option<TimerHandle> {
        self.open_timer
    }

    fn timer_context(&self) -> MonitorTimer {
        MonitorTimer::DoorOpen(self.door.saturating_sub(1))
    }

    /// Adopt the level observed at boot and announce it.
    ///
    /// An open door arms its timer exactly as if it had just opened.
    pub fn start<I: Indicator, const N: usize>(
        &mut self,
        open: bool,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
        indicator: &mut I,
    ) -> Result<Notification, Error> {
        info!(
            "door {}: initial state {}",
            self.door,
            if open { "open" } else { "closed" }
        );
        if open {
            self.open(timers, now_ms)?;
        } else {
            self.close(timers);
        }
        self.show(indicator);
        Ok(Notification::door_state(self.door, open))
    }

    /// Apply a debounced edge. Returns the notification to publish, or
    /// `None` if the door was already in that state.
    pub fn on_edge<I: Indicator, const N: usize>(
        &mut self,
        open: bool,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
        indicator: &mut I,
    ) -> Result<Option<Notification>, Error> {
        if open == self.is_open {
            debug!("door {}: repeated {} edge ignored", self.door, open);
            return Ok(None);
        }

        if open {
            self.open(timers, now_ms)?;
            info!("door {}: opened", self.door);
        } else {
            self.close(timers);
            info!("door {}: closed", self.door);
        }
        self.show(indicator);
        Ok(Some(Notification::door_state(self.door, open)))
    }

    /// The open-duration timer `handle` fired.
    ///
    /// Returns the alert to publish. Expiries of a timer this door no
    /// longer owns are ignored.
    pub fn on_open_too_long(&mut self, handle: TimerHandle) -> Option<Notification> {
        if !self.is_open || self.open_timer != Some(handle) {
            debug!("door {}: stale open timer ignored", self.door);
            return None;
        }

        self.open_minutes = self.open_minutes.saturating_add(self.minutes_per_alert);
        warn!(
            "door {}: open for {} minutes",
            self.door, self.open_minutes
        );
        Some(Notification::OpenTooLong {
            door: self.door,
            minutes: self.open_minutes,
        })
    }

    fn open<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if let Some(old) = self.open_timer.take() {
            timers.stop(old);
        }
        let handle = timers.every(now_ms, self.max_open_ms, self.timer_context())?;
        self.open_timer = Some(handle);
        self.is_open = true;
        Ok(())
    }

    fn close<const N: usize>(&mut self, timers: &mut Scheduler<MonitorTimer, N>) {
        if let Some(handle) = self.open_timer.take() {
            timers.stop(handle);
        }
        self.open_minutes = 0;
        self.is_open = false;
    }

    fn show<I: Indicator>(&self, indicator: &mut I) {
        let color = if self.is_open { Rgb::OPEN } else { Rgb::CLOSED };
        indicator.set_color(self.indicator_channel, color);
        indicator.show();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockIndicator;
    use crate::traits::NoIndicator;

    fn setup() -> (DoorTracker, Scheduler<MonitorTimer, 4>) {
        let timing = TimingConfig::default().with_max_open_ms(300_000);
        (DoorTracker::new(1, 0, &timing), Scheduler::new())
    }

    #[test]
    fn opening_arms_one_timer() {
        let (mut door, mut timers) = setup();
        door.start(false, &mut timers, 0, &mut NoIndicator).unwrap();

        let n = door.on_edge(true, &mut timers, 10, &mut NoIndicator).unwrap();
        assert_eq!(n, Some(Notification::DoorOpened { door: 1 }));
        assert_eq!(timers.active_count(), 1);

        // Repeated open edge must not stack a second timer
        let n = door.on_edge(true, &mut timers, 20, &mut NoIndicator).unwrap();
        assert_eq!(n, None);
        assert_eq!(timers.active_count(), 1);
    }

    #[test]
    fn closing_resets_minutes_and_stops_timer() {
        let (mut door, mut timers) = setup();
        door.start(true, &mut timers, 0, &mut NoIndicator).unwrap();
        let handle = door.open_timer().unwrap();

        door.on_open_too_long(handle);
        assert_eq!(door.open_minutes(), 5);

        let n = door.on_edge(false, &mut timers, 400_000, &mut NoIndicator).unwrap();
        assert_eq!(n, Some(Notification::DoorClosed { door: 1 }));
        assert_eq!(door.open_minutes(), 0);
        assert!(!timers.is_active(handle));
        assert_eq!(door.on_open_too_long(handle), None);
    }

    #[test]
    fn alerts_accumulate() {
        let (mut door, mut timers) = setup();
        door.start(true, &mut timers, 0, &mut NoIndicator).unwrap();
        let handle = door.open_timer().unwrap();

        assert_eq!(
            door.on_open_too_long(handle),
            Some(Notification::OpenTooLong { door: 1, minutes: 5 })
        );
        assert_eq!(
            door.on_open_too_long(handle),
            Some(Notification::OpenTooLong { door: 1, minutes: 10 })
        );
    }

    #[test]
    fn indicator_follows_state() {
        let (mut door, mut timers) = setup();
        let mut pixels = MockIndicator::new();

        door.start(false, &mut timers, 0, &mut pixels).unwrap();
        assert_eq!(pixels.color(0), Rgb::CLOSED);

        door.on_edge(true, &mut timers, 5, &mut pixels).unwrap();
        assert_eq!(pixels.color(0), Rgb::OPEN);
        assert_eq!(pixels.show_count(), 2);
    }

    #[test]
    fn full_scheduler_reports_capacity() {
        let mut door = DoorTracker::new(1, 0, &TimingConfig::default().with_max_open_ms(1000));
        let mut timers: Scheduler<MonitorTimer, 1> = Scheduler::new();
        timers.every(0, 10, MonitorTimer::Heartbeat).unwrap();

        let result = door.on_edge(true, &mut timers, 0, &mut NoIndicator);
        assert_eq!(result, Err(Error::TimerCapacity));
        assert!(!door.is_open());
    }
}
