//! Link and MQTT session supervision.
//!
//! [`ConnectivityManager`] owns the network link and the MQTT client and
//! keeps them connected without ever blocking the loop. Every retry is a
//! one-shot timer on the shared [`Scheduler`], so debouncing and door
//! tracking carry on during an outage.
//!
//! # State Machine
//!
//! ```text
//!                link up                    connect Ok(Connected)
//!  LINK_DOWN ───────────► DISCONNECTED ──────────────────────────► CONNECTED
//!     ▲  │ retry timer       │   ▲   connect Ok(Pending)               │
//!     │  └─ reconnect()      │   │        └──► CONNECTING ─────────────┤
//!     │                      │   │               timeout ──► reconnect │
//!     │                      │   └── retry timer ◄── failure / lost ◄──┘
//!     └──────── link down (from any state) ────────────────────────────┘
//! ```
//!
//! - Retries back off from `initial_backoff_ms`, doubling up to
//!   `max_backoff_ms`, and reset once the connection succeeds.
//! - At most one session retry is pending at a time, and only while the
//!   link is up. A pending connect is given the current backoff delay to
//!   complete before it is abandoned and tried again.
//! - Entering CONNECTED publishes `STARTED`, starts the `ACTIVE` heartbeat
//!   and flushes anything queued while offline.
//!
//! # Offline publishing
//!
//! With [`OfflinePolicy::Queue`] (the default) door notifications published
//! while disconnected are held in a bounded queue of [`OFFLINE_QUEUE_LEN`]
//! entries, oldest evicted first, and sent in order on reconnect. With
//! [`OfflinePolicy::Drop`] they are logged and discarded. Status messages
//! are never queued.

use heapless::Deque;
use log::{debug, info, warn};

use crate::config::{short_string, OfflinePolicy, ReconnectConfig, ShortString};
use crate::error::Error;
use crate::messages::Notification;
use crate::monitor::MonitorTimer;
use crate::timer::{Scheduler, TimerHandle};
use crate::traits::{ConnectStatus, LinkEvent, MqttClient, NetworkLink, SessionEvent};

/// Number of notifications held while offline.
pub const OFFLINE_QUEUE_LEN: usize = 8;

// ============================================================================
// States
// ============================================================================

/// Network link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No link; a link retry is pending.
    Down,
    /// Link established.
    Up,
}

/// MQTT session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    Disconnected,
    /// An asynchronous connect is in flight.
    Connecting,
    /// Session established.
    Connected,
}

// ============================================================================
// Backoff
// ============================================================================

/// Doubling retry delay with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial_ms: u32,
    max_ms: u32,
    next_ms: u32,
}

impl Backoff {
    /// Start at `initial_ms`, never exceeding `max_ms`.
    pub fn new(initial_ms: u32, max_ms: u32) -> Self {
        let initial_ms = initial_ms.min(max_ms);
        Self {
            initial_ms,
            max_ms,
            next_ms: initial_ms,
        }
    }

    /// Delay for the next attempt; grows the one after it.
    pub fn next_delay(&mut self) -> u32 {
        let delay = self.next_ms;
        self.next_ms = self.next_ms.saturating_mul(2).min(self.max_ms);
        delay
    }

    /// Back to the initial delay.
    pub fn reset(&mut self) {
        self.next_ms = self.initial_ms;
    }

    /// Delay the next attempt would use.
    pub fn peek(&self) -> u32 {
        self.next_ms
    }
}

impl From<&ReconnectConfig> for Backoff {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(config.initial_backoff_ms, config.max_backoff_ms)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Reconnecting publisher over a [`NetworkLink`] and an [`MqttClient`].
pub struct ConnectivityManager<M: MqttClient, L: NetworkLink> {
    mqtt: M,
    link: L,
    device: ShortString,
    policy: OfflinePolicy,
    heartbeat_ms: u32,
    link_state: LinkState,
    session_state: SessionState,
    link_backoff: Backoff,
    session_backoff: Backoff,
    link_retry: Option<TimerHandle>,
    session_retry: Option<TimerHandle>,
    heartbeat: Option<TimerHandle>,
    queue: Deque<Notification, OFFLINE_QUEUE_LEN>,
    dropped: u32,
}

impl<M: MqttClient, L: NetworkLink> ConnectivityManager<M, L> {
    /// Create a manager publishing under `device`.
    ///
    /// Nothing is attempted until [`start`](Self::start).
    pub fn new(mqtt: M, link: L, device: &str, reconnect: &ReconnectConfig, heartbeat_ms: u32) -> Self {
        Self {
            mqtt,
            link,
            device: short_string(device),
            policy: reconnect.offline_policy,
            heartbeat_ms,
            link_state: LinkState::Down,
            session_state: SessionState::Disconnected,
            link_backoff: Backoff::from(reconnect),
            session_backoff: Backoff::from(reconnect),
            link_retry: None,
            session_retry: None,
            heartbeat: None,
            queue: Deque::new(),
            dropped: 0,
        }
    }

    /// Current link state.
    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    /// Whether publishes go straight to the broker.
    pub fn is_connected(&self) -> bool {
        self.session_state == SessionState::Connected
    }

    /// Notifications waiting for the session.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Notifications discarded while offline (dropped or evicted).
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Pending session retry timer.
    pub fn session_retry(&self) -> Option<TimerHandle> {
        self.session_retry
    }

    /// Pending link retry timer.
    pub fn link_retry(&self) -> Option<TimerHandle> {
        self.link_retry
    }

    /// Running heartbeat timer.
    pub fn heartbeat(&self) -> Option<TimerHandle> {
        self.heartbeat
    }

    /// The MQTT client.
    pub fn mqtt(&self) -> &M {
        &self.mqtt
    }

    /// Mutable access to the MQTT client.
    pub fn mqtt_mut(&mut self) -> &mut M {
        &mut self.mqtt
    }

    /// The network link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable access to the network link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Begin connecting. Uses the link immediately if it is already up,
    /// otherwise asks it to associate (unless it is already doing so) and
    /// arms a link retry.
    pub fn start<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        info!("connectivity: starting, offline policy {}", self.policy.as_str());
        if self.link.is_up() {
            return self.on_link_up(timers, now_ms);
        }
        if self.link.is_associating() {
            debug!("link: association already in progress");
        } else {
            self.request_link();
        }
        self.schedule_link_retry(timers, now_ms)
    }

    // ------------------------------------------------------------------------
    // Link
    // ------------------------------------------------------------------------

    /// The link came up: stop retrying it and connect the session.
    pub fn on_link_up<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if let Some(handle) = self.link_retry.take() {
            timers.stop(handle);
        }
        self.link_backoff.reset();
        if self.link_state == LinkState::Up {
            return Ok(());
        }

        info!("link up");
        self.link_state = LinkState::Up;
        self.connect_session(timers, now_ms)
    }

    /// The link dropped: abandon the session and retry the link.
    pub fn on_link_down<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if self.link_state == LinkState::Up {
            warn!("link down");
        }
        self.link_state = LinkState::Down;
        self.session_state = SessionState::Disconnected;
        self.stop_session_timers(timers);

        if self.link_retry.is_some() {
            return Ok(());
        }
        self.schedule_link_retry(timers, now_ms)
    }

    /// The link retry timer fired.
    pub fn on_link_retry<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        self.link_retry = None;
        if self.link_state == LinkState::Up {
            return Ok(());
        }
        self.request_link();
        self.schedule_link_retry(timers, now_ms)
    }

    fn request_link(&mut self) {
        debug!("link: requesting reconnect");
        if let Err(e) = self.link.reconnect() {
            warn!("link reconnect failed: {:?}", e);
        }
    }

    fn schedule_link_retry<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        let delay = self.link_backoff.next_delay();
        debug!("link: retry in {}ms", delay);
        self.link_retry = Some(timers.after(now_ms, delay, MonitorTimer::LinkRetry)?);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    fn connect_session<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if self.link_state != LinkState::Up {
            return Ok(());
        }

        info!("mqtt: connecting");
        self.session_state = SessionState::Connecting;
        match self.mqtt.connect() {
            Ok(ConnectStatus::Connected) => self.on_session_connected(timers, now_ms),
            Ok(ConnectStatus::Pending) => {
                // The retry timer doubles as the connect timeout
                let timeout = self.session_backoff.peek();
                debug!("mqtt: connect pending, timeout in {}ms", timeout);
                if let Some(handle) = self.session_retry.take() {
                    timers.stop(handle);
                }
                self.session_retry = Some(timers.after(now_ms, timeout, MonitorTimer::SessionRetry)?);
                Ok(())
            }
            Err(e) => {
                warn!("mqtt: connect failed: {:?}", e);
                self.session_state = SessionState::Disconnected;
                self.schedule_session_retry(timers, now_ms)
            }
        }
    }

    /// The broker accepted the session.
    pub fn on_session_connected<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if self.session_state == SessionState::Connected {
            return Ok(());
        }
        if self.link_state != LinkState::Up {
            debug!("mqtt: connected event without link ignored");
            return Ok(());
        }

        info!("mqtt: connected");
        self.session_state = SessionState::Connected;
        if let Some(handle) = self.session_retry.take() {
            timers.stop(handle);
        }
        self.session_backoff.reset();

        self.publish(Notification::Started, timers, now_ms)?;
        if !self.is_connected() {
            // Lost again while announcing; a retry is already armed.
            return Ok(());
        }

        if let Some(handle) = self.heartbeat.take() {
            timers.stop(handle);
        }
        self.heartbeat = Some(timers.every(now_ms, self.heartbeat_ms, MonitorTimer::Heartbeat)?);

        self.flush(timers, now_ms)
    }

    /// The session dropped, or an asynchronous connect failed.
    pub fn on_session_lost<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        let was_connecting = self.session_state == SessionState::Connecting;
        if self.session_state != SessionState::Disconnected {
            warn!("mqtt: session lost");
        }
        self.session_state = SessionState::Disconnected;
        if let Some(handle) = self.heartbeat.take() {
            timers.stop(handle);
        }
        if was_connecting {
            // Replace the connect timeout with a backed-off retry
            if let Some(handle) = self.session_retry.take() {
                timers.stop(handle);
            }
        }

        if self.link_state != LinkState::Up || self.session_retry.is_some() {
            return Ok(());
        }
        self.schedule_session_retry(timers, now_ms)
    }

    /// The session retry timer fired.
    pub fn on_session_retry<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        self.session_retry = None;
        match self.session_state {
            SessionState::Connected => Ok(()),
            SessionState::Connecting => {
                warn!("mqtt: connect timed out");
                self.session_backoff.next_delay();
                self.session_state = SessionState::Disconnected;
                self.connect_session(timers, now_ms)
            }
            SessionState::Disconnected => self.connect_session(timers, now_ms),
        }
    }

    fn schedule_session_retry<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if self.session_retry.is_some() {
            return Ok(());
        }
        let delay = self.session_backoff.next_delay();
        info!("mqtt: retry in {}ms", delay);
        self.session_retry = Some(timers.after(now_ms, delay, MonitorTimer::SessionRetry)?);
        Ok(())
    }

    fn stop_session_timers<const N: usize>(&mut self, timers: &mut Scheduler<MonitorTimer, N>) {
        if let Some(handle) = self.session_retry.take() {
            timers.stop(handle);
        }
        if let Some(handle) = self.heartbeat.take() {
            timers.stop(handle);
        }
    }

    /// The heartbeat timer fired.
    pub fn on_heartbeat<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        self.publish(Notification::Heartbeat, timers, now_ms)
    }

    /// Drain pending link and session events from the transports.
    pub fn poll_events<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        while let Some(event) = self.link.poll_event() {
            match event {
                LinkEvent::Up => self.on_link_up(timers, now_ms)?,
                LinkEvent::Down => self.on_link_down(timers, now_ms)?,
            }
        }
        while let Some(event) = self.mqtt.poll_event() {
            match event {
                SessionEvent::Connected => self.on_session_connected(timers, now_ms)?,
                SessionEvent::Disconnected => self.on_session_lost(timers, now_ms)?,
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------------

    /// Publish `notification`, or apply the offline policy if the session
    /// is down. A transport error counts as a lost session.
    pub fn publish<const N: usize>(
        &mut self,
        notification: Notification,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if !self.is_connected() {
            self.hold(notification);
            return Ok(());
        }

        if self.send(&notification) {
            return Ok(());
        }
        self.hold(notification);
        self.on_session_lost(timers, now_ms)
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let topic = notification.topic(&self.device);
        let payload = notification.payload();
        debug!("mqtt: {} {}", topic, payload);
        match self.mqtt.publish(&topic, payload.as_bytes(), false) {
            Ok(()) => true,
            Err(e) => {
                warn!("mqtt: publish to {} failed: {:?}", topic, e);
                false
            }
        }
    }

    fn hold(&mut self, notification: Notification) {
        if notification.is_status() {
            debug!("mqtt: offline, {:?} not sent", notification);
            return;
        }

        match self.policy {
            OfflinePolicy::Drop => {
                self.dropped = self.dropped.saturating_add(1);
                warn!("mqtt: offline, dropped {:?}", notification);
            }
            OfflinePolicy::Queue => {
                if self.queue.is_full() {
                    if let Some(evicted) = self.queue.pop_front() {
                        self.dropped = self.dropped.saturating_add(1);
                        warn!("mqtt: offline queue full, evicted {:?}", evicted);
                    }
                }
                let _ = self.queue.push_back(notification);
                debug!("mqtt: offline, queued {:?} ({} held)", notification, self.queue.len());
            }
        }
    }

    fn flush<const N: usize>(
        &mut self,
        timers: &mut Scheduler<MonitorTimer, N>,
        now_ms: u32,
    ) -> Result<(), Error> {
        if !self.queue.is_empty() {
            info!("mqtt: flushing {} queued", self.queue.len());
        }
        while let Some(notification) = self.queue.pop_front() {
            if !self.send(&notification) {
                // Put it back at the head and keep order for the next session
                let _ = self.queue.push_front(notification);
                return self.on_session_lost(timers, now_ms);
            }
        }
        Ok(())
    }
}
