//! Cooperative software timers.
//!
//! [`Scheduler`] keeps a fixed arena of timers and fires the ones whose
//! deadline has passed each time [`update`](Scheduler::update) is called
//! from the main loop. Nothing runs in the background; a timer that comes
//! due between two updates fires on the next one.
//!
//! ```text
//!  every(P)     ──► fires when now - base >= P, then base += P
//!  after(D)     ──► fires once when now - start >= D, slot freed
//!  oscillate(H) ──► drives the start level, then flips every H
//! ```
//!
//! # Handles
//!
//! A [`TimerHandle`] is a slot index plus a generation counter. Freeing a
//! slot bumps its generation, so an old handle can never stop a newer timer
//! that happens to reuse the same slot. [`Scheduler::stop`] on a stale
//! handle does nothing.
//!
//! # Re-entrancy
//!
//! Callbacks receive `&mut Scheduler` and may start or stop any timer,
//! including themselves. `update` works from a snapshot of the timers that
//! were due when it started and re-validates each handle just before firing
//! it, so a timer stopped earlier in the same pass is skipped and a timer
//! started during the pass waits for the next one.
//!
//! # Example
//!
//! ```rust
//! use garage_sentry::timer::{Scheduler, TimerHandle, TimerHandler};
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! enum Job { Ping }
//!
//! #[derive(Default)]
//! struct Counter { pings: u32 }
//!
//! impl TimerHandler<Job, 4> for Counter {
//!     fn on_timer(&mut self, _: &mut Scheduler<Job, 4>, _: TimerHandle, job: &Job, _: u32) {
//!         if *job == Job::Ping { self.pings += 1; }
//!     }
//!     fn drive_output(&mut self, _: &Job, _: bool) {}
//! }
//!
//! let mut timers: Scheduler<Job, 4> = Scheduler::new();
//! let mut counter = Counter::default();
//! timers.every(0, 1000, Job::Ping).unwrap();
//!
//! for now in (0..=3000).step_by(10) {
//!     timers.update(now, &mut counter);
//! }
//! assert_eq!(counter.pings, 3);
//! ```

use heapless::Vec;
use log::debug;

use crate::error::Error;
use crate::traits::elapsed_ms;

/// Default number of timers a scheduler can hold.
pub const DEFAULT_CAPACITY: usize = 10;

/// Stable reference to a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    index: u8,
    generation: u16,
}

impl TimerHandle {
    /// Arena slot the timer lives in.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// How a timer behaves once it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once, then its slot is freed.
    OneShot,
    /// Fires every period until stopped.
    Periodic,
    /// Toggles an output every period until stopped.
    Oscillate {
        /// Level most recently driven (or about to be driven first).
        level: bool,
    },
}

/// Receives timer expiries from [`Scheduler::update`].
pub trait TimerHandler<C, const N: usize> {
    /// A one-shot or periodic timer fired.
    ///
    /// The scheduler has already rescheduled (periodic) or released
    /// (one-shot) the timer, so `handle` is only still valid for periodic
    /// timers.
    fn on_timer(&mut self, timers: &mut Scheduler<C, N>, handle: TimerHandle, context: &C, now_ms: u32);

    /// An oscillating timer wants its output driven to `level`.
    fn drive_output(&mut self, context: &C, level: bool);
}

#[derive(Debug)]
struct Entry<C> {
    kind: TimerKind,
    period_ms: u32,
    base_ms: u32,
    seq: u32,
    pending_start: bool,
    context: C,
}

impl<C> Entry<C> {
    fn is_due(&self, now_ms: u32) -> bool {
        self.pending_start || elapsed_ms(now_ms, self.base_ms) >= self.period_ms
    }
}

#[derive(Debug)]
struct Slot<C> {
    generation: u16,
    entry: Option<Entry<C>>,
}

enum Fire<C> {
    Callback(C),
    Output(C, bool),
}

/// Fixed-capacity timer arena.
///
/// # Type Parameters
///
/// - `C`: typed context handed back to the handler when the timer fires
/// - `N`: timer capacity (at most 255)
pub struct Scheduler<C, const N: usize = DEFAULT_CAPACITY> {
    slots: [Slot<C>; N],
    next_seq: u32,
}

impl<C, const N: usize> Scheduler<C, N> {
    /// Create an empty scheduler.
    ///
    /// Fails to compile when `N` exceeds 255, since handles carry a `u8`
    /// slot index.
    pub fn new() -> Self {
        const { assert!(N <= u8::MAX as usize, "timer capacity must fit in a u8") };
        Self {
            slots: core::array::from_fn(|_| Slot {
                generation: 0,
                entry: None,
            }),
            next_seq: 0,
        }
    }

    /// Fire `context` every `period_ms`, first at `now_ms + period_ms`.
    pub fn every(&mut self, now_ms: u32, period_ms: u32, context: C) -> Result<TimerHandle, Error> {
        self.insert(TimerKind::Periodic, now_ms, period_ms, false, context)
    }

    /// Fire `context` once, `delay_ms` after `now_ms`.
    pub fn after(&mut self, now_ms: u32, delay_ms: u32, context: C) -> Result<TimerHandle, Error> {
        self.insert(TimerKind::OneShot, now_ms, delay_ms, false, context)
    }

    /// Toggle an output every `half_period_ms`.
    ///
    /// `initial_level` is driven on the first [`update`](Self::update)
    /// after registration; the level then flips each half period.
    pub fn oscillate(
        &mut self,
        now_ms: u32,
        half_period_ms: u32,
        initial_level: bool,
        context: C,
    ) -> Result<TimerHandle, Error> {
        self.insert(
            TimerKind::Oscillate {
                level: initial_level,
            },
            now_ms,
            half_period_ms,
            true,
            context,
        )
    }

    fn insert(
        &mut self,
        kind: TimerKind,
        now_ms: u32,
        period_ms: u32,
        pending_start: bool,
        context: C,
    ) -> Result<TimerHandle, Error> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.entry.is_none())
            .ok_or(Error::TimerCapacity)?;

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let slot = &mut self.slots[index];
        slot.entry = Some(Entry {
            kind,
            period_ms,
            base_ms: now_ms,
            seq,
            pending_start,
            context,
        });

        debug!("timer: slot {} armed ({:?}, {}ms)", index, kind, period_ms);
        Ok(TimerHandle {
            index: index as u8,
            generation: slot.generation,
        })
    }

    /// Stop a timer. Returns `true` if a live timer was removed.
    ///
    /// Stopping an already stopped, fired one-shot, or otherwise stale
    /// handle is a no-op.
    pub fn stop(&mut self, handle: TimerHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                Self::release(slot);
                debug!("timer: slot {} stopped", handle.index);
                true
            }
            None => false,
        }
    }

    /// Whether `handle` still refers to a scheduled timer.
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.entry(handle).is_some()
    }

    /// Kind of a live timer.
    pub fn kind(&self, handle: TimerHandle) -> Option<TimerKind> {
        self.entry(handle).map(|e| e.kind)
    }

    /// Milliseconds until a live timer is next due (0 if overdue).
    pub fn remaining(&self, handle: TimerHandle, now_ms: u32) -> Option<u32> {
        self.entry(handle).map(|e| {
            if e.pending_start {
                0
            } else {
                e.period_ms.saturating_sub(elapsed_ms(now_ms, e.base_ms))
            }
        })
    }

    /// Number of scheduled timers.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Maximum number of timers.
    pub fn capacity(&self) -> usize {
        N
    }

    fn entry(&self, handle: TimerHandle) -> Option<&Entry<C>> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn slot_mut(&mut self, handle: TimerHandle) -> Option<&mut Slot<C>> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation && slot.entry.is_some())
    }

    fn release(slot: &mut Slot<C>) -> Option<Entry<C>> {
        let entry = slot.entry.take();
        slot.generation = slot.generation.wrapping_add(1);
        entry
    }
}

impl<C: Clone, const N: usize> Scheduler<C, N> {
    /// Fire every timer that is due at `now_ms`.
    ///
    /// Must be called on every loop tick. Due timers are fired in
    /// registration order. Returns the number of timers fired.
    pub fn update<H: TimerHandler<C, N>>(&mut self, now_ms: u32, handler: &mut H) -> usize {
        let mut due: Vec<(u32, TimerHandle), N> = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = &slot.entry {
                if entry.is_due(now_ms) {
                    let handle = TimerHandle {
                        index: index as u8,
                        generation: slot.generation,
                    };
                    // Cannot overflow: at most one entry per slot.
                    let _ = due.push((entry.seq, handle));
                }
            }
        }
        due.sort_unstable_by_key(|(seq, _)| *seq);

        let mut fired = 0;
        for (_, handle) in due {
            let Some(fire) = self.begin_fire(handle, now_ms) else {
                continue;
            };
            match fire {
                Fire::Callback(context) => handler.on_timer(self, handle, &context, now_ms),
                Fire::Output(context, level) => handler.drive_output(&context, level),
            }
            fired += 1;
        }
        fired
    }

    fn begin_fire(&mut self, handle: TimerHandle, now_ms: u32) -> Option<Fire<C>> {
        let slot = self.slot_mut(handle)?;
        let entry = slot.entry.as_mut()?;

        match entry.kind {
            TimerKind::OneShot => {
                let entry = Self::release(slot)?;
                Some(Fire::Callback(entry.context))
            }
            TimerKind::Periodic => {
                entry.base_ms = entry.base_ms.wrapping_add(entry.period_ms);
                Some(Fire::Callback(entry.context.clone()))
            }
            TimerKind::Oscillate { level } => {
                if entry.pending_start {
                    entry.pending_start = false;
                    entry.base_ms = now_ms;
                    return Some(Fire::Output(entry.context.clone(), level));
                }
                let next = !level;
                entry.kind = TimerKind::Oscillate { level: next };
                entry.base_ms = entry.base_ms.wrapping_add(entry.period_ms);
                Some(Fire::Output(entry.context.clone(), next))
            }
        }
    }
}

impl<C, const N: usize> Default for Scheduler<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
