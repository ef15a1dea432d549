//! Virtual-clock timer registry.
//!
//! Every suspension in the player is an entry here. Nothing fires on its
//! own: the owner advances the clock explicitly and pops due entries one at
//! a time, so playback is deterministic and testable without sleeping.
//!
//! While the registry is not running (the player is paused or idle),
//! [`TimerRegistry::schedule`] parks callbacks in a FIFO backlog instead of
//! arming them. [`TimerRegistry::resume`] arms the backlog in order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use tracing::debug;

/// Handle to a live timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer:{}", self.0)
    }
}

/// A callback parked while the registry is not running.
struct Queued<T> {
    callback: T,
    delay: Duration,
}

/// Ordered set of delayed callbacks on a virtual clock.
pub struct TimerRegistry<T> {
    now: Duration,
    next_seq: u64,
    /// Keyed by `(due, seq)` so equal due times fire in request order.
    live: BTreeMap<(Duration, u64), T>,
    due_of: HashMap<u64, Duration>,
    backlog: Vec<Queued<T>>,
    running: bool,
    fast_forward: bool,
}

impl<T> TimerRegistry<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            live: BTreeMap::new(),
            due_of: HashMap::new(),
            backlog: Vec::new(),
            running: false,
            fast_forward: false,
        }
    }

    /// Current virtual time.
    pub const fn now(&self) -> Duration {
        self.now
    }

    pub const fn is_running(&self) -> bool {
        self.running
    }

    pub const fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub const fn is_fast_forward(&self) -> bool {
        self.fast_forward
    }

    /// In fast-forward every newly scheduled delay is treated as zero.
    pub const fn set_fast_forward(&mut self, enabled: bool) {
        self.fast_forward = enabled;
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Number of callbacks parked in the backlog.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.due_of.contains_key(&id.0)
    }

    /// Schedule `callback` after `delay`.
    ///
    /// Returns `None` when the registry is not running; the callback is then
    /// parked and armed by the next [`resume`](Self::resume).
    pub fn schedule(&mut self, callback: T, delay: Duration) -> Option<TimerId> {
        if !self.running {
            debug!(delay_ms = delay.as_millis(), "timer parked in backlog");
            self.backlog.push(Queued { callback, delay });
            return None;
        }
        let delay = if self.fast_forward {
            Duration::ZERO
        } else {
            delay
        };
        Some(self.arm(callback, delay))
    }

    /// Arm `callback` to fire at the current instant, regardless of state.
    pub fn immediate(&mut self, callback: T) -> TimerId {
        self.arm(callback, Duration::ZERO)
    }

    /// Cancel one live timer. Unknown or already fired ids are ignored.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(due) = self.due_of.remove(&id.0) else {
            return false;
        };
        self.live.remove(&(due, id.0)).is_some()
    }

    /// Drop every live timer and the whole backlog.
    pub fn cancel_all(&mut self) {
        if !self.live.is_empty() || !self.backlog.is_empty() {
            debug!(
                live = self.live.len(),
                queued = self.backlog.len(),
                "cancelling all timers"
            );
        }
        self.live.clear();
        self.due_of.clear();
        self.backlog.clear();
    }

    /// Stop running and move live timers to the backlog, keeping the delay
    /// each one still had left.
    pub fn freeze(&mut self) {
        self.running = false;
        let live = std::mem::take(&mut self.live);
        self.due_of.clear();
        for ((due, _), callback) in live {
            let delay = due.saturating_sub(self.now);
            self.backlog.push(Queued { callback, delay });
        }
        debug!(queued = self.backlog.len(), "timers frozen");
    }

    /// Start running and arm the backlog in the order it was queued.
    pub fn resume(&mut self) {
        self.running = true;
        let backlog = std::mem::take(&mut self.backlog);
        debug!(queued = backlog.len(), "timers resumed");
        for Queued { callback, delay } in backlog {
            let delay = if self.fast_forward {
                Duration::ZERO
            } else {
                delay
            };
            self.arm(callback, delay);
        }
    }

    /// Remaining time until the earliest live timer.
    pub fn next_due(&self) -> Option<Duration> {
        self.live
            .keys()
            .next()
            .map(|(due, _)| due.saturating_sub(self.now))
    }

    /// Remove and return the earliest timer due at or before `until`,
    /// moving the clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let (&(due, seq), _) = self.live.first_key_value()?;
        if due > until {
            return None;
        }
        let callback = self.live.remove(&(due, seq))?;
        self.due_of.remove(&seq);
        self.now = self.now.max(due);
        Some((TimerId(seq), callback))
    }

    /// Move the clock forward to `instant`. The clock never runs backwards.
    pub fn advance_to(&mut self, instant: Duration) {
        self.now = self.now.max(instant);
    }

    fn arm(&mut self, callback: T, delay: Duration) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let due = self.now + delay;
        self.live.insert((due, seq), callback);
        self.due_of.insert(seq, due);
        TimerId(seq)
    }
}

impl<T> Default for TimerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TimerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("now", &self.now)
            .field("live", &self.live.len())
            .field("backlog", &self.backlog.len())
            .field("running", &self.running)
            .field("fast_forward", &self.fast_forward)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn running() -> TimerRegistry<&'static str> {
        let mut timers = TimerRegistry::new();
        timers.set_running(true);
        timers
    }

    fn drain(timers: &mut TimerRegistry<&'static str>, until: Duration) -> Vec<&'static str> {
        let mut fired = Vec::new();
        while let Some((_, name)) = timers.pop_due(until) {
            fired.push(name);
        }
        timers.advance_to(until);
        fired
    }

    #[test]
    fn test_fires_in_due_then_request_order() {
        let mut timers = running();
        timers.schedule("late", ms(20));
        timers.schedule("first", ms(5));
        timers.schedule("second", ms(5));
        assert_eq!(drain(&mut timers, ms(100)), vec!["first", "second", "late"]);
        assert_eq!(timers.now(), ms(100));
    }

    #[test]
    fn test_pop_due_respects_deadline() {
        let mut timers = running();
        timers.schedule("a", ms(10));
        assert!(timers.pop_due(ms(9)).is_none());
        assert_eq!(timers.next_due(), Some(ms(10)));
        assert!(timers.pop_due(ms(10)).is_some());
        assert_eq!(timers.now(), ms(10));
    }

    #[test]
    fn test_schedule_when_not_running_parks_callback() {
        let mut timers = TimerRegistry::new();
        assert!(timers.schedule("parked", ms(10)).is_none());
        assert!(timers.is_empty());
        assert_eq!(timers.backlog_len(), 1);
        timers.resume();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_due(), Some(ms(10)));
    }

    #[test]
    fn test_immediate_ignores_running_flag() {
        let mut timers = TimerRegistry::new();
        timers.immediate("now");
        assert_eq!(timers.next_due(), Some(Duration::ZERO));
    }

    #[test]
    fn test_fast_forward_zeroes_delays() {
        let mut timers = running();
        timers.set_fast_forward(true);
        timers.schedule("a", ms(500));
        assert_eq!(timers.next_due(), Some(Duration::ZERO));
    }

    #[test]
    fn test_cancel_removes_single_timer() {
        let mut timers = running();
        let id = timers.schedule("a", ms(5)).unwrap();
        timers.schedule("b", ms(5));
        assert!(timers.contains(id));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert_eq!(drain(&mut timers, ms(10)), vec!["b"]);
    }

    #[test]
    fn test_cancel_all_clears_live_and_backlog() {
        let mut timers = running();
        timers.schedule("a", ms(5));
        timers.freeze();
        timers.schedule("b", ms(5));
        timers.cancel_all();
        assert!(timers.is_empty());
        assert_eq!(timers.backlog_len(), 0);
        timers.resume();
        assert!(timers.next_due().is_none());
    }

    #[test]
    fn test_freeze_keeps_remaining_delay_and_order() {
        let mut timers = running();
        timers.schedule("b", ms(30));
        timers.schedule("a", ms(10));
        timers.advance_to(ms(4));
        timers.freeze();
        assert!(!timers.is_running());
        assert_eq!(timers.backlog_len(), 2);

        timers.advance_to(ms(1000));
        timers.resume();
        assert_eq!(timers.next_due(), Some(ms(6)));
        assert_eq!(drain(&mut timers, ms(1026)), vec!["a", "b"]);
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut timers: TimerRegistry<()> = TimerRegistry::new();
        timers.advance_to(ms(50));
        timers.advance_to(ms(10));
        assert_eq!(timers.now(), ms(50));
    }
}
