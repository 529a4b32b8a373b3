//! Cancellable delayed continuations on simulation time.
//!
//! Every delayed action gets a [`TimerHandle`]. Reloading a level calls
//! [`Scheduler::cancel_all`], so continuations scheduled for the old level
//! never fire against the new one.

use serde::{Deserialize, Serialize};

/// Absorbs f32 rounding when frame deltas add up to a delay exactly
const DUE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct PendingAction<T> {
    handle: TimerHandle,
    due_at: f64,
    action: T,
}

/// Delayed actions ordered by due time, ties broken by schedule order
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: f64,
    next_handle: u64,
    pending: Vec<PendingAction<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_handle: 1,
            pending: Vec::new(),
        }
    }

    /// Simulation time elapsed since creation (seconds)
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Run `action` once `delay_secs` of simulation time has passed
    pub fn schedule(&mut self, delay_secs: f32, action: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(PendingAction {
            handle,
            due_at: self.now + f64::from(delay_secs.max(0.0)),
            action,
        });
        handle
    }

    /// Returns false if the action already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    /// Drop every pending action; returns how many were dropped
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advance the clock and hand back every action that came due
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += f64::from(dt.max(0.0));
        let now = self.now + DUE_TOLERANCE;

        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due_at <= now);
        self.pending = waiting;

        due.sort_by(|a, b| a.due_at.total_cmp(&b.due_at).then(a.handle.cmp(&b.handle)));
        due.into_iter().map(|p| p.action).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.3, "jump");
        assert!(scheduler.advance(0.2).is_empty());
        assert_eq!(scheduler.advance(0.1), vec!["jump"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_zero_delay_fires_on_next_advance() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.0, 1);
        assert_eq!(scheduler.advance(0.0), vec![1]);
    }

    #[test]
    fn test_due_order_then_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.5, "late");
        scheduler.schedule(0.1, "early_a");
        scheduler.schedule(0.1, "early_b");
        assert_eq!(scheduler.advance(1.0), vec!["early_a", "early_b", "late"]);
    }

    #[test]
    fn test_cancel_single() {
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule(0.1, "keep");
        let drop = scheduler.schedule(0.1, "drop");
        assert!(scheduler.cancel(drop));
        assert!(!scheduler.cancel(drop));
        assert!(scheduler.is_pending(keep));
        assert_eq!(scheduler.advance(0.2), vec!["keep"]);
        assert!(!scheduler.is_pending(keep));
    }

    #[test]
    fn test_cancel_all_drops_stale_continuations() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.4, "destroy_fx");
        scheduler.schedule(0.05, "flash_end");
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.advance(1.0).is_empty());
    }

    #[test]
    fn test_delay_relative_to_current_time() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(5.0);
        scheduler.schedule(1.0, ());
        assert!(scheduler.advance(0.5).is_empty());
        assert_eq!(scheduler.advance(0.5).len(), 1);
        assert!((scheduler.now() - 6.0).abs() < 1e-9);
    }
}
