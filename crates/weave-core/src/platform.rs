//! Platform abstraction traits for the Weave runtime.
//!
//! These traits let the reconciler delegate waking, timing and time-slicing
//! decisions to the host platform, so the work loop never depends directly on
//! `std::time` or on a particular event loop.

use std::cell::Cell;
use std::time::Duration;

/// Wakes the host when the runtime has queued work.
///
/// The runtime keeps its own task queue; implementations only need to make
/// sure the host eventually calls back into the render root to drain it.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host run the render root's pending tasks.
    fn schedule_frame(&self);
}

/// Provides timing information for the runtime.
pub trait Clock: Send + Sync {
    /// Instant type produced by this clock implementation.
    type Instant: Copy + Send + Sync;

    /// Returns the current instant.
    fn now(&self) -> Self::Instant;

    /// Returns the number of milliseconds elapsed since `since`.
    fn elapsed_millis(&self, since: Self::Instant) -> u64;
}

/// Decides when the cooperative work loop hands control back to the host.
///
/// `begin_slice` is called once at the start of every work-loop task and
/// `should_yield` before every unit of work inside it.
pub trait YieldPolicy {
    fn begin_slice(&self);
    fn should_yield(&self) -> bool;
}

/// Never yields; every pass runs to completion in a single task.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverYield;

impl YieldPolicy for NeverYield {
    fn begin_slice(&self) {}

    fn should_yield(&self) -> bool {
        false
    }
}

/// Yields after a fixed number of units of work per slice.
#[derive(Debug)]
pub struct UnitBudget {
    budget: usize,
    used: Cell<usize>,
}

impl UnitBudget {
    /// A budget of zero is treated as one so every slice makes progress.
    pub fn new(budget: usize) -> Self {
        Self {
            budget: budget.max(1),
            used: Cell::new(0),
        }
    }
}

impl YieldPolicy for UnitBudget {
    fn begin_slice(&self) {
        self.used.set(0);
    }

    fn should_yield(&self) -> bool {
        let used = self.used.get();
        if used >= self.budget {
            return true;
        }
        self.used.set(used + 1);
        false
    }
}

/// Yields once a slice has been running for longer than its time budget.
///
/// The first check of every slice never yields, so a slice always makes
/// progress even with a zero budget.
pub struct ClockDeadline<C: Clock> {
    clock: C,
    budget_millis: u64,
    slice_start: Cell<Option<C::Instant>>,
    checked: Cell<bool>,
}

impl<C: Clock> ClockDeadline<C> {
    pub fn new(clock: C, budget: Duration) -> Self {
        Self {
            clock,
            budget_millis: budget.as_millis().try_into().unwrap_or(u64::MAX),
            slice_start: Cell::new(None),
            checked: Cell::new(false),
        }
    }
}

impl<C: Clock> YieldPolicy for ClockDeadline<C> {
    fn begin_slice(&self) {
        self.slice_start.set(Some(self.clock.now()));
        self.checked.set(false);
    }

    fn should_yield(&self) -> bool {
        if !self.checked.replace(true) {
            return false;
        }
        match self.slice_start.get() {
            Some(start) => self.clock.elapsed_millis(start) >= self.budget_millis,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn unit_budget_yields_after_budget_and_resets_per_slice() {
        let policy = UnitBudget::new(2);
        policy.begin_slice();
        assert!(!policy.should_yield());
        assert!(!policy.should_yield());
        assert!(policy.should_yield());
        policy.begin_slice();
        assert!(!policy.should_yield());
    }

    #[test]
    fn zero_budget_still_allows_one_unit() {
        let policy = UnitBudget::new(0);
        policy.begin_slice();
        assert!(!policy.should_yield());
        assert!(policy.should_yield());
    }

    #[derive(Clone, Default)]
    struct FakeClock(Arc<AtomicU64>);

    impl Clock for FakeClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }

        fn elapsed_millis(&self, since: u64) -> u64 {
            self.now() - since
        }
    }

    #[test]
    fn clock_deadline_yields_when_slice_expires() {
        let clock = FakeClock::default();
        clock.0.store(100, Ordering::SeqCst);
        let policy = ClockDeadline::new(clock.clone(), Duration::from_millis(5));
        assert!(!policy.should_yield(), "no slice started yet");
        policy.begin_slice();
        clock.0.store(104, Ordering::SeqCst);
        assert!(!policy.should_yield());
        assert!(!policy.should_yield());
        clock.0.store(105, Ordering::SeqCst);
        assert!(policy.should_yield());
    }

    #[test]
    fn zero_deadline_still_allows_one_unit() {
        let clock = FakeClock::default();
        let policy = ClockDeadline::new(clock, Duration::ZERO);
        policy.begin_slice();
        assert!(!policy.should_yield());
        assert!(policy.should_yield());
    }
}
