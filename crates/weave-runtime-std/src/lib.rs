//! `std`-backed services for driving Weave render roots.
//!
//! [`StdScheduler`] turns frame requests into a flag the event loop polls
//! plus an optional wake-up callback, [`StdClock`] measures slices with
//! [`Instant`], and [`StdRuntime`] hands out render roots wired to both.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use weave_core::{ClockDeadline, Clock, HostAdapter, RenderRoot, RuntimeConfig, RuntimeScheduler};

type FrameWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Frame-request flag shared by every root created from one [`StdRuntime`].
#[derive(Default)]
pub struct StdScheduler {
    pending: AtomicBool,
    waker: Mutex<Option<FrameWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the flag, returning whether a frame was pending.
    pub fn take_frame_request(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Called on every frame request, e.g. to post a redraw to the event loop.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.replace_waker(Some(Arc::new(waker)));
    }

    pub fn clear_frame_waker(&self) {
        self.replace_waker(None);
    }

    fn replace_waker(&self, waker: Option<FrameWaker>) {
        *self.waker.lock().unwrap_or_else(PoisonError::into_inner) = waker;
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("pending", &self.pending.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.pending.store(true, Ordering::Release);
        // Call outside the lock so the waker may re-enter the scheduler.
        let waker = self
            .waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

/// Wall clock for [`ClockDeadline`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed_millis(&self, since: Instant) -> u64 {
        u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Scheduler, clock and configuration shared by the roots of one application.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: StdClock,
    config: RuntimeConfig,
}

impl StdRuntime {
    /// Configuration read from the `WEAVE_*` environment variables.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            scheduler: Arc::new(StdScheduler::default()),
            clock: StdClock,
            config,
        }
    }

    /// A root whose work loop yields after `config.time_slice` of wall time.
    pub fn create_root<H: HostAdapter + 'static>(&self, host: H) -> RenderRoot<H> {
        let policy = ClockDeadline::new(self.clock, self.config.time_slice);
        RenderRoot::with_options(
            host,
            self.scheduler.clone(),
            self.config.clone(),
            Box::new(policy),
        )
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> StdClock {
        self.clock
    }

    /// See [`StdScheduler::take_frame_request`].
    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }

    /// Runs one frame: drains the root's queue if a frame was requested.
    ///
    /// Returns the number of tasks that ran.
    pub fn run_frame<H: HostAdapter + 'static>(&self, root: &RenderRoot<H>) -> usize {
        if !self.take_frame_request() {
            return 0;
        }
        let ran = root.drain_tasks();
        log::trace!("frame ran {ran} tasks");
        ran
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
