use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::audio::config::WorkerTiming;

// --- Clocks ---

/// Monotonic time source shared by the periodic workers and the simulated
/// voice. Times are offsets from the clock's own origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;

    /// Blocks until `now() >= deadline`. Returns immediately if that time has
    /// already passed.
    fn sleep_until(&self, deadline: Duration);
}

/// Wall-clock time from `std::time::Instant`, with real sleeps.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Clock that only moves when told to. Sleeping jumps time forward to the
/// wake-up instant, so a periodic loop runs as fast as the CPU allows while
/// still seeing evenly spaced activations.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(to.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep_until(&self, deadline: Duration) {
        self.nanos
            .fetch_max(deadline.as_nanos() as u64, Ordering::SeqCst);
    }
}

// --- Periodic Task ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskParams {
    pub period: Duration,
    /// Relative to each activation.
    pub deadline: Duration,
    /// Informational only; worker threads run at the default OS priority.
    pub priority: u8,
}

impl From<WorkerTiming> for TaskParams {
    fn from(timing: WorkerTiming) -> Self {
        TaskParams {
            period: timing.period(),
            deadline: timing.deadline(),
            priority: timing.priority,
        }
    }
}

/// Fixed-period activation with an absolute deadline per activation.
///
/// Usage per worker: `set_period` once, then every iteration do the work,
/// check `deadline_miss`, and finish with `wait_for_period`.
pub struct PeriodicTask {
    name: &'static str,
    params: TaskParams,
    clock: Arc<dyn Clock>,
    next_activation: Duration,
    abs_deadline: Duration,
    misses: u64,
    last_missed_deadline: Option<Duration>,
}

impl PeriodicTask {
    pub fn new(name: &'static str, params: TaskParams, clock: Arc<dyn Clock>) -> Self {
        PeriodicTask {
            name,
            params,
            clock,
            next_activation: Duration::ZERO,
            abs_deadline: Duration::ZERO,
            misses: 0,
            last_missed_deadline: None,
        }
    }

    pub fn set_period(&mut self) {
        let now = self.clock.now();
        self.next_activation = now + self.params.period;
        self.abs_deadline = now + self.params.deadline;
        log::info!(
            "{} Worker: Period {} ms, deadline {} ms, priority {}",
            self.name,
            self.params.period.as_millis(),
            self.params.deadline.as_millis(),
            self.params.priority
        );
    }

    /// True if the current activation has overrun its deadline. The miss
    /// counter moves at most once per absolute deadline.
    pub fn deadline_miss(&mut self) -> bool {
        let now = self.clock.now();
        if now <= self.abs_deadline {
            return false;
        }
        if self.last_missed_deadline != Some(self.abs_deadline) {
            self.last_missed_deadline = Some(self.abs_deadline);
            self.misses += 1;
            log::warn!(
                "{} Worker: Deadline missed by {:?} (total misses: {})",
                self.name,
                now - self.abs_deadline,
                self.misses
            );
        }
        true
    }

    pub fn wait_for_period(&mut self) {
        self.clock.sleep_until(self.next_activation);
        self.next_activation += self.params.period;
        self.abs_deadline += self.params.period;
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn params(&self) -> TaskParams {
        self.params
    }

    pub fn next_activation(&self) -> Duration {
        self.next_activation
    }

    pub fn abs_deadline(&self) -> Duration {
        self.abs_deadline
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
