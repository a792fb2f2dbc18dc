//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform
//! abstraction traits defined in `fiber-core`. Applications construct a
//! [`StdRuntime`], hand its [`Runtime`] to
//! [`RenderRoot::with_runtime`](fiber_core::RenderRoot::with_runtime) and
//! drive turns with wall-clock deadlines.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use fiber_core::{
    Clock, CommitReport, Deadline, HostBackend, IdleScheduler, RenderError, RenderRoot, Runtime,
    RuntimeHandle, WorkStatus,
};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Idle scheduler that records turn requests and forwards them to an
/// optional waker.
pub struct StdIdleScheduler {
    idle_requested: AtomicBool,
    waker: RwLock<Option<Waker>>,
}

impl StdIdleScheduler {
    pub fn new() -> Self {
        Self {
            idle_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a turn has been requested since the last call.
    pub fn take_idle_request(&self) -> bool {
        self.idle_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever the engine asks for a turn.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_waker(&self) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdIdleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdIdleScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdIdleScheduler")
            .field("idle_requested", &self.idle_requested.load(Ordering::SeqCst))
            .finish()
    }
}

impl IdleScheduler for StdIdleScheduler {
    fn request_idle_callback(&self) {
        self.idle_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Clock implementation backed by [`std::time`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed(&self, since: Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Deadline for one scheduler turn, measured on `C`.
#[derive(Debug, Clone, Copy)]
pub struct TurnDeadline<C: Clock = StdClock> {
    clock: C,
    started: C::Instant,
    budget: Duration,
}

impl TurnDeadline {
    /// Wall-clock turn of `budget` starting now.
    pub fn starting_now(budget: Duration) -> Self {
        Self::start(StdClock, budget)
    }
}

impl<C: Clock> TurnDeadline<C> {
    pub fn start(clock: C, budget: Duration) -> Self {
        let started = clock.now();
        Self {
            clock,
            started,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl<C: Clock> Deadline for TurnDeadline<C> {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.clock.elapsed(self.started))
    }
}

/// Outcome of [`drive_until_idle`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DriveSummary {
    pub turns: usize,
    pub commits: Vec<CommitReport>,
    pub idle: bool,
}

/// Convenience container bundling the standard scheduler and clock.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdIdleScheduler>,
    clock: StdClock,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdIdleScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self {
            scheduler,
            clock: StdClock,
            runtime,
        }
    }

    /// Returns a [`fiber_core::Runtime`] wired to the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdIdleScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn take_idle_request(&self) -> bool {
        self.scheduler.take_idle_request()
    }

    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_waker(waker);
    }

    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }

    /// Deadline for a turn of `budget` starting now.
    pub fn turn(&self, budget: Duration) -> TurnDeadline {
        TurnDeadline::start(self.clock, budget)
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs turns of `budget` each for as long as the engine keeps requesting
/// them, up to `max_turns`.
///
/// This is the host side of the idle-callback protocol: a turn only runs
/// when the scheduler saw a request, either from a render, a yield or a
/// state setter.
pub fn drive_until_idle<B: HostBackend>(
    root: &mut RenderRoot<B>,
    runtime: &StdRuntime,
    budget: Duration,
    max_turns: usize,
) -> Result<DriveSummary, RenderError> {
    let mut summary = DriveSummary::default();
    while summary.turns < max_turns && runtime.take_idle_request() {
        summary.turns += 1;
        let deadline = runtime.turn(budget);
        match root.perform_work(&deadline)? {
            WorkStatus::Committed(report) => summary.commits.push(report),
            WorkStatus::Yielded(continuation) => {
                log::trace!("turn {} yielded at {}", summary.turns, continuation.next_fiber());
            }
            WorkStatus::Idle => {}
        }
    }
    summary.idle = root.is_idle();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize};

    use fiber_core::{build, Child, Component, Element, Hooks, Props};
    use fiber_testing::RecordingHost;

    use super::*;

    #[test]
    fn scheduler_records_requests_and_wakes() {
        let scheduler = StdIdleScheduler::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        scheduler.set_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.request_idle_callback();
        assert!(scheduler.take_idle_request());
        assert!(!scheduler.take_idle_request());
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        scheduler.clear_waker();
        scheduler.request_idle_callback();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_budget_deadline_is_spent() {
        let deadline = TurnDeadline::starting_now(Duration::ZERO);
        assert_eq!(deadline.time_remaining(), Duration::ZERO);
        let roomy = TurnDeadline::starting_now(Duration::from_secs(60));
        assert!(roomy.time_remaining() > Duration::from_secs(1));
    }

    /// Clock that only moves when told to.
    #[derive(Debug, Clone, Default)]
    struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        fn advance(&self, millis: u64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }

        fn elapsed(&self, since: u64) -> Duration {
            Duration::from_millis(self.now().saturating_sub(since))
        }
    }

    #[test]
    fn deadline_counts_down_on_its_clock() {
        let clock = ManualClock::default();
        clock.advance(100);
        let deadline = TurnDeadline::start(clock.clone(), Duration::from_millis(10));
        assert_eq!(deadline.time_remaining(), Duration::from_millis(10));

        clock.advance(4);
        assert_eq!(deadline.time_remaining(), Duration::from_millis(6));
        clock.advance(20);
        assert_eq!(deadline.time_remaining(), Duration::ZERO);
    }

    #[test]
    fn turn_ends_when_its_clock_runs_out() {
        let clock = ManualClock::default();
        let (host, container) = RecordingHost::with_container("root");
        let mut root = RenderRoot::new(host);
        let tree = build("ul", Props::new(), ["a", "b"]).unwrap();
        root.render(tree, container).unwrap();

        // Spent before the turn starts: one unit, then a yield.
        let deadline = TurnDeadline::start(clock.clone(), Duration::from_millis(5));
        clock.advance(5);
        assert!(matches!(root.perform_work(&deadline), Ok(WorkStatus::Yielded(_))));

        let deadline = TurnDeadline::start(clock, Duration::from_millis(5));
        assert!(matches!(root.perform_work(&deadline), Ok(WorkStatus::Committed(_))));
        assert_eq!(root.backend().text_content(container), "ab");
    }

    #[test]
    fn render_requests_a_turn_and_drive_commits() {
        let runtime = StdRuntime::new();
        let (host, container) = RecordingHost::with_container("root");
        let mut root = RenderRoot::with_runtime(host, runtime.runtime());
        let tree = build("ul", Props::new(), ["a", "b", "c"]).unwrap();
        root.render(tree, container).unwrap();

        // A zero budget still makes progress: one unit per turn.
        let summary = drive_until_idle(&mut root, &runtime, Duration::ZERO, 100).unwrap();
        assert!(summary.idle);
        assert_eq!(summary.commits.len(), 1);
        assert_eq!(summary.turns, 5);
        assert_eq!(root.backend().text_content(container), "abc");
    }

    fn ticker(hooks: &mut Hooks, _props: &Props) -> Result<Element, fiber_core::BuildError> {
        let (count, set_count) = hooks.use_state(|| 0i64);
        if count < 3 {
            set_count.set(count + 1);
        }
        build("span", Props::new(), [Child::from(count)])
    }

    #[test]
    fn setter_updates_keep_turns_coming() {
        let runtime = StdRuntime::new();
        let (host, container) = RecordingHost::with_container("root");
        let mut root = RenderRoot::with_runtime(host, runtime.runtime());
        let element = fiber_core::leaf(Component::new("Ticker", ticker), Props::new());
        root.render(element, container).unwrap();

        let summary =
            drive_until_idle(&mut root, &runtime, Duration::from_secs(1), 50).unwrap();
        assert!(summary.idle);
        assert_eq!(summary.commits.len(), 4);
        assert_eq!(root.backend().text_content(container), "3");
    }
}
