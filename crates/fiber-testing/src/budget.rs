//! Deterministic turn budgets for driving the work loop in tests.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fiber_core::{CommitReport, Deadline, HostBackend, IdleScheduler, RenderError, RenderRoot, WorkStatus};

/// Deadline that lets exactly `units` units of work run in one turn,
/// independent of wall-clock time and of the configured yield threshold.
#[derive(Debug)]
pub struct UnitBudget {
    remaining: Cell<usize>,
}

impl UnitBudget {
    pub fn units(units: usize) -> Self {
        Self {
            remaining: Cell::new(units.saturating_sub(1)),
        }
    }

    /// A budget that is already spent: the turn runs its one mandatory unit.
    pub fn exhausted() -> Self {
        Self::units(1)
    }
}

impl Deadline for UnitBudget {
    fn time_remaining(&self) -> Duration {
        match self.remaining.get() {
            0 => Duration::ZERO,
            n => {
                self.remaining.set(n - 1);
                Duration::MAX
            }
        }
    }
}

/// Idle scheduler that only counts how often a new turn was requested.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    requests: AtomicUsize,
}

impl CountingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::SeqCst);
    }
}

impl IdleScheduler for CountingScheduler {
    fn request_idle_callback(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// What happened across a series of turns.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TurnLog {
    /// Turns that did any work.
    pub turns: usize,
    pub yields: usize,
    pub commits: Vec<CommitReport>,
    /// Whether the root reached idle before the turn limit.
    pub settled: bool,
}

/// Runs turns of `units_per_turn` units each until the root goes idle or
/// `max_turns` turns have done work.
pub fn run_turns<B: HostBackend>(
    root: &mut RenderRoot<B>,
    units_per_turn: usize,
    max_turns: usize,
) -> Result<TurnLog, RenderError> {
    let mut log = TurnLog::default();
    while log.turns < max_turns {
        match root.perform_work(&UnitBudget::units(units_per_turn))? {
            WorkStatus::Idle => {
                log.settled = true;
                return Ok(log);
            }
            WorkStatus::Yielded(_) => log.yields += 1,
            WorkStatus::Committed(report) => log.commits.push(report),
        }
        log.turns += 1;
    }
    log.settled = root.is_idle();
    log::trace!("stopped after {} turns, settled: {}", log.turns, log.settled);
    Ok(log)
}
