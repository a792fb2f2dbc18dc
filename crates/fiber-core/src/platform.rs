//! Platform abstraction traits for the reconciler's host services.
//!
//! These traits let the engine delegate scheduling and timing to the host
//! environment. The engine never blocks or sleeps: it asks the host for a
//! new turn through [`IdleScheduler`] and polls a [`Deadline`] while a turn
//! is running.

use std::time::Duration;

/// The host's cooperative idle-callback primitive.
///
/// Implementations must arrange for the engine's work loop to be invoked
/// again later, on the thread that owns the render root.
pub trait IdleScheduler: Send + Sync {
    /// Request that the host run another scheduler turn.
    fn request_idle_callback(&self);
}

/// Time left in the current scheduler turn.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

impl<F> Deadline for F
where
    F: Fn() -> Duration,
{
    fn time_remaining(&self) -> Duration {
        self()
    }
}

/// Deadline that never runs out; a turn using it finishes the whole pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Provides timing information for turn deadlines.
pub trait Clock: Send + Sync {
    /// Instant type produced by this clock implementation.
    type Instant: Copy + Send + Sync + std::fmt::Debug;

    /// Returns the current instant.
    fn now(&self) -> Self::Instant;

    /// Returns the time elapsed since `since`.
    fn elapsed(&self, since: Self::Instant) -> Duration;
}
