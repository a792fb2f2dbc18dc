//! Testing utilities and harness for the fiber reconciler.

pub mod budget;
pub mod host;

pub use budget::{run_turns, CountingScheduler, TurnLog, UnitBudget};
pub use host::{HostNode, HostNodeKind, HostOp, Mutation, RecordingHost};

pub mod prelude {
    pub use crate::budget::*;
    pub use crate::host::*;
}
