use thiserror::Error;

use crate::fiber::FiberId;
use crate::host::NodeId;

/// Raised while turning child arguments into element descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("child {index} is a {found} value, expected an element, string or number")]
    MalformedChild { index: usize, found: &'static str },
}

/// Failure reported by a presentation backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("native node {id} missing")]
    Missing { id: NodeId },
    #[error("backend rejected {op}: {reason}")]
    Rejected { op: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("a render pass is already in progress")]
    PassInProgress,
    #[error("continuation does not match the pending unit of work")]
    StaleContinuation,
    #[error("fiber {id} missing from the arena")]
    MissingFiber { id: FiberId },
    #[error("fiber {id} has no host ancestor to attach to")]
    DetachedFiber { id: FiberId },
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Host(#[from] HostError),
}
