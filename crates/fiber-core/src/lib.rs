//! Core runtime pieces for the fiber reconciler: element trees are diffed into
//! host mutations across cooperative scheduler turns.

pub mod adapter;
mod commit;
pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod platform;
pub mod props;
mod reconcile;
pub mod root;
pub mod runtime;
pub mod work_loop;

pub use config::SchedulerConfig;
pub use element::{build, fragment, leaf, text, Child, Component, Element, ElementType, RenderFn};
pub use error::{BuildError, HostError, RenderError};
pub use fiber::{EffectTag, FiberId, FiberRef};
pub use hooks::{EffectCleanup, Hooks, Setter};
pub use host::{HostBackend, NodeId, NodeKind, TEXT_VALUE_PROP};
pub use platform::{Clock, Deadline, IdleScheduler, Unbounded};
pub use props::{Event, Listener, PropValue, Props};
pub use root::RenderRoot;
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use work_loop::{CommitReport, Continuation, WorkStatus};
