//! Contract between the engine and the presentation backend.
//!
//! The engine never touches native nodes directly. It asks the backend to
//! allocate nodes, patch their attributes and listeners, and attach or
//! detach them; the backend hands out opaque [`NodeId`] handles.

use crate::error::HostError;
use crate::props::{Listener, PropValue};

pub type NodeId = usize;

/// Attribute that carries the value of a text node.
pub const TEXT_VALUE_PROP: &str = "nodeValue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element(&'a str),
    Text,
}

pub trait HostBackend {
    /// Allocates a detached native node.
    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<NodeId, HostError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &PropValue) -> Result<(), HostError>;

    /// Resets an attribute to an empty value.
    fn clear_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;

    fn add_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), HostError>;

    fn remove_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError>;

    /// Appends `child` to `parent`'s children.
    fn insert_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;

    /// Detaches `node` from its parent and releases it with its subtree.
    fn remove_node(&mut self, node: NodeId) -> Result<(), HostError>;
}
