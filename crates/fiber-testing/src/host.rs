//! In-memory presentation backend that records every call it receives.

use std::fmt::Write as _;

use fiber_core::{Event, HostBackend, HostError, Listener, NodeId, NodeKind, PropValue, TEXT_VALUE_PROP};
use hashbrown::HashMap;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    CreateNode,
    SetAttribute,
    ClearAttribute,
    AddListener,
    RemoveListener,
    InsertChild,
    RemoveNode,
}

impl HostOp {
    pub fn as_str(self) -> &'static str {
        match self {
            HostOp::CreateNode => "create_node",
            HostOp::SetAttribute => "set_attribute",
            HostOp::ClearAttribute => "clear_attribute",
            HostOp::AddListener => "add_listener",
            HostOp::RemoveListener => "remove_listener",
            HostOp::InsertChild => "insert_child",
            HostOp::RemoveNode => "remove_node",
        }
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateNode { node: NodeId, kind: String },
    SetAttribute { node: NodeId, name: String, value: PropValue },
    ClearAttribute { node: NodeId, name: String },
    AddListener { node: NodeId, event: String, listener: Listener },
    RemoveListener { node: NodeId, event: String, listener: Listener },
    InsertChild { parent: NodeId, child: NodeId },
    RemoveNode { node: NodeId },
}

impl Mutation {
    pub fn op(&self) -> HostOp {
        match self {
            Mutation::CreateNode { .. } => HostOp::CreateNode,
            Mutation::SetAttribute { .. } => HostOp::SetAttribute,
            Mutation::ClearAttribute { .. } => HostOp::ClearAttribute,
            Mutation::AddListener { .. } => HostOp::AddListener,
            Mutation::RemoveListener { .. } => HostOp::RemoveListener,
            Mutation::InsertChild { .. } => HostOp::InsertChild,
            Mutation::RemoveNode { .. } => HostOp::RemoveNode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNodeKind {
    Element(String),
    Text,
}

#[derive(Debug, Clone)]
pub struct HostNode {
    pub kind: HostNodeKind,
    pub attributes: IndexMap<String, PropValue>,
    pub listeners: HashMap<String, Vec<Listener>>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl HostNode {
    fn new(kind: HostNodeKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            listeners: HashMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn tag(&self) -> &str {
        match &self.kind {
            HostNodeKind::Element(tag) => tag,
            HostNodeKind::Text => "#text",
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }
}

#[derive(Default)]
pub struct RecordingHost {
    nodes: Vec<Option<HostNode>>,
    mutations: Vec<Mutation>,
    fail_on: Option<HostOp>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with one detached container element; creating it is not
    /// recorded.
    pub fn with_container(tag: &str) -> (Self, NodeId) {
        let mut host = Self::new();
        let container = host.alloc(HostNodeKind::Element(tag.to_owned()));
        (host, container)
    }

    /// Makes every later call of `op` fail with [`HostError::Rejected`].
    pub fn fail_on(&mut self, op: HostOp) {
        self.fail_on = Some(op);
    }

    pub fn clear_failure(&mut self) {
        self.fail_on = None;
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn count(&self, op: HostOp) -> usize {
        self.mutations.iter().filter(|m| m.op() == op).count()
    }

    pub fn node(&self, id: NodeId) -> Option<&HostNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    /// Live nodes, containers included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text of every text node under `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.kind == HostNodeKind::Text {
            if let Some(value) = node.attribute(TEXT_VALUE_PROP) {
                let _ = write!(out, "{value}");
            }
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// First node under `root` (inclusive) whose attribute `name` equals
    /// `value`, searching depth-first.
    pub fn find_by_attribute(&self, root: NodeId, name: &str, value: &PropValue) -> Option<NodeId> {
        let node = self.node(root)?;
        if node.attribute(name) == Some(value) {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|child| self.find_by_attribute(*child, name, value))
    }

    /// Invokes every listener registered for `event.name` on `node` and
    /// returns how many ran.
    pub fn dispatch(&self, node: NodeId, event: &Event) -> usize {
        let listeners = self
            .node(node)
            .and_then(|n| n.listeners.get(&event.name))
            .cloned()
            .unwrap_or_default();
        for listener in &listeners {
            listener.call(event);
        }
        listeners.len()
    }

    pub fn dump_tree(&self, root: NodeId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.node(id) else {
            let _ = writeln!(output, "{indent}[{id}] (missing)");
            return;
        };
        let _ = write!(output, "{indent}[{id}] {}", node.tag());
        for (name, value) in &node.attributes {
            let _ = write!(output, " {name}={value:?}");
        }
        output.push('\n');
        for child in &node.children {
            self.dump_node(output, *child, depth + 1);
        }
    }

    fn alloc(&mut self, kind: HostNodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(HostNode::new(kind)));
        id
    }

    fn check(&self, op: HostOp) -> Result<(), HostError> {
        if self.fail_on == Some(op) {
            return Err(HostError::Rejected {
                op: op.as_str(),
                reason: "injected failure".to_owned(),
            });
        }
        Ok(())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut HostNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    fn detach(&mut self, id: NodeId) -> Result<(), HostError> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        Ok(())
    }

    fn release(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.release(child);
        }
    }
}

impl HostBackend for RecordingHost {
    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<NodeId, HostError> {
        self.check(HostOp::CreateNode)?;
        let kind = match kind {
            NodeKind::Element(tag) => HostNodeKind::Element(tag.to_owned()),
            NodeKind::Text => HostNodeKind::Text,
        };
        let node = self.alloc(kind);
        let label = self.node(node).map(|n| n.tag().to_owned()).unwrap_or_default();
        self.mutations.push(Mutation::CreateNode { node, kind: label });
        Ok(node)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &PropValue) -> Result<(), HostError> {
        self.check(HostOp::SetAttribute)?;
        self.node_mut(node)?
            .attributes
            .insert(name.to_owned(), value.clone());
        self.mutations.push(Mutation::SetAttribute {
            node,
            name: name.to_owned(),
            value: value.clone(),
        });
        Ok(())
    }

    fn clear_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.check(HostOp::ClearAttribute)?;
        self.node_mut(node)?
            .attributes
            .insert(name.to_owned(), PropValue::from(""));
        self.mutations.push(Mutation::ClearAttribute {
            node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn add_listener(&mut self, node: NodeId, event: &str, listener: &Listener) -> Result<(), HostError> {
        self.check(HostOp::AddListener)?;
        self.node_mut(node)?
            .listeners
            .entry(event.to_owned())
            .or_default()
            .push(listener.clone());
        self.mutations.push(Mutation::AddListener {
            node,
            event: event.to_owned(),
            listener: listener.clone(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError> {
        self.check(HostOp::RemoveListener)?;
        if let Some(registered) = self.node_mut(node)?.listeners.get_mut(event) {
            registered.retain(|existing| !existing.ptr_eq(listener));
        }
        self.mutations.push(Mutation::RemoveListener {
            node,
            event: event.to_owned(),
            listener: listener.clone(),
        });
        Ok(())
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.check(HostOp::InsertChild)?;
        self.node_mut(parent)?;
        self.detach(child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        self.mutations.push(Mutation::InsertChild { parent, child });
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), HostError> {
        self.check(HostOp::RemoveNode)?;
        self.detach(node)?;
        self.release(node);
        self.mutations.push(Mutation::RemoveNode { node });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_node_releases_subtree() {
        let (mut host, root) = RecordingHost::with_container("root");
        let div = host.create_node(NodeKind::Element("div")).unwrap();
        let text = host.create_node(NodeKind::Text).unwrap();
        host.insert_child(root, div).unwrap();
        host.insert_child(div, text).unwrap();
        assert_eq!(host.len(), 3);

        host.remove_node(div).unwrap();
        assert_eq!(host.len(), 1);
        assert!(host.children(root).is_empty());
        assert!(host.node(text).is_none());
        assert_eq!(host.count(HostOp::RemoveNode), 1);
    }

    #[test]
    fn injected_failure_is_reported() {
        let mut host = RecordingHost::new();
        host.fail_on(HostOp::CreateNode);
        let err = host.create_node(NodeKind::Text).unwrap_err();
        assert_eq!(
            err,
            HostError::Rejected {
                op: "create_node",
                reason: "injected failure".to_owned()
            }
        );
        assert!(host.mutations().is_empty());
    }

    #[test]
    fn dispatch_reaches_registered_listeners() {
        use std::cell::Cell;
        use std::rc::Rc;

        let (mut host, root) = RecordingHost::with_container("root");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let listener = Listener::new(move |_| counter.set(counter.get() + 1));
        host.add_listener(root, "click", &listener).unwrap();
        assert_eq!(host.dispatch(root, &Event::new("click")), 1);
        host.remove_listener(root, "click", &listener).unwrap();
        assert_eq!(host.dispatch(root, &Event::new("click")), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn text_content_follows_document_order() {
        let (mut host, root) = RecordingHost::with_container("root");
        for value in ["a", "b"] {
            let text = host.create_node(NodeKind::Text).unwrap();
            host.set_attribute(text, TEXT_VALUE_PROP, &value.into()).unwrap();
            host.insert_child(root, text).unwrap();
        }
        assert_eq!(host.text_content(root), "ab");
        assert!(host.dump_tree(root).contains("#text nodeValue=\"b\""));
    }
}
