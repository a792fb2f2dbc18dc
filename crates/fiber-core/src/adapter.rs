//! Presentation adapter: native node creation and prop diffing.
//!
//! Patching runs in four ordered phases so a changed listener never fires
//! twice and a removed attribute is cleared before new values land:
//! stale listeners are removed, vanished attributes cleared, new or changed
//! attributes assigned, then new or changed listeners registered.

use crate::error::HostError;
use crate::host::{HostBackend, NodeId, NodeKind};
use crate::props::{PropValue, Props};

/// Counts of backend calls issued by one [`patch_node`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchSummary {
    pub listeners_removed: usize,
    pub attributes_cleared: usize,
    pub attributes_set: usize,
    pub listeners_added: usize,
}

impl PatchSummary {
    pub fn total(&self) -> usize {
        self.listeners_removed + self.attributes_cleared + self.attributes_set + self.listeners_added
    }
}

pub fn is_event(key: &str, prefix: &str) -> bool {
    key.len() > prefix.len() && key.starts_with(prefix)
}

/// `onClick` with prefix `on` becomes `click`; keys that are not events
/// give `None`.
pub fn event_name(key: &str, prefix: &str) -> Option<String> {
    key.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty())
        .map(str::to_lowercase)
}

/// Allocates a native node and applies its initial props.
pub fn create_node<B>(
    backend: &mut B,
    kind: NodeKind<'_>,
    props: &Props,
    event_prefix: &str,
) -> Result<NodeId, HostError>
where
    B: HostBackend + ?Sized,
{
    let node = backend.create_node(kind)?;
    patch_node(backend, node, &Props::new(), props, event_prefix)?;
    Ok(node)
}

pub fn patch_node<B>(
    backend: &mut B,
    node: NodeId,
    prev: &Props,
    next: &Props,
    event_prefix: &str,
) -> Result<PatchSummary, HostError>
where
    B: HostBackend + ?Sized,
{
    let mut summary = PatchSummary::default();
    let changed = |key: &str, value: &PropValue, other: &Props| other.get(key) != Some(value);

    for (key, value) in prev.attributes() {
        let (Some(event), PropValue::Listener(listener)) = (event_name(key, event_prefix), value) else {
            continue;
        };
        if changed(key, value, next) {
            backend.remove_listener(node, &event, listener)?;
            summary.listeners_removed += 1;
        }
    }

    for (key, _) in prev.attributes() {
        if !is_event(key, event_prefix) && !next.contains_key(key) {
            backend.clear_attribute(node, key)?;
            summary.attributes_cleared += 1;
        }
    }

    for (key, value) in next.attributes() {
        if !is_event(key, event_prefix) && changed(key, value, prev) {
            backend.set_attribute(node, key, value)?;
            summary.attributes_set += 1;
        }
    }

    for (key, value) in next.attributes() {
        let Some(event) = event_name(key, event_prefix) else {
            continue;
        };
        if !changed(key, value, prev) {
            continue;
        }
        match value {
            PropValue::Listener(listener) => {
                backend.add_listener(node, &event, listener)?;
                summary.listeners_added += 1;
            }
            other => log::warn!(
                "ignoring {} value under event prop `{key}` on node {node}",
                other.kind()
            ),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::Listener;

    #[derive(Debug, PartialEq)]
    enum Call {
        Create,
        Set(String, PropValue),
        Clear(String),
        Add(String),
        Remove(String),
    }

    #[derive(Default)]
    struct LogBackend {
        calls: Vec<Call>,
    }

    impl HostBackend for LogBackend {
        fn create_node(&mut self, _kind: NodeKind<'_>) -> Result<NodeId, HostError> {
            self.calls.push(Call::Create);
            Ok(7)
        }

        fn set_attribute(&mut self, _node: NodeId, name: &str, value: &PropValue) -> Result<(), HostError> {
            self.calls.push(Call::Set(name.to_owned(), value.clone()));
            Ok(())
        }

        fn clear_attribute(&mut self, _node: NodeId, name: &str) -> Result<(), HostError> {
            self.calls.push(Call::Clear(name.to_owned()));
            Ok(())
        }

        fn add_listener(&mut self, _node: NodeId, event: &str, _listener: &Listener) -> Result<(), HostError> {
            self.calls.push(Call::Add(event.to_owned()));
            Ok(())
        }

        fn remove_listener(
            &mut self,
            _node: NodeId,
            event: &str,
            _listener: &Listener,
        ) -> Result<(), HostError> {
            self.calls.push(Call::Remove(event.to_owned()));
            Ok(())
        }

        fn insert_child(&mut self, _parent: NodeId, _child: NodeId) -> Result<(), HostError> {
            Ok(())
        }

        fn remove_node(&mut self, _node: NodeId) -> Result<(), HostError> {
            Ok(())
        }
    }

    #[test]
    fn event_names_strip_prefix_and_lowercase() {
        assert!(is_event("onClick", "on"));
        assert!(!is_event("on", "on"));
        assert!(!is_event("id", "on"));
        assert_eq!(event_name("onMouseDown", "on").as_deref(), Some("mousedown"));
        assert_eq!(event_name("on", "on"), None);
        assert_eq!(event_name("a", "on"), None);
        assert_eq!(event_name("title", "on"), None);
    }

    #[test]
    fn create_applies_initial_props() {
        let mut backend = LogBackend::default();
        let props = Props::new().with("id", "a").on("onClick", |_| {});
        let node = create_node(&mut backend, NodeKind::Element("div"), &props, "on").expect("create");
        assert_eq!(node, 7);
        assert_eq!(
            backend.calls,
            vec![
                Call::Create,
                Call::Set("id".into(), "a".into()),
                Call::Add("click".into())
            ]
        );
    }

    #[test]
    fn patch_orders_phases() {
        let mut backend = LogBackend::default();
        let prev = Props::new()
            .with("title", "old")
            .with("id", "a")
            .on("onClick", |_| {});
        let next = Props::new().with("id", "b").on("onClick", |_| {});
        let summary = patch_node(&mut backend, 1, &prev, &next, "on").expect("patch");
        assert_eq!(
            backend.calls,
            vec![
                Call::Remove("click".into()),
                Call::Clear("title".into()),
                Call::Set("id".into(), "b".into()),
                Call::Add("click".into()),
            ]
        );
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn identical_props_issue_no_calls() {
        let mut backend = LogBackend::default();
        let listener = Listener::new(|_| {});
        let props = Props::new().with("id", "a").with("onInput", listener);
        let summary = patch_node(&mut backend, 1, &props, &props.clone(), "on").expect("patch");
        assert!(backend.calls.is_empty());
        assert_eq!(summary, PatchSummary::default());
    }

    #[test]
    fn removed_listener_is_deregistered_without_replacement() {
        let mut backend = LogBackend::default();
        let prev = Props::new().on("onClick", |_| {});
        let summary = patch_node(&mut backend, 1, &prev, &Props::new(), "on").expect("patch");
        assert_eq!(backend.calls, vec![Call::Remove("click".into())]);
        assert_eq!(summary.listeners_removed, 1);
    }
}
