//! The fiber arena.
//!
//! Fibers of the committed tree and of the work-in-progress tree live side by
//! side in one [`FiberArena`] and refer to each other through [`FiberId`]s.
//! `parent`, `child` and `sibling` stay inside one generation; `alternate` is
//! the only link from a work-in-progress fiber to its committed predecessor
//! and is cleared once the new tree is committed.

use std::fmt;
use std::rc::Rc;

use crate::element::{Component, Element, ElementType};
use crate::error::RenderError;
use crate::hooks::HookSlots;
use crate::host::NodeId;
use crate::props::Props;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(u32);

impl FiberId {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTag {
    Placement,
    Update,
    /// Set on the root of a removed subtree only. Its descendants keep the
    /// tag of the pass that produced them and go with it at commit.
    Deletion,
}

#[derive(Clone, Debug)]
pub(crate) enum FiberKind {
    /// Container fiber created by `render`; its node is the container.
    Root,
    Host(Rc<str>),
    Text,
    Fragment,
    Component(Component),
}

impl FiberKind {
    pub(crate) fn matches(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (FiberKind::Host(a), ElementType::Host(b)) => a == b,
            (FiberKind::Text, ElementType::Text) => true,
            (FiberKind::Fragment, ElementType::Fragment) => true,
            (FiberKind::Component(a), ElementType::Component(b)) => a == b,
            _ => false,
        }
    }

    pub(crate) fn label(&self) -> &str {
        match self {
            FiberKind::Root => "#root",
            FiberKind::Host(tag) => tag,
            FiberKind::Text => "#text",
            FiberKind::Fragment => "#fragment",
            FiberKind::Component(component) => component.name(),
        }
    }
}

impl From<&ElementType> for FiberKind {
    fn from(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(tag) => FiberKind::Host(Rc::clone(tag)),
            ElementType::Text => FiberKind::Text,
            ElementType::Fragment => FiberKind::Fragment,
            ElementType::Component(component) => FiberKind::Component(*component),
        }
    }
}

pub(crate) struct Fiber {
    pub(crate) kind: FiberKind,
    pub(crate) props: Rc<Props>,
    pub(crate) dom: Option<NodeId>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect: Option<EffectTag>,
    pub(crate) hooks: Option<HookSlots>,
}

impl Fiber {
    pub(crate) fn root(props: Rc<Props>, container: NodeId, alternate: Option<FiberId>) -> Self {
        Self {
            kind: FiberKind::Root,
            props,
            dom: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect: None,
            hooks: None,
        }
    }

    pub(crate) fn placement(element: &Element, parent: FiberId) -> Self {
        Self {
            kind: FiberKind::from(element.element_type()),
            props: element.shared_props(),
            dom: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect: Some(EffectTag::Placement),
            hooks: None,
        }
    }

    /// Reuses `old`'s native node; hook slots move over when the fiber runs.
    pub(crate) fn update(old: &Fiber, old_id: FiberId, element: &Element, parent: FiberId) -> Self {
        Self {
            kind: old.kind.clone(),
            props: element.shared_props(),
            dom: old.dom,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(old_id),
            effect: Some(EffectTag::Update),
            hooks: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct FiberArena {
    slots: Vec<Option<Fiber>>,
    free: Vec<FiberId>,
    live: usize,
}

impl FiberArena {
    pub(crate) fn alloc(&mut self, fiber: Fiber) -> FiberId {
        self.live += 1;
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(fiber);
            return id;
        }
        let id = FiberId(self.slots.len() as u32);
        self.slots.push(Some(fiber));
        id
    }

    pub(crate) fn get(&self, id: FiberId) -> Result<&Fiber, RenderError> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(RenderError::MissingFiber { id })
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Result<&mut Fiber, RenderError> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(RenderError::MissingFiber { id })
    }

    pub(crate) fn free(&mut self, id: FiberId) -> Option<Fiber> {
        let fiber = self.slots.get_mut(id.index())?.take()?;
        self.live -= 1;
        self.free.push(id);
        Some(fiber)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Ids of `root` and every fiber below it, in depth-first order.
    pub(crate) fn subtree(&self, root: FiberId) -> Result<Vec<FiberId>, RenderError> {
        let mut ids = vec![root];
        let mut cursor = self.get(root)?.child;
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.next_in_walk(id, root)?;
        }
        Ok(ids)
    }

    /// Next fiber in depth-first order: the child, else the nearest sibling
    /// of `id` or of one of its ancestors below `stop`.
    pub(crate) fn next_in_walk(&self, id: FiberId, stop: FiberId) -> Result<Option<FiberId>, RenderError> {
        let fiber = self.get(id)?;
        if fiber.child.is_some() {
            return Ok(fiber.child);
        }
        let mut cursor = id;
        loop {
            if cursor == stop {
                return Ok(None);
            }
            let fiber = self.get(cursor)?;
            if fiber.sibling.is_some() {
                return Ok(fiber.sibling);
            }
            match fiber.parent {
                Some(parent) => cursor = parent,
                None => return Ok(None),
            }
        }
    }

    pub(crate) fn children(&self, id: FiberId) -> Result<Vec<FiberId>, RenderError> {
        let mut ids = Vec::new();
        let mut cursor = self.get(id)?.child;
        while let Some(child) = cursor {
            ids.push(child);
            cursor = self.get(child)?.sibling;
        }
        Ok(ids)
    }
}

/// Read-only view of one fiber.
#[derive(Clone, Copy)]
pub struct FiberRef<'a> {
    id: FiberId,
    fiber: &'a Fiber,
}

impl<'a> FiberRef<'a> {
    pub(crate) fn new(id: FiberId, fiber: &'a Fiber) -> Self {
        Self { id, fiber }
    }

    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Tag name, component name, or `#root`/`#text`/`#fragment`.
    pub fn label(&self) -> &'a str {
        self.fiber.kind.label()
    }

    pub fn is_component(&self) -> bool {
        matches!(self.fiber.kind, FiberKind::Component(_))
    }

    pub fn effect_tag(&self) -> Option<EffectTag> {
        self.fiber.effect
    }

    pub fn node(&self) -> Option<NodeId> {
        self.fiber.dom
    }

    pub fn props(&self) -> &'a Props {
        &self.fiber.props
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.fiber.parent
    }

    pub fn first_child(&self) -> Option<FiberId> {
        self.fiber.child
    }

    pub fn next_sibling(&self) -> Option<FiberId> {
        self.fiber.sibling
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.fiber.alternate
    }

    pub fn state_slot_count(&self) -> usize {
        self.fiber.hooks.as_ref().map_or(0, HookSlots::state_len)
    }

    pub fn effect_slot_count(&self) -> usize {
        self.fiber.hooks.as_ref().map_or(0, HookSlots::effect_len)
    }
}

impl fmt::Debug for FiberRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberRef")
            .field("id", &self.id)
            .field("label", &self.label())
            .field("effect", &self.fiber.effect)
            .field("node", &self.fiber.dom)
            .finish()
    }
}
