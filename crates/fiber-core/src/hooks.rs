//! Per-fiber hook slots.
//!
//! Every component fiber owns an ordered list of state slots and an ordered
//! list of effect slots. A component must call its hooks unconditionally and
//! in the same order on every render: slots are matched by call position
//! only. When an UPDATE fiber runs, the slots of its alternate are moved onto
//! it before the component function is invoked.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use crate::props::PropValue;
use crate::runtime::RuntimeHandle;

type Action<T> = Box<dyn FnOnce(&T) -> T>;
type Effect = Box<dyn FnOnce() -> EffectCleanup>;

struct StateCell<T> {
    value: T,
    queue: Vec<Action<T>>,
}

impl<T> StateCell<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            queue: Vec::new(),
        }
    }

    fn apply_pending(&mut self) {
        for action in mem::take(&mut self.queue) {
            self.value = action(&self.value);
        }
    }
}

/// Cleanup returned by an effect; runs before the effect re-runs and when
/// the owning component is removed.
#[derive(Default)]
pub struct EffectCleanup(Option<Box<dyn FnOnce()>>);

impl EffectCleanup {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(cleanup)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub(crate) fn run(self) {
        if let Some(cleanup) = self.0 {
            cleanup();
        }
    }
}

impl fmt::Debug for EffectCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EffectCleanup").field(&self.0.is_some()).finish()
    }
}

/// Deps are those of the last effect that ran; a scheduled effect carries
/// its own until commit runs it.
struct EffectSlot {
    deps: Option<Vec<PropValue>>,
    cleanup: Option<EffectCleanup>,
    pending: Option<(Effect, Option<Vec<PropValue>>)>,
}

#[derive(Default)]
pub(crate) struct HookSlots {
    states: Vec<Rc<dyn Any>>,
    effects: Vec<EffectSlot>,
}

impl HookSlots {
    pub(crate) fn state_len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn effect_len(&self) -> usize {
        self.effects.len()
    }

    pub(crate) fn has_pending_effects(&self) -> bool {
        self.effects.iter().any(|slot| slot.pending.is_some())
    }

    /// Cleanups of effects scheduled to re-run this commit.
    pub(crate) fn take_stale_cleanups(&mut self, out: &mut Vec<EffectCleanup>) {
        for slot in &mut self.effects {
            if slot.pending.is_some() {
                out.extend(slot.cleanup.take());
            }
        }
    }

    /// Runs scheduled effects and returns how many ran.
    pub(crate) fn run_pending_effects(&mut self) -> usize {
        let mut ran = 0;
        for slot in &mut self.effects {
            if let Some((effect, deps)) = slot.pending.take() {
                slot.deps = deps;
                slot.cleanup = Some(effect());
                ran += 1;
            }
        }
        ran
    }

    /// Drops effects scheduled by a render that never committed.
    pub(crate) fn discard_pending(&mut self) {
        for slot in &mut self.effects {
            slot.pending = None;
        }
    }

    /// Every cleanup, for a fiber that is being removed.
    pub(crate) fn drain_cleanups(&mut self, out: &mut Vec<EffectCleanup>) {
        for slot in self.effects.drain(..) {
            out.extend(slot.cleanup);
        }
        self.states.clear();
    }
}

/// Hook context handed to a component function for one invocation.
pub struct Hooks {
    slots: HookSlots,
    state_cursor: usize,
    effect_cursor: usize,
    runtime: RuntimeHandle,
    component: &'static str,
}

impl Hooks {
    pub(crate) fn new(slots: HookSlots, runtime: RuntimeHandle, component: &'static str) -> Self {
        Self {
            slots,
            state_cursor: 0,
            effect_cursor: 0,
            runtime,
            component,
        }
    }

    pub fn component_name(&self) -> &'static str {
        self.component
    }

    /// Returns the slot's current value and a setter for it.
    ///
    /// Actions queued through the setter are applied, in order, the next
    /// time this component renders.
    pub fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, Setter<T>) {
        let index = self.state_cursor;
        self.state_cursor += 1;

        let existing = self
            .slots
            .states
            .get(index)
            .cloned()
            .map(|slot| slot.downcast::<RefCell<StateCell<T>>>());
        let cell = match existing {
            Some(Ok(cell)) => cell,
            Some(Err(_)) => {
                log::warn!(
                    "state slot {index} of `{}` changed type between renders; reinitialising",
                    self.component
                );
                let cell = Rc::new(RefCell::new(StateCell::new(init())));
                let erased: Rc<dyn Any> = cell.clone();
                self.slots.states[index] = erased;
                cell
            }
            None => {
                let cell = Rc::new(RefCell::new(StateCell::new(init())));
                let erased: Rc<dyn Any> = cell.clone();
                self.slots.states.push(erased);
                cell
            }
        };

        let value = {
            let mut state = cell.borrow_mut();
            state.apply_pending();
            state.value.clone()
        };
        let setter = Setter {
            cell: Rc::downgrade(&cell),
            runtime: self.runtime.clone(),
        };
        (value, setter)
    }

    /// Schedules `effect` to run after the commit that follows this render.
    ///
    /// With `deps == None` the effect runs after every commit. Otherwise it
    /// runs on mount and whenever a dependency differs from the previous
    /// render; `Some(vec![])` therefore runs once.
    pub fn use_effect(
        &mut self,
        deps: Option<Vec<PropValue>>,
        effect: impl FnOnce() -> EffectCleanup + 'static,
    ) {
        let index = self.effect_cursor;
        self.effect_cursor += 1;

        match self.slots.effects.get_mut(index) {
            Some(slot) => {
                let changed = match (&slot.deps, &deps) {
                    (Some(old), Some(new)) => old != new,
                    _ => true,
                };
                slot.pending = changed.then(|| (Box::new(effect) as Effect, deps));
            }
            None => self.slots.effects.push(EffectSlot {
                deps: None,
                cleanup: None,
                pending: Some((Box::new(effect), deps)),
            }),
        }
    }

    /// Hands the slots back, dropping any beyond the last hook called this
    /// render. Cleanups of dropped effect slots are returned so they can run
    /// at commit.
    pub(crate) fn finish(mut self) -> (HookSlots, Vec<EffectCleanup>) {
        self.slots.states.truncate(self.state_cursor);
        let mut orphaned = Vec::new();
        for slot in self.slots.effects.drain(self.effect_cursor.min(self.slots.effects.len())..) {
            orphaned.extend(slot.cleanup);
        }
        (self.slots, orphaned)
    }
}

/// Setter returned by [`Hooks::use_state`].
///
/// Setting a value queues it for the slot and requests a new render pass.
/// Setters of a removed component do nothing.
pub struct Setter<T> {
    cell: Weak<RefCell<StateCell<T>>>,
    runtime: RuntimeHandle,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: 'static> Setter<T> {
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    pub fn update(&self, action: impl FnOnce(&T) -> T + 'static) {
        let Some(cell) = self.cell.upgrade() else {
            log::trace!("state update for a removed component ignored");
            return;
        };
        cell.borrow_mut().queue.push(Box::new(action));
        self.runtime.request_update();
    }

    pub fn is_mounted(&self) -> bool {
        self.cell.strong_count() > 0
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("mounted", &(self.cell.strong_count() > 0))
            .finish()
    }
}
