use std::fmt::Write as _;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::element::Element;
use crate::error::RenderError;
use crate::fiber::{Fiber, FiberArena, FiberId, FiberRef};
use crate::hooks::EffectCleanup;
use crate::host::{HostBackend, NodeId};
use crate::props::Props;
use crate::runtime::{DefaultScheduler, Runtime, RuntimeHandle};

/// One independent render tree bound to a presentation backend.
///
/// The root holds what would otherwise be process-wide scheduler state: the
/// committed tree, the work-in-progress tree, the next unit of work and the
/// pending deletion list. Work only happens inside
/// [`perform_work`](RenderRoot::perform_work) turns.
pub struct RenderRoot<B: HostBackend> {
    pub(crate) backend: B,
    pub(crate) arena: FiberArena,
    pub(crate) runtime: Runtime,
    pub(crate) config: SchedulerConfig,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) orphaned_cleanups: Vec<EffectCleanup>,
    pub(crate) pass: u64,
}

impl<B: HostBackend> RenderRoot<B> {
    pub fn new(backend: B) -> Self {
        Self::with_runtime(backend, Runtime::new(Arc::new(DefaultScheduler)))
    }

    pub fn with_runtime(backend: B, runtime: Runtime) -> Self {
        Self {
            backend,
            arena: FiberArena::default(),
            runtime,
            config: SchedulerConfig::default(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            orphaned_cleanups: Vec::new(),
            pass: 0,
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts a render pass of `element` into `container`.
    ///
    /// No work happens here; the pass runs in subsequent
    /// [`perform_work`](RenderRoot::perform_work) turns and is diffed against
    /// the last committed tree. Calling this while a pass is still in flight
    /// fails with [`RenderError::PassInProgress`].
    pub fn render(&mut self, element: Element, container: NodeId) -> Result<(), RenderError> {
        if self.wip_root.is_some() {
            return Err(RenderError::PassInProgress);
        }
        // Queued state updates are picked up by this pass.
        self.runtime.take_update_request();
        let props = Rc::new(Props::new().with_children(vec![element]));
        self.begin_pass(Fiber::root(props, container, self.current_root));
        Ok(())
    }

    /// Starts a pass that re-renders the committed tree, used when a state
    /// setter requested an update.
    pub(crate) fn begin_update_pass(&mut self) -> Result<bool, RenderError> {
        let Some(current) = self.current_root else {
            return Ok(false);
        };
        let fiber = self.arena.get(current)?;
        let container = fiber.dom.ok_or(RenderError::DetachedFiber { id: current })?;
        let props = Rc::clone(&fiber.props);
        self.begin_pass(Fiber::root(props, container, Some(current)));
        Ok(true)
    }

    fn begin_pass(&mut self, root: Fiber) {
        debug_assert!(self.deletions.is_empty());
        let id = self.arena.alloc(root);
        self.pass += 1;
        self.wip_root = Some(id);
        self.next_unit = Some(id);
        log::debug!("render pass {} started at root {id}", self.pass);
        self.runtime.request_idle_callback();
    }

    /// Drops the in-flight pass after a failure. Hook slots already moved
    /// onto work-in-progress fibers go back to their committed fibers
    /// without the effects the failed render scheduled. Cleanups of effect
    /// slots that render dropped run here, since no commit will.
    pub(crate) fn abandon_pass(&mut self) {
        let Some(wip) = self.wip_root.take() else {
            return;
        };
        self.next_unit = None;
        self.deletions.clear();
        for cleanup in std::mem::take(&mut self.orphaned_cleanups) {
            cleanup.run();
        }
        let ids = match self.arena.subtree(wip) {
            Ok(ids) => ids,
            Err(err) => {
                log::error!("abandoning pass {}: {err}", self.pass);
                vec![wip]
            }
        };
        for id in ids {
            let Some(mut fiber) = self.arena.free(id) else {
                continue;
            };
            if let (Some(mut hooks), Some(alternate)) = (fiber.hooks.take(), fiber.alternate) {
                hooks.discard_pending();
                if let Ok(old) = self.arena.get_mut(alternate) {
                    old.hooks = Some(hooks);
                }
            }
        }
        log::warn!("render pass {} abandoned", self.pass);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Root of the last committed tree.
    pub fn current_root(&self) -> Option<FiberId> {
        self.current_root
    }

    pub fn work_in_progress(&self) -> Option<FiberId> {
        self.wip_root
    }

    pub fn next_unit_of_work(&self) -> Option<FiberId> {
        self.next_unit
    }

    /// True when no pass is in flight and no state update is waiting.
    pub fn is_idle(&self) -> bool {
        self.wip_root.is_none() && !self.runtime.update_requested()
    }

    pub fn pending_deletions(&self) -> &[FiberId] {
        &self.deletions
    }

    pub fn fiber(&self, id: FiberId) -> Option<FiberRef<'_>> {
        self.arena.get(id).ok().map(|fiber| FiberRef::new(id, fiber))
    }

    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        self.arena.children(id).unwrap_or_default()
    }

    /// Live fibers across both generations.
    pub fn fiber_count(&self) -> usize {
        self.arena.len()
    }

    /// Fibers of the committed tree, root included, in depth-first order.
    pub fn committed_fibers(&self) -> Vec<FiberId> {
        self.current_root
            .and_then(|root| self.arena.subtree(root).ok())
            .unwrap_or_default()
    }

    pub fn dump_fibers(&self) -> String {
        let mut output = String::new();
        match self.current_root {
            Some(root) => self.dump_fiber(&mut output, root, 0),
            None => output.push_str("(no root)\n"),
        }
        output
    }

    fn dump_fiber(&self, output: &mut String, id: FiberId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Ok(fiber) = self.arena.get(id) else {
            let _ = writeln!(output, "{indent}[{id}] (missing)");
            return;
        };
        let _ = write!(output, "{indent}[{id}] {}", fiber.kind.label());
        if let Some(node) = fiber.dom {
            let _ = write!(output, " node={node}");
        }
        output.push('\n');
        for child in self.children(id) {
            self.dump_fiber(output, child, depth + 1);
        }
    }
}

#[cfg(test)]
#[path = "tests/root_tests.rs"]
mod tests;
