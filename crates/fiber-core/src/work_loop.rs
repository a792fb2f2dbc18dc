//! Scheduler turns.
//!
//! A turn processes one fiber at a time in depth-first order and yields once
//! the host's deadline drops below the configured threshold. The whole
//! traversal state is the root's next unit of work, so yielding needs no
//! saved stack: the returned [`Continuation`] names the fiber the next turn
//! starts from. When the traversal runs out of work the finished tree is
//! committed within the same turn.

use crate::element::Component;
use crate::error::RenderError;
use crate::fiber::{FiberId, FiberKind};
use crate::hooks::{HookSlots, Hooks};
use crate::host::{HostBackend, NodeKind};
use crate::platform::Deadline;
use crate::reconcile::reconcile_children;
use crate::root::RenderRoot;
use crate::{adapter, Element};

/// Resume token for a pass that yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Continuation {
    pass: u64,
    next: FiberId,
}

impl Continuation {
    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn next_fiber(&self) -> FiberId {
        self.next
    }
}

/// Fiber counts by effect tag for one commit, plus effects run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitReport {
    pub placed: usize,
    pub updated: usize,
    pub deleted: usize,
    pub effects_run: usize,
    /// Backend calls issued by the commit: inserts, removals and prop patches.
    pub mutations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Nothing to do.
    Idle,
    /// The deadline ran out with work remaining.
    Yielded(Continuation),
    /// A pass finished and its tree was committed.
    Committed(CommitReport),
}

impl<B: HostBackend> RenderRoot<B> {
    /// Runs one scheduler turn.
    ///
    /// At least one unit of work is processed per turn; further units run
    /// while `deadline` reports at least the configured yield threshold.
    /// If the root is idle but a state update was requested, a pass over
    /// the committed tree starts first.
    pub fn perform_work(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, RenderError> {
        if self.wip_root.is_none() && self.runtime.take_update_request() && !self.begin_update_pass()? {
            log::trace!("update requested before first render; ignored");
        }
        let Some(mut unit) = self.next_unit else {
            return match self.wip_root {
                Some(_) => self.finish_pass(),
                None => Ok(WorkStatus::Idle),
            };
        };

        let mut processed = 0usize;
        loop {
            let next = match self.perform_unit_of_work(unit) {
                Ok(next) => next,
                Err(err) => {
                    log::error!("unit of work {unit} failed: {err}");
                    self.abandon_pass();
                    return Err(err);
                }
            };
            processed += 1;
            self.next_unit = next;
            match next {
                Some(next) if deadline.time_remaining() >= self.config.yield_threshold => unit = next,
                _ => break,
            }
        }

        if let Some(next) = self.next_unit {
            log::trace!("pass {} yielded after {processed} units; next {next}", self.pass);
            self.runtime.request_idle_callback();
            return Ok(WorkStatus::Yielded(Continuation {
                pass: self.pass,
                next,
            }));
        }
        log::trace!("pass {} traversal done after {processed} units", self.pass);
        self.finish_pass()
    }

    /// Continues a yielded pass. Fails with
    /// [`RenderError::StaleContinuation`] if `continuation` does not name
    /// the pending unit of work of the current pass.
    pub fn resume(
        &mut self,
        continuation: Continuation,
        deadline: &dyn Deadline,
    ) -> Result<WorkStatus, RenderError> {
        if continuation.pass != self.pass || self.next_unit != Some(continuation.next) {
            return Err(RenderError::StaleContinuation);
        }
        self.perform_work(deadline)
    }

    /// Runs turns with an unbounded deadline until nothing is left to do,
    /// returning the report of every commit made.
    ///
    /// Effects that keep requesting updates keep this looping.
    pub fn flush(&mut self) -> Result<Vec<CommitReport>, RenderError> {
        let mut reports = Vec::new();
        loop {
            match self.perform_work(&crate::platform::Unbounded)? {
                WorkStatus::Idle => return Ok(reports),
                WorkStatus::Committed(report) => reports.push(report),
                WorkStatus::Yielded(_) => {}
            }
        }
    }

    fn finish_pass(&mut self) -> Result<WorkStatus, RenderError> {
        match self.commit() {
            Ok(report) => Ok(WorkStatus::Committed(report)),
            Err(err) => {
                log::error!("commit of pass {} failed: {err}", self.pass);
                Err(err)
            }
        }
    }

    /// Processes `id` and returns the next fiber in depth-first order.
    fn perform_unit_of_work(&mut self, id: FiberId) -> Result<Option<FiberId>, RenderError> {
        let kind = self.arena.get(id)?.kind.clone();
        log::trace!("unit of work {id} ({})", kind.label());
        match kind {
            FiberKind::Component(component) => self.update_component(id, component)?,
            FiberKind::Host(_) | FiberKind::Text => self.update_host(id)?,
            FiberKind::Root | FiberKind::Fragment => {
                let props = self.arena.get(id)?.props.clone();
                reconcile_children(&mut self.arena, &mut self.deletions, id, props.children())?;
            }
        }
        let stop = self.wip_root.unwrap_or(id);
        self.arena.next_in_walk(id, stop)
    }

    fn update_component(&mut self, id: FiberId, component: Component) -> Result<(), RenderError> {
        let (props, alternate) = {
            let fiber = self.arena.get(id)?;
            (fiber.props.clone(), fiber.alternate)
        };
        let slots = match alternate {
            Some(old) => self.arena.get_mut(old)?.hooks.take().unwrap_or_default(),
            None => HookSlots::default(),
        };
        let mut hooks = Hooks::new(slots, self.runtime.handle(), component.name());
        let rendered = component.render(&mut hooks, &props);
        let (slots, orphaned) = hooks.finish();
        self.arena.get_mut(id)?.hooks = Some(slots);
        self.orphaned_cleanups.extend(orphaned);

        let child: Element = rendered?;
        reconcile_children(
            &mut self.arena,
            &mut self.deletions,
            id,
            std::slice::from_ref(&child),
        )
    }

    fn update_host(&mut self, id: FiberId) -> Result<(), RenderError> {
        let fiber = self.arena.get(id)?;
        let props = fiber.props.clone();
        if fiber.dom.is_none() {
            let kind = match &fiber.kind {
                FiberKind::Host(tag) => NodeKind::Element(tag),
                _ => NodeKind::Text,
            };
            let node = adapter::create_node(&mut self.backend, kind, &props, &self.config.event_prefix)?;
            self.arena.get_mut(id)?.dom = Some(node);
        }
        reconcile_children(&mut self.arena, &mut self.deletions, id, props.children())
    }
}
