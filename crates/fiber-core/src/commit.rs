//! The commit phase.
//!
//! Commit runs once per finished pass, synchronously, and is the only place
//! attached native nodes are mutated. It is not transactional: a backend
//! error leaves the mutations applied so far in place, so both generations
//! are then released and the root starts over from an empty tree.

use crate::error::{HostError, RenderError};
use crate::fiber::{EffectTag, FiberId, FiberKind};
use crate::hooks::EffectCleanup;
use crate::host::{HostBackend, NodeId};
use crate::root::RenderRoot;
use crate::work_loop::CommitReport;
use crate::adapter;

impl<B: HostBackend> RenderRoot<B> {
    pub(crate) fn commit(&mut self) -> Result<CommitReport, RenderError> {
        let Some(root) = self.wip_root else {
            return Ok(CommitReport::default());
        };
        let mut cleanups = std::mem::take(&mut self.orphaned_cleanups);
        match self.apply_commit(root, &mut cleanups) {
            Ok(report) => Ok(report),
            Err(err) => {
                self.unmount_after_failed_commit(root, cleanups);
                Err(err)
            }
        }
    }

    fn apply_commit(
        &mut self,
        root: FiberId,
        cleanups: &mut Vec<EffectCleanup>,
    ) -> Result<CommitReport, RenderError> {
        let mut report = CommitReport::default();

        for id in std::mem::take(&mut self.deletions) {
            self.commit_deletion(id, &mut report)?;
            self.collect_unmount_cleanups(id, cleanups)?;
            report.deleted += 1;
        }

        let mut cursor = self.arena.get(root)?.child;
        while let Some(id) = cursor {
            self.commit_work(id, &mut report)?;
            cursor = self.arena.next_in_walk(id, root)?;
        }

        report.effects_run = self.commit_effects(root, cleanups)?;

        let previous = self.current_root.replace(root);
        self.wip_root = None;
        self.next_unit = None;
        if let Some(previous) = previous {
            self.release_generation(previous, root)?;
        }
        log::debug!(
            "pass {} committed: {} placed, {} updated, {} deleted, {} effects, {} host calls",
            self.pass,
            report.placed,
            report.updated,
            report.deleted,
            report.effects_run,
            report.mutations
        );
        Ok(report)
    }

    /// Drops both generations after a commit failed part way through.
    ///
    /// The native tree matches neither of them any more, so every node they
    /// own is released, unmount cleanups run and the next render mounts from
    /// scratch. Removal errors are logged and skipped.
    fn unmount_after_failed_commit(&mut self, wip: FiberId, mut cleanups: Vec<EffectCleanup>) {
        self.wip_root = None;
        self.next_unit = None;
        self.deletions.clear();

        let mut fibers = Vec::new();
        for root in self.current_root.take().into_iter().chain([wip]) {
            match self.arena.subtree(root) {
                Ok(ids) => fibers.extend(ids),
                Err(err) => log::error!("tearing down tree at {root}: {err}"),
            }
        }
        let released = fibers.len();
        for id in fibers {
            let Some(mut fiber) = self.arena.free(id) else {
                continue;
            };
            if let Some(hooks) = fiber.hooks.as_mut() {
                hooks.drain_cleanups(&mut cleanups);
            }
            let Some(node) = fiber.dom.filter(|_| !matches!(fiber.kind, FiberKind::Root)) else {
                continue;
            };
            match self.backend.remove_node(node) {
                Ok(()) | Err(HostError::Missing { .. }) => {}
                Err(err) => log::warn!("could not release node {node} of fiber {id}: {err}"),
            }
        }
        for cleanup in cleanups {
            cleanup.run();
        }
        log::warn!(
            "commit of pass {} failed; released {released} fibers, next render remounts",
            self.pass
        );
    }

    fn commit_work(&mut self, id: FiberId, report: &mut CommitReport) -> Result<(), RenderError> {
        let fiber = self.arena.get(id)?;
        match (fiber.effect, fiber.dom) {
            (Some(EffectTag::Placement), Some(node)) => {
                let parent = self.host_parent(id)?;
                self.backend.insert_child(parent, node)?;
                report.mutations += 1;
            }
            (Some(EffectTag::Update), Some(node)) => {
                let next = fiber.props.clone();
                let prev = match fiber.alternate {
                    Some(alternate) => self.arena.get(alternate)?.props.clone(),
                    None => return Err(RenderError::MissingFiber { id }),
                };
                let patch =
                    adapter::patch_node(&mut self.backend, node, &prev, &next, &self.config.event_prefix)?;
                report.mutations += patch.total();
            }
            _ => {}
        }
        match fiber.effect {
            Some(EffectTag::Placement) => report.placed += 1,
            Some(EffectTag::Update) => report.updated += 1,
            _ => {}
        }
        Ok(())
    }

    /// Native node of the nearest ancestor that owns one.
    fn host_parent(&self, id: FiberId) -> Result<NodeId, RenderError> {
        let mut cursor = self.arena.get(id)?.parent;
        while let Some(parent) = cursor {
            let fiber = self.arena.get(parent)?;
            if let Some(node) = fiber.dom {
                return Ok(node);
            }
            cursor = fiber.parent;
        }
        Err(RenderError::DetachedFiber { id })
    }

    /// Removes the topmost native nodes of a deleted subtree. Fibers without
    /// a node of their own (components, fragments) pass the removal down to
    /// each of their children.
    fn commit_deletion(&mut self, id: FiberId, report: &mut CommitReport) -> Result<(), RenderError> {
        if let Some(node) = self.arena.get(id)?.dom {
            self.backend.remove_node(node)?;
            report.mutations += 1;
            return Ok(());
        }
        for child in self.arena.children(id)? {
            self.commit_deletion(child, report)?;
        }
        Ok(())
    }

    fn collect_unmount_cleanups(
        &mut self,
        id: FiberId,
        cleanups: &mut Vec<EffectCleanup>,
    ) -> Result<(), RenderError> {
        for fiber_id in self.arena.subtree(id)? {
            if let Some(hooks) = self.arena.get_mut(fiber_id)?.hooks.as_mut() {
                hooks.drain_cleanups(cleanups);
            }
        }
        Ok(())
    }

    /// Runs every pending cleanup, then every scheduled effect, walking the
    /// new tree in depth-first order.
    fn commit_effects(
        &mut self,
        root: FiberId,
        cleanups: &mut Vec<EffectCleanup>,
    ) -> Result<usize, RenderError> {
        let components: Vec<FiberId> = self
            .arena
            .subtree(root)?
            .into_iter()
            .filter(|id| {
                self.arena.get(*id).is_ok_and(|fiber| {
                    matches!(fiber.kind, FiberKind::Component(_))
                        && fiber.hooks.as_ref().is_some_and(|hooks| hooks.has_pending_effects())
                })
            })
            .collect();

        for id in &components {
            if let Some(hooks) = self.arena.get_mut(*id)?.hooks.as_mut() {
                hooks.take_stale_cleanups(cleanups);
            }
        }
        for cleanup in cleanups.drain(..) {
            cleanup.run();
        }

        let mut ran = 0;
        for id in components {
            if let Some(hooks) = self.arena.get_mut(id)?.hooks.as_mut() {
                ran += hooks.run_pending_effects();
            }
        }
        Ok(ran)
    }

    /// Frees the previous generation and cuts the new tree's links to it.
    fn release_generation(&mut self, previous: FiberId, current: FiberId) -> Result<(), RenderError> {
        let stale = self.arena.subtree(previous)?;
        let released = stale.len();
        for id in stale {
            self.arena.free(id);
        }
        for id in self.arena.subtree(current)? {
            self.arena.get_mut(id)?.alternate = None;
        }
        log::trace!("released {released} fibers of the previous generation");
        Ok(())
    }
}
