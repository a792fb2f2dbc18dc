//! Positional child reconciliation.
//!
//! New children are matched against the previous generation's children by
//! index and type only. Reordering children without keys therefore shows up
//! as deletion/placement pairs rather than moves.

use crate::element::Element;
use crate::error::RenderError;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};

/// Builds `parent`'s child chain from `elements`, diffing against the
/// children of `parent`'s alternate. Old fibers with no same-typed
/// counterpart are tagged DELETION and pushed onto `deletions`.
pub(crate) fn reconcile_children(
    arena: &mut FiberArena,
    deletions: &mut Vec<FiberId>,
    parent: FiberId,
    elements: &[Element],
) -> Result<(), RenderError> {
    let mut old_fiber = match arena.get(parent)?.alternate {
        Some(alternate) => arena.get(alternate)?.child,
        None => None,
    };
    arena.get_mut(parent)?.child = None;

    let mut prev_sibling: Option<FiberId> = None;
    let mut index = 0;

    while index < elements.len() || old_fiber.is_some() {
        let element = elements.get(index);
        let old = match old_fiber {
            Some(id) => Some((id, arena.get(id)?)),
            None => None,
        };
        let same_type = match (element, &old) {
            (Some(element), Some((_, old))) => old.kind.matches(element.element_type()),
            _ => false,
        };

        let produced = match (element, &old) {
            (Some(element), Some((old_id, old))) if same_type => {
                Some(Fiber::update(old, *old_id, element, parent))
            }
            (Some(element), _) => Some(Fiber::placement(element, parent)),
            (None, _) => None,
        };
        let old_sibling = old.as_ref().and_then(|(_, old)| old.sibling);

        if let (Some(old_id), false) = (old_fiber, same_type) {
            arena.get_mut(old_id)?.effect = Some(EffectTag::Deletion);
            deletions.push(old_id);
        }
        old_fiber = old_sibling;

        if let Some(fiber) = produced {
            let id = arena.alloc(fiber);
            match prev_sibling {
                None => arena.get_mut(parent)?.child = Some(id),
                Some(prev) => arena.get_mut(prev)?.sibling = Some(id),
            }
            prev_sibling = Some(id);
        }
        index += 1;
    }

    Ok(())
}
