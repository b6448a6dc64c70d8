//! Positional child reconciliation.

use std::rc::Rc;

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};

/// Rebuilds the child chain of `parent` from `elements`, diffing position by
/// position against the child chain of its alternate.
///
/// A position keeps its fiber (and with it the host node and hook slots) when
/// type and key both match; otherwise the old fiber is queued for deletion and
/// a fresh one is placed. Moving a keyed item to another index therefore
/// recreates it. Placed nodes are appended after their host siblings at
/// commit, so a replacement in front of kept siblings ends up last in the
/// host until those siblings are recreated too.
pub(crate) fn reconcile_children(
    arena: &mut FiberArena,
    deletions: &mut Vec<FiberId>,
    parent: FiberId,
    elements: &[Element],
) {
    let mut old = arena
        .get(parent)
        .and_then(|fiber| fiber.alternate)
        .and_then(|alternate| arena.get(alternate))
        .and_then(|alternate| alternate.child);
    let mut previous: Option<FiberId> = None;
    if let Some(fiber) = arena.get_mut(parent) {
        fiber.child = None;
    }

    let mut index = 0;
    while index < elements.len() || old.is_some() {
        let element = elements.get(index);
        let old_fiber = old.and_then(|id| arena.get(id).map(|fiber| (id, fiber)));

        let reused = match (element, old_fiber) {
            (Some(element), Some((old_id, old_fiber)))
                if old_fiber.ty.as_ref() == Some(element.ty())
                    && old_fiber.key() == element.props().key() =>
            {
                let changed = !Rc::ptr_eq(&old_fiber.props, element.props())
                    && element.props().shallow_differs(&old_fiber.props);
                Some(Fiber {
                    ty: Some(element.ty().clone()),
                    props: element.props().clone(),
                    node: old_fiber.node,
                    child: None,
                    sibling: None,
                    return_fiber: Some(parent),
                    alternate: Some(old_id),
                    effect_tag: Some(if changed {
                        EffectTag::Update
                    } else {
                        EffectTag::Skip
                    }),
                    hook_cursor: 0,
                    hook_kinds: Vec::new(),
                    hooks: old_fiber.hooks.clone(),
                })
            }
            _ => None,
        };

        let fiber = match reused {
            Some(fiber) => Some(fiber),
            None => {
                if let Some(old_id) = old {
                    if let Some(old_fiber) = arena.get_mut(old_id) {
                        old_fiber.effect_tag = Some(EffectTag::Delete);
                        deletions.push(old_id);
                    }
                }
                element.map(|element| {
                    Fiber::placement(element.ty().clone(), element.props().clone(), parent)
                })
            }
        };

        if let Some(fiber) = fiber {
            let id = arena.insert(fiber);
            let link = match previous {
                None => arena.get_mut(parent).map(|fiber| &mut fiber.child),
                Some(previous) => arena.get_mut(previous).map(|fiber| &mut fiber.sibling),
            };
            if let Some(link) = link {
                *link = Some(id);
            }
            previous = Some(id);
        }

        old = old.and_then(|id| arena.get(id)).and_then(|fiber| fiber.sibling);
        index += 1;
    }
}
