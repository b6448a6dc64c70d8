//! Arena-backed fiber tree.

use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::element::ElementType;
use crate::hooks::{HookKind, HookSlots};
use crate::host::NodeHandle;
use crate::props::{Key, Props};

new_key_type! {
    /// Index of a fiber in a render session's arena.
    pub struct FiberId;
}

/// Mutation intent computed by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectTag {
    Placement,
    Update,
    Delete,
    Skip,
}

pub(crate) struct Fiber {
    /// `None` for the root fiber of a tree.
    pub(crate) ty: Option<ElementType>,
    pub(crate) props: Rc<Props>,
    pub(crate) node: Option<NodeHandle>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) return_fiber: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect_tag: Option<EffectTag>,
    pub(crate) hook_cursor: usize,
    pub(crate) hook_kinds: Vec<HookKind>,
    pub(crate) hooks: HookSlots,
}

impl Fiber {
    pub(crate) fn root(
        container: NodeHandle,
        props: Rc<Props>,
        alternate: Option<FiberId>,
    ) -> Self {
        Self {
            ty: None,
            props,
            node: Some(container),
            child: None,
            sibling: None,
            return_fiber: None,
            alternate,
            effect_tag: None,
            hook_cursor: 0,
            hook_kinds: Vec::new(),
            hooks: HookSlots::default(),
        }
    }

    pub(crate) fn placement(ty: ElementType, props: Rc<Props>, parent: FiberId) -> Self {
        Self {
            ty: Some(ty),
            props,
            node: None,
            child: None,
            sibling: None,
            return_fiber: Some(parent),
            alternate: None,
            effect_tag: Some(EffectTag::Placement),
            hook_cursor: 0,
            hook_kinds: Vec::new(),
            hooks: HookSlots::default(),
        }
    }

    pub(crate) fn key(&self) -> Option<&Key> {
        self.props.key()
    }

    pub(crate) fn is_component(&self) -> bool {
        matches!(self.ty, Some(ElementType::Component(_)))
    }

    pub(crate) fn component_name(&self) -> &'static str {
        match &self.ty {
            Some(ElementType::Component(component)) => component.name(),
            Some(ElementType::Provider(_)) => "Provider",
            _ => "<host>",
        }
    }
}

pub(crate) type FiberArena = SlotMap<FiberId, Fiber>;

/// The next fiber in depth-first pre-order: the child, else the nearest
/// sibling found walking up through return links.
pub(crate) fn next_unit_of_work(arena: &FiberArena, id: FiberId) -> Option<FiberId> {
    if let Some(child) = arena.get(id).and_then(|fiber| fiber.child) {
        return Some(child);
    }
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        let fiber = arena.get(current)?;
        if fiber.sibling.is_some() {
            return fiber.sibling;
        }
        cursor = fiber.return_fiber;
    }
    None
}

/// All fibers below and including `root`, in pre-order.
pub(crate) fn subtree(arena: &FiberArena, root: FiberId) -> Vec<FiberId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(fiber) = arena.get(id) else {
            continue;
        };
        out.push(id);
        let mut children = Vec::new();
        let mut child = fiber.child;
        while let Some(child_id) = child {
            children.push(child_id);
            child = arena.get(child_id).and_then(|c| c.sibling);
        }
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Removes `root` and its descendants from the arena.
pub(crate) fn free_subtree(arena: &mut FiberArena, root: FiberId) -> usize {
    let ids = subtree(arena, root);
    for id in &ids {
        arena.remove(*id);
    }
    ids.len()
}

/// Read-only view of a committed fiber.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberSnapshot {
    pub id: FiberId,
    pub depth: usize,
    pub label: String,
    pub key: Option<Key>,
    pub tag: Option<EffectTag>,
    pub node: Option<NodeHandle>,
    pub state_slots: usize,
    pub effect_slots: usize,
    pub ref_slots: usize,
    pub callback_slots: usize,
    pub context_slots: usize,
}

pub(crate) fn snapshot_tree(arena: &FiberArena, root: FiberId) -> Vec<FiberSnapshot> {
    let mut out = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let Some(fiber) = arena.get(id) else {
            continue;
        };
        out.push(FiberSnapshot {
            id,
            depth,
            label: fiber
                .ty
                .as_ref()
                .map_or_else(|| "#root".to_string(), ToString::to_string),
            key: fiber.key().cloned(),
            tag: fiber.effect_tag,
            node: fiber.node,
            state_slots: fiber.hooks.states.len(),
            effect_slots: fiber.hooks.effects.len(),
            ref_slots: fiber.hooks.refs.len(),
            callback_slots: fiber.hooks.callbacks.len(),
            context_slots: fiber.hooks.contexts.len(),
        });
        let mut children = Vec::new();
        let mut child = fiber.child;
        while let Some(child_id) = child {
            children.push(child_id);
            child = arena.get(child_id).and_then(|c| c.sibling);
        }
        stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
    }
    out
}
