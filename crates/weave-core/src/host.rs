//! Boundary between the reconciler and the render target.

use std::fmt;

use crate::error::HostError;
use crate::props::{PropValue, Props};

/// Opaque handle to a node owned by a [`HostAdapter`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of node the reconciler asks the host to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element(&'a str),
    Text,
}

/// Render-target adapter driven by the commit engine.
///
/// `create_node` is expected to apply `props` as if patched from an empty set.
/// Adapters ignore the `ref` property; the commit engine attaches refs once
/// the node is in place.
pub trait HostAdapter {
    fn create_node(&mut self, kind: NodeKind<'_>, props: &Props) -> Result<NodeHandle, HostError>;

    fn patch_node(&mut self, node: NodeHandle, previous: &Props, next: &Props)
        -> Result<(), HostError>;

    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<(), HostError>;

    fn remove_node(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), HostError>;
}

/// Name of the property carrying a [`NodeRef`](crate::NodeRef) or
/// [`RefCallback`](crate::RefCallback).
pub const REF_PROP: &str = "ref";

/// Detaches `node` from a ref property: object refs are cleared, callback refs
/// are called with `None`.
pub fn release_ref(value: &PropValue) {
    match value {
        PropValue::Ref(node_ref) => node_ref.set(None),
        PropValue::RefCallback(callback) => callback.call(None),
        _ => {}
    }
}

/// Moves a ref from `previous` to `next`, doing nothing when both are the same ref.
pub fn apply_ref(previous: Option<&PropValue>, next: Option<&PropValue>, node: NodeHandle) {
    if let (Some(previous), Some(next)) = (previous, next) {
        if previous.same(next) {
            return;
        }
    }
    if let Some(previous) = previous {
        release_ref(previous);
    }
    match next {
        Some(PropValue::Ref(node_ref)) => node_ref.set(Some(node)),
        Some(PropValue::RefCallback(callback)) => callback.call(Some(node)),
        _ => {}
    }
}

/// A single attribute-level difference between two property sets.
#[derive(Debug, Clone, Copy)]
pub enum PropChange<'a> {
    /// Present before, absent now.
    Removed { name: &'a str, previous: &'a PropValue },
    /// New or no longer [`PropValue::same`] as before.
    Set {
        name: &'a str,
        previous: Option<&'a PropValue>,
        next: &'a PropValue,
    },
}

/// Attribute differences from `previous` to `next`, removals first.
///
/// `ref` is excluded; use [`apply_ref`] for it.
pub fn diff_props<'a>(previous: &'a Props, next: &'a Props) -> Vec<PropChange<'a>> {
    let mut changes = Vec::new();
    for (name, value) in previous.iter() {
        if name != REF_PROP && !next.contains(name) {
            changes.push(PropChange::Removed {
                name,
                previous: value,
            });
        }
    }
    for (name, value) in next.iter() {
        if name == REF_PROP {
            continue;
        }
        let old = previous.get(name);
        if old.map_or(true, |old| !old.same(value)) {
            changes.push(PropChange::Set {
                name,
                previous: old,
                next: value,
            });
        }
    }
    changes
}
