//! In-memory render target used by tests, benches and headless hosts.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::collections::ListenerMap;
use crate::element::NODE_VALUE_PROP;
use crate::error::HostError;
use crate::host::{diff_props, HostAdapter, NodeHandle, NodeKind, PropChange};
use crate::props::{Callback, PropValue, Props};

/// Attributes rendered as present/absent rather than by value.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "disabled",
    "checked",
    "selected",
    "hidden",
    "readonly",
    "required",
    "autofocus",
    "autoplay",
    "controls",
    "defer",
    "multiple",
    "open",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNodeKind {
    Container(String),
    Element(String),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMutation {
    Created { node: NodeHandle, label: String },
    Appended { parent: NodeHandle, node: NodeHandle },
    Patched { node: NodeHandle },
    Removed { parent: NodeHandle, node: NodeHandle },
}

impl HostMutation {
    /// Whether this mutation touches a node that is part of the visible tree.
    pub fn is_attached_change(&self) -> bool {
        !matches!(self, HostMutation::Created { .. })
    }
}

pub struct MemoryNode {
    kind: MemoryNodeKind,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    listeners: ListenerMap<Callback>,
    text: String,
    children: Vec<NodeHandle>,
    parent: Option<NodeHandle>,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            style: IndexMap::new(),
            listeners: Default::default(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn kind(&self) -> &MemoryNodeKind {
        &self.kind
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            MemoryNodeKind::Container(tag) | MemoryNodeKind::Element(tag) => Some(tag),
            MemoryNodeKind::Text => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    pub fn has_listener(&self, event: &str) -> bool {
        self.listeners.contains_key(event)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    fn label(&self) -> String {
        match &self.kind {
            MemoryNodeKind::Container(tag) | MemoryNodeKind::Element(tag) => tag.clone(),
            MemoryNodeKind::Text => "#text".to_string(),
        }
    }
}

/// Listener name for an `on*` property, or `None` for ordinary properties.
///
/// `onChange` on form text controls listens to `input`, matching how those
/// controls report edits.
fn listener_name(prop: &str, tag: Option<&str>) -> Option<String> {
    let suffix = prop.strip_prefix("on")?;
    if !suffix.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    let event = suffix.to_ascii_lowercase();
    if event == "change" && matches!(tag, Some("input" | "textarea")) {
        return Some("input".to_string());
    }
    Some(event)
}

fn parse_style(css: &str) -> IndexMap<String, String> {
    css.split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(property, value)| (property.trim().to_string(), value.trim().to_string()))
        .filter(|(property, _)| !property.is_empty())
        .collect()
}

#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    log: Vec<HostMutation>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A root node to render into.
    pub fn create_container(&mut self, tag: &str) -> NodeHandle {
        self.insert(MemoryNode::new(MemoryNodeKind::Container(tag.to_string())))
    }

    fn insert(&mut self, node: MemoryNode) -> NodeHandle {
        let handle = NodeHandle::new(self.nodes.len());
        self.nodes.push(Some(node));
        handle
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&MemoryNode> {
        self.nodes.get(handle.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(handle.index())
            .and_then(Option::as_mut)
            .ok_or(HostError::MissingNode(handle))
    }

    /// Number of live nodes, containers included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mutations(&self) -> &[HostMutation] {
        &self.log
    }

    pub fn take_mutations(&mut self) -> Vec<HostMutation> {
        std::mem::take(&mut self.log)
    }

    pub fn clear_mutations(&mut self) {
        self.log.clear();
    }

    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.node(handle).map_or(&[], MemoryNode::children)
    }

    pub fn attribute(&self, handle: NodeHandle, name: &str) -> Option<&str> {
        self.node(handle)?.attribute(name)
    }

    /// A clone of the listener registered for `event`, so it can be invoked
    /// without holding the host.
    pub fn listener(&self, handle: NodeHandle, event: &str) -> Option<Callback> {
        self.node(handle)?.listeners.get(event).cloned()
    }

    /// Concatenated text of all text nodes below `handle`.
    pub fn text_content(&self, handle: NodeHandle) -> String {
        let mut out = String::new();
        self.collect_text(handle, &mut out);
        out
    }

    fn collect_text(&self, handle: NodeHandle, out: &mut String) {
        let Some(node) = self.node(handle) else {
            return;
        };
        if node.kind == MemoryNodeKind::Text {
            out.push_str(&node.text);
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// Nodes below `root` (inclusive) with the given tag, in document order.
    pub fn find_by_tag(&self, root: NodeHandle, tag: &str) -> Vec<NodeHandle> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.node(handle) else {
                continue;
            };
            if node.tag() == Some(tag) {
                found.push(handle);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    pub fn dump_tree(&self, root: Option<NodeHandle>) -> String {
        let mut output = String::new();
        match root {
            Some(root) => self.dump_node(&mut output, root, 0),
            None => output.push_str("(no root)\n"),
        }
        output
    }

    fn dump_node(&self, output: &mut String, handle: NodeHandle, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.node(handle) else {
            let _ = writeln!(output, "{indent}[{}] (missing)", handle.index());
            return;
        };
        let _ = write!(output, "{indent}[{}] ", handle.index());
        match &node.kind {
            MemoryNodeKind::Text => {
                let _ = write!(output, "{:?}", node.text);
            }
            _ => {
                output.push_str(&node.label());
                for (name, value) in &node.attributes {
                    let _ = write!(output, " {name}={value:?}");
                }
                if !node.style.is_empty() {
                    let css: Vec<String> =
                        node.style.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                    let _ = write!(output, " style={:?}", css.join("; "));
                }
            }
        }
        output.push('\n');
        for child in &node.children {
            self.dump_node(output, *child, depth + 1);
        }
    }

    fn apply_props(
        &mut self,
        handle: NodeHandle,
        previous: &Props,
        next: &Props,
    ) -> Result<(), HostError> {
        let node = self.node_mut(handle)?;
        let tag = node.tag().map(str::to_string);
        for change in diff_props(previous, next) {
            match change {
                PropChange::Removed { name, .. } => {
                    if let Some(event) = listener_name(name, tag.as_deref()) {
                        node.listeners.remove(&event);
                    } else {
                        match name {
                            NODE_VALUE_PROP => node.text.clear(),
                            "className" => {
                                node.attributes.shift_remove("class");
                            }
                            "style" => node.style.clear(),
                            _ => {
                                node.attributes.shift_remove(name);
                            }
                        }
                    }
                }
                PropChange::Set {
                    name,
                    previous,
                    next,
                } => apply_prop(node, tag.as_deref(), name, previous, next),
            }
        }
        Ok(())
    }

    fn detach(&mut self, parent: NodeHandle, child: NodeHandle) {
        if let Ok(node) = self.node_mut(parent) {
            node.children.retain(|existing| *existing != child);
        }
    }

    fn free(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get_mut(handle.index()).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.free(child);
        }
    }
}

fn apply_prop(
    node: &mut MemoryNode,
    tag: Option<&str>,
    name: &str,
    previous: Option<&PropValue>,
    next: &PropValue,
) {
    if let Some(event) = listener_name(name, tag) {
        match next {
            PropValue::Callback(callback) => {
                node.listeners.insert(event, callback.clone());
            }
            _ => {
                node.listeners.remove(&event);
            }
        }
        return;
    }
    match name {
        NODE_VALUE_PROP => node.text = next.to_text().unwrap_or_default(),
        "className" => match next {
            PropValue::Null | PropValue::Bool(false) => {
                node.attributes.shift_remove("class");
            }
            other => {
                if let Some(class) = other.to_text() {
                    node.attributes.insert("class".to_string(), class);
                }
            }
        },
        "style" => match next {
            PropValue::Style(style) => {
                if let Some(PropValue::Style(old)) = previous {
                    for property in old.keys() {
                        if !style.contains_key(property) {
                            node.style.shift_remove(property);
                        }
                    }
                } else {
                    node.style.clear();
                }
                for (property, value) in style.iter() {
                    node.style.insert(property.clone(), value.clone());
                }
            }
            PropValue::Str(css) => node.style = parse_style(css),
            _ => node.style.clear(),
        },
        _ if BOOLEAN_ATTRIBUTES.contains(&name) => {
            if next.is_truthy() {
                node.attributes.insert(name.to_string(), String::new());
            } else {
                node.attributes.shift_remove(name);
            }
        }
        _ => match next {
            PropValue::Null | PropValue::Bool(false) => {
                node.attributes.shift_remove(name);
            }
            other => {
                if let Some(value) = other.to_text() {
                    node.attributes.insert(name.to_string(), value);
                }
            }
        },
    }
}

impl HostAdapter for MemoryHost {
    fn create_node(&mut self, kind: NodeKind<'_>, props: &Props) -> Result<NodeHandle, HostError> {
        let node = match kind {
            NodeKind::Element(tag) => MemoryNode::new(MemoryNodeKind::Element(tag.to_string())),
            NodeKind::Text => MemoryNode::new(MemoryNodeKind::Text),
        };
        let label = node.label();
        let handle = self.insert(node);
        self.apply_props(handle, &Props::new(), props)?;
        self.log.push(HostMutation::Created {
            node: handle,
            label,
        });
        Ok(handle)
    }

    fn patch_node(
        &mut self,
        node: NodeHandle,
        previous: &Props,
        next: &Props,
    ) -> Result<(), HostError> {
        self.apply_props(node, previous, next)?;
        self.log.push(HostMutation::Patched { node });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<(), HostError> {
        if self.node_mut(parent)?.kind == MemoryNodeKind::Text {
            return Err(HostError::NotAParent(parent));
        }
        let previous_parent = self.node_mut(child)?.parent.replace(parent);
        if let Some(previous_parent) = previous_parent {
            self.detach(previous_parent, child);
        }
        self.node_mut(parent)?.children.push(child);
        self.log.push(HostMutation::Appended {
            parent,
            node: child,
        });
        Ok(())
    }

    fn remove_node(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), HostError> {
        let parent_node = self.node_mut(parent)?;
        let Some(position) = parent_node.children.iter().position(|child| *child == node) else {
            return Err(HostError::NotAChild {
                parent,
                child: node,
            });
        };
        parent_node.children.remove(position);
        self.free(node);
        self.log.push(HostMutation::Removed { parent, node });
        Ok(())
    }
}
