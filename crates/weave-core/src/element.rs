//! Element descriptors and their construction helpers.

use std::fmt;
use std::rc::Rc;

use crate::context::ContextId;
use crate::host::REF_PROP;
use crate::props::{Callback, Event, Key, NodeRef, PropValue, Props, StyleMap};

/// Result of invoking a component's render function.
pub type Rendered = anyhow::Result<Option<Element>>;

/// Name of the property holding a text descriptor's content.
pub const NODE_VALUE_PROP: &str = "node_value";

/// A render function with a stable identity.
///
/// Two components are the same type exactly when they share a render function.
#[derive(Clone, Copy)]
pub struct Component {
    name: &'static str,
    render: fn(&Props) -> Rendered,
}

impl Component {
    pub const fn new(name: &'static str, render: fn(&Props) -> Rendered) -> Self {
        Self { name, render }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, props: &Props) -> Rendered {
        (self.render)(props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.render as usize == other.render as usize
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    /// A host node such as `div`.
    Host(Rc<str>),
    Component(Component),
    /// A text node; content lives in [`NODE_VALUE_PROP`].
    Text,
    /// A context provider marker.
    Provider(ContextId),
    /// Groups children without producing a host node.
    Fragment,
}

impl ElementType {
    pub fn host(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }

    /// Whether fibers of this type own a host node.
    pub fn is_host(&self) -> bool {
        matches!(self, ElementType::Host(_) | ElementType::Text)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => f.write_str(tag),
            ElementType::Component(component) => f.write_str(component.name()),
            ElementType::Text => f.write_str("#text"),
            ElementType::Provider(id) => write!(f, "Provider({})", id.raw()),
            ElementType::Fragment => f.write_str("Fragment"),
        }
    }
}

/// An immutable descriptor. Cloning shares the props.
#[derive(Clone)]
pub struct Element {
    ty: ElementType,
    props: Rc<Props>,
}

impl Element {
    pub fn new(ty: ElementType, props: Props) -> Self {
        Self {
            ty,
            props: Rc::new(props),
        }
    }

    /// A host element such as `div` with no props.
    pub fn host(tag: &str) -> Self {
        Self::new(ElementType::host(tag), Props::new())
    }

    pub fn component(component: Component) -> Self {
        Self::new(ElementType::Component(component), Props::new())
    }

    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Rc<Props> {
        &self.props
    }

    pub(crate) fn into_parts(self) -> (ElementType, Rc<Props>) {
        (self.ty, self.props)
    }

    fn props_mut(&mut self) -> &mut Props {
        Rc::make_mut(&mut self.props)
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.props_mut().insert(name, value);
        self
    }

    #[must_use]
    pub fn class_name(self, class: impl Into<PropValue>) -> Self {
        self.attr("className", class)
    }

    /// Accepts a [`StyleMap`] or a `"a: b; c: d"` string.
    #[must_use]
    pub fn style(self, style: impl Into<PropValue>) -> Self {
        self.attr("style", style)
    }

    /// Registers a listener; `on("click", ..)` stores the `onClick` property.
    #[must_use]
    pub fn on(self, event: &str, listener: impl Fn(&Event) + 'static) -> Self {
        let mut name = String::with_capacity(event.len() + 2);
        name.push_str("on");
        let mut chars = event.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
        self.attr(&name, Callback::new(listener))
    }

    #[must_use]
    pub fn node_ref(self, node_ref: NodeRef) -> Self {
        self.attr(REF_PROP, node_ref)
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.props_mut().set_key(Some(key.into()));
        self
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        let mut flat = Vec::new();
        flatten_child(child.into(), &mut flat);
        let props = self.props_mut();
        for element in flat {
            props.push_child(element);
        }
        self
    }

    #[must_use]
    pub fn children<I, C>(self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        children.into_iter().fold(self, Element::child)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("ty", &self.ty)
            .field("props", &self.props)
            .finish()
    }
}

/// A child slot before normalization.
#[derive(Clone)]
pub enum Child {
    Element(Element),
    Text(PropValue),
    Empty,
    List(Vec<Child>),
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value.into())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Text(value.into())
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Text(value.into())
    }
}

impl From<usize> for Child {
    fn from(value: usize) -> Self {
        Child::Text(value.into())
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Text(value.into())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(values: Vec<T>) -> Self {
        Child::List(values.into_iter().map(Into::into).collect())
    }
}

fn flatten_child(child: Child, out: &mut Vec<Element>) {
    match child {
        Child::Element(element) => out.push(element),
        Child::Text(value) => out.push(text(value)),
        Child::Empty => {}
        Child::List(children) => {
            for child in children {
                flatten_child(child, out);
            }
        }
    }
}

/// Normalizes a type, props and a child sequence into a descriptor.
///
/// Nested lists are flattened, `Empty` children dropped and primitive
/// children wrapped in text descriptors. Children already present in
/// `props` are replaced.
pub fn create_element<I>(ty: ElementType, mut props: Props, children: I) -> Element
where
    I: IntoIterator<Item = Child>,
{
    let mut flat = Vec::new();
    for child in children {
        flatten_child(child, &mut flat);
    }
    props.set_children(flat);
    Element::new(ty, props)
}

/// A text descriptor.
pub fn text(value: impl Into<PropValue>) -> Element {
    let mut props = Props::new();
    props.insert(NODE_VALUE_PROP, value);
    Element::new(ElementType::Text, props)
}

/// A fragment grouping `children` without a host node of its own.
pub fn fragment<I, C>(children: I) -> Element
where
    I: IntoIterator<Item = C>,
    C: Into<Child>,
{
    Element::new(ElementType::Fragment, Props::new()).children(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(_: &Props) -> Rendered {
        Ok(None)
    }

    fn other(_: &Props) -> Rendered {
        Ok(Some(text("other")))
    }

    #[test]
    fn create_element_normalizes_children() {
        let mut props = Props::new();
        props.insert("key", 7);
        props.insert("id", "list");
        let element = create_element(
            ElementType::host("ul"),
            props,
            vec![
                Child::from("a"),
                Child::Empty,
                Child::from(vec![Child::from(1), Child::from(Element::host("li"))]),
                Child::from(None::<Element>),
            ],
        );

        let children = element.props().children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].ty(), &ElementType::Text);
        assert_eq!(children[0].props().get_str(NODE_VALUE_PROP), Some("a"));
        assert_eq!(children[1].props().get_int(NODE_VALUE_PROP), Some(1));
        assert_eq!(children[2].ty(), &ElementType::host("li"));
        assert_eq!(element.props().key(), Some(&Key::Int(7)));
        assert!(!element.props().contains("key"));
    }

    #[test]
    fn component_identity_is_the_render_function() {
        let a = Component::new("A", empty);
        let renamed = Component::new("Renamed", empty);
        let b = Component::new("A", other);
        assert_eq!(a, renamed);
        assert_ne!(a, b);
    }

    #[test]
    fn listener_builder_uses_on_prefix() {
        let element = Element::host("button").on("click", |_| {});
        assert!(element.props().get("onClick").and_then(PropValue::as_callback).is_some());
    }

    #[test]
    fn builders_share_until_modified() {
        let base = Element::host("div").attr("id", "x");
        let copy = base.clone();
        let changed = copy.attr("id", "y");
        assert_eq!(base.props().get_str("id"), Some("x"));
        assert_eq!(changed.props().get_str("id"), Some("y"));
    }
}
