//! Property values carried by descriptors and fibers.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::element::Element;
use crate::host::NodeHandle;

/// Ordered style declarations (`property -> value`).
pub type StyleMap = IndexMap<String, String>;

/// Dependency list compared entry by entry with [`PropValue::same`].
pub type Deps = Vec<PropValue>;

/// Builds a [`Deps`] list from values convertible into [`PropValue`].
#[macro_export]
macro_rules! deps {
    () => {
        ::std::vec::Vec::<$crate::PropValue>::new()
    };
    ($($dep:expr),+ $(,)?) => {
        ::std::vec![$($crate::PropValue::from($dep)),+]
    };
}

/// Payload handed to event listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub target: NodeHandle,
    pub value: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeHandle) -> Self {
        Self {
            name: name.into(),
            target,
            value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Shared event listener. Compared by identity.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl Callback {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// Object-style node reference: the host writes the node handle into it.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<Cell<Option<NodeHandle>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<NodeHandle> {
        self.0.get()
    }

    pub fn set(&self, node: Option<NodeHandle>) {
        self.0.set(node);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.get()).finish()
    }
}

/// Callback-style node reference: called with the node on attach, `None` on release.
#[derive(Clone)]
pub struct RefCallback(Rc<dyn Fn(Option<NodeHandle>)>);

impl RefCallback {
    pub fn new(f: impl Fn(Option<NodeHandle>) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, node: Option<NodeHandle>) {
        (self.0)(node);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A single property value.
#[derive(Clone, Default)]
pub enum PropValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Style(Rc<StyleMap>),
    Callback(Callback),
    Ref(NodeRef),
    RefCallback(RefCallback),
    Any(Rc<dyn Any>),
}

impl PropValue {
    /// Wraps an arbitrary value; compared by identity of the allocation.
    pub fn any<T: Any>(value: T) -> Self {
        PropValue::Any(Rc::new(value))
    }

    /// Strict identity comparison.
    ///
    /// Primitives compare by value (`NaN` equals itself, `0.0` and `-0.0`
    /// differ), strings by contents, everything else by pointer.
    pub fn same(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Style(a), PropValue::Style(b)) => Rc::ptr_eq(a, b),
            (PropValue::Callback(a), PropValue::Callback(b)) => a.ptr_eq(b),
            (PropValue::Ref(a), PropValue::Ref(b)) => a.ptr_eq(b),
            (PropValue::RefCallback(a), PropValue::RefCallback(b)) => a.ptr_eq(b),
            (PropValue::Any(a), PropValue::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            PropValue::Null => false,
            PropValue::Bool(value) => *value,
            PropValue::Int(value) => *value != 0,
            PropValue::Float(value) => *value != 0.0 && !value.is_nan(),
            PropValue::Str(value) => !value.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            PropValue::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            PropValue::Any(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The textual form used for attributes and text content.
    ///
    /// Integral floats print without a fractional part.
    pub fn to_text(&self) -> Option<String> {
        match self {
            PropValue::Str(value) => Some(value.to_string()),
            PropValue::Int(value) => Some(value.to_string()),
            PropValue::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(format!("{value:.0}"))
            }
            PropValue::Float(value) => Some(value.to_string()),
            PropValue::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(value) => write!(f, "Bool({value})"),
            PropValue::Int(value) => write!(f, "Int({value})"),
            PropValue::Float(value) => write!(f, "Float({value})"),
            PropValue::Str(value) => write!(f, "Str({value:?})"),
            PropValue::Style(style) => f.debug_tuple("Style").field(style).finish(),
            PropValue::Callback(callback) => callback.fmt(f),
            PropValue::Ref(node_ref) => node_ref.fmt(f),
            PropValue::RefCallback(_) => f.write_str("RefCallback"),
            PropValue::Any(value) => write!(f, "Any({:p})", Rc::as_ptr(value).cast::<()>()),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<StyleMap> for PropValue {
    fn from(value: StyleMap) -> Self {
        PropValue::Style(Rc::new(value))
    }
}

impl From<Callback> for PropValue {
    fn from(value: Callback) -> Self {
        PropValue::Callback(value)
    }
}

impl From<NodeRef> for PropValue {
    fn from(value: NodeRef) -> Self {
        PropValue::Ref(value)
    }
}

impl From<RefCallback> for PropValue {
    fn from(value: RefCallback) -> Self {
        PropValue::RefCallback(value)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

/// Reconciliation key. Two absent keys are considered equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl Key {
    pub(crate) fn from_prop(value: &PropValue) -> Option<Key> {
        match value {
            PropValue::Str(value) => Some(Key::Str(value.clone())),
            PropValue::Int(value) => Some(Key::Int(*value)),
            PropValue::Null => None,
            other => other.to_text().map(|text| Key::Str(Rc::from(text))),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(value) => f.write_str(value),
            Key::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Properties of a descriptor: ordered attributes, optional key and children.
///
/// `key` and `children` are reserved and never stored in the attribute map.
#[derive(Clone, Default)]
pub struct Props {
    attrs: IndexMap<Rc<str>, PropValue>,
    key: Option<Key>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropValue::as_int)
    }

    pub fn get_any<T: Any>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(PropValue::downcast_ref::<T>)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(name, value)| (&**name, value))
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Sets an attribute; `key` is routed to the key slot and `children` is ignored.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<PropValue>) {
        let name = name.as_ref();
        let value = value.into();
        match name {
            "key" => self.key = Key::from_prop(&value),
            "children" => {}
            _ => {
                self.attrs.insert(Rc::from(name), value);
            }
        }
    }

    pub fn set_key(&mut self, key: Option<Key>) {
        self.key = key;
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub(crate) fn set_children(&mut self, children: Vec<Element>) {
        self.children = children;
    }

    /// Shallow comparison of the attribute maps: same number of entries and
    /// every entry [`PropValue::same`]. Children are not compared; they are
    /// diffed individually one level down.
    pub fn shallow_differs(&self, other: &Props) -> bool {
        if self.attrs.len() != other.attrs.len() {
            return true;
        }
        self.attrs.iter().any(|(name, value)| match other.attrs.get(name) {
            Some(other_value) => !value.same(other_value),
            None => true,
        })
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("key", &self.key)
            .field("attrs", &self.attrs)
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_follows_identity_rules() {
        assert!(PropValue::Float(f64::NAN).same(&PropValue::Float(f64::NAN)));
        assert!(!PropValue::Float(0.0).same(&PropValue::Float(-0.0)));
        assert!(PropValue::from("a").same(&PropValue::from(String::from("a"))));
        assert!(!PropValue::Int(1).same(&PropValue::Float(1.0)));

        let callback = Callback::new(|_| {});
        assert!(PropValue::from(callback.clone()).same(&PropValue::from(callback)));
        let first = PropValue::from(Callback::new(|_| {}));
        assert!(!first.same(&PropValue::from(Callback::new(|_| {}))));

        let mut style = StyleMap::new();
        style.insert("color".into(), "red".into());
        assert!(!PropValue::from(style.clone()).same(&PropValue::from(style)));
    }

    #[test]
    fn reserved_names_do_not_enter_the_attribute_map() {
        let mut props = Props::new();
        props.insert("key", "row-1");
        props.insert("children", "ignored");
        props.insert("id", "main");
        assert_eq!(props.len(), 1);
        assert_eq!(props.key(), Some(&Key::from("row-1")));
        assert_eq!(props.get_str("id"), Some("main"));
    }

    #[test]
    fn shallow_comparison_is_one_level_deep() {
        let mut a = Props::new();
        a.insert("id", "x");
        a.insert("count", 1);
        let mut b = Props::new();
        b.insert("id", "x");
        b.insert("count", 1);
        assert!(!a.shallow_differs(&b));

        b.insert("count", 2);
        assert!(a.shallow_differs(&b));

        let mut c = Props::new();
        c.insert("id", "x");
        assert!(a.shallow_differs(&c), "entry count differs");
    }

    #[test]
    fn text_form_drops_integral_fraction() {
        assert_eq!(PropValue::Float(3.0).to_text().as_deref(), Some("3"));
        assert_eq!(PropValue::Float(2.5).to_text().as_deref(), Some("2.5"));
        assert_eq!(PropValue::Null.to_text(), None);
    }

    #[test]
    fn deps_macro_converts_entries() {
        let deps: Deps = crate::deps![1, "two", true];
        assert_eq!(deps.len(), 3);
        assert!(deps[1].same(&PropValue::from("two")));
        assert!(crate::deps![].is_empty());
    }
}
