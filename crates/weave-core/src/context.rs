//! Context cells and provider/consumer descriptors.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::element::{create_element, Child, Component, Element, ElementType, Rendered};
use crate::props::{PropValue, Props};

pub(crate) const CONTEXT_PROP: &str = "context";
pub(crate) const VALUE_PROP: &str = "value";
const RENDER_PROP: &str = "render";

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of a context definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> usize {
        self.0
    }
}

/// Untyped shared holder behind a [`Context`].
pub(crate) struct ContextCell {
    id: ContextId,
    current: RefCell<Rc<dyn Any>>,
    default: Rc<dyn Any>,
}

impl ContextCell {
    pub(crate) fn id(&self) -> ContextId {
        self.id
    }

    pub(crate) fn current(&self) -> Rc<dyn Any> {
        self.current.borrow().clone()
    }

    pub(crate) fn default_value(&self) -> Rc<dyn Any> {
        self.default.clone()
    }

    /// Stores `value` and returns what it replaced.
    pub(crate) fn replace(&self, value: Rc<dyn Any>) -> Rc<dyn Any> {
        std::mem::replace(&mut *self.current.borrow_mut(), value)
    }
}

impl fmt::Debug for ContextCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCell").field("id", &self.id).finish()
    }
}

/// A value shared with a subtree through providers.
///
/// The cell is process-wide: every provider of this context writes the same
/// current value while it renders, and restores the previous one when its
/// effect is cleaned up after a later commit.
pub struct Context<T> {
    cell: Rc<ContextCell>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.cell.id).finish()
    }
}

impl<T: Clone + 'static> Context<T> {
    pub fn new(default: T) -> Self {
        let default: Rc<dyn Any> = Rc::new(default);
        Self {
            cell: Rc::new(ContextCell {
                id: ContextId::next(),
                current: RefCell::new(default.clone()),
                default,
            }),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> ContextId {
        self.cell.id
    }

    pub fn default_value(&self) -> T {
        downcast_value(&self.cell.default)
    }

    /// The cell's current value, as last written by a provider.
    pub fn current(&self) -> T {
        let current = self.cell.current();
        current
            .downcast_ref::<T>()
            .cloned()
            .unwrap_or_else(|| self.default_value())
    }

    /// A provider descriptor making `value` visible to `children`.
    ///
    /// The value is stored behind a fresh pointer, so a re-rendered provider is
    /// always tagged [`Update`](crate::EffectTag::Update), never `Skip`, even
    /// when the value is equal. Its restore effect is queued on every commit
    /// to pair with the cell write its render just made.
    pub fn provider<I, C>(&self, value: T, children: I) -> Element
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        let mut props = Props::new();
        let cell: Rc<dyn Any> = self.cell.clone();
        props.insert(CONTEXT_PROP, PropValue::Any(cell));
        props.insert(VALUE_PROP, PropValue::any(value));
        create_element(
            ElementType::Provider(self.cell.id),
            props,
            children.into_iter().map(Into::into),
        )
    }

    /// A component rendering `render(current)` from the shared cell.
    ///
    /// Like providers, consumers carry a fresh closure and are never `Skip`.
    pub fn consumer(&self, render: impl Fn(T) -> Rendered + 'static) -> Element {
        let render: ConsumerRender<T> = Rc::new(render);
        let cell: Rc<dyn Any> = self.cell.clone();
        Element::component(Component::new("Consumer", consumer_render::<T>))
            .attr(CONTEXT_PROP, PropValue::Any(cell))
            .attr(RENDER_PROP, PropValue::any(render))
    }

    pub(crate) fn cell(&self) -> &Rc<ContextCell> {
        &self.cell
    }
}

type ConsumerRender<T> = Rc<dyn Fn(T) -> Rendered>;

fn consumer_render<T: Clone + 'static>(props: &Props) -> Rendered {
    let cell = props
        .get(CONTEXT_PROP)
        .and_then(cell_from_prop)
        .ok_or_else(|| anyhow::anyhow!("consumer rendered without its context"))?;
    let render = props
        .get_any::<ConsumerRender<T>>(RENDER_PROP)
        .ok_or_else(|| anyhow::anyhow!("consumer rendered without a render function"))?;
    let current = cell.current();
    let value = match current.downcast_ref::<T>() {
        Some(value) => value.clone(),
        None => downcast_value(&cell.default_value()),
    };
    render(value)
}

pub(crate) fn cell_from_prop(value: &PropValue) -> Option<Rc<ContextCell>> {
    match value {
        PropValue::Any(any) => any.clone().downcast::<ContextCell>().ok(),
        _ => None,
    }
}

/// Context values only ever enter a cell through the typed API, so a failed
/// downcast means two contexts were confused; treat it as a hook misuse.
pub(crate) fn downcast_value<T: Clone + 'static>(value: &Rc<dyn Any>) -> T {
    match value.downcast_ref::<T>() {
        Some(value) => value.clone(),
        None => panic!(
            "context value is not a `{}`",
            std::any::type_name::<T>()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_get_distinct_ids() {
        let a = Context::new(1);
        let b = Context::new(1);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn replace_returns_previous_value() {
        let theme = Context::new("light");
        let previous = theme.cell().replace(Rc::new("dark"));
        assert_eq!(theme.current(), "dark");
        assert_eq!(previous.downcast_ref::<&str>(), Some(&"light"));
        theme.cell().replace(previous);
        assert_eq!(theme.current(), "light");
    }

    #[test]
    fn provider_descriptor_carries_cell_and_value() {
        let theme = Context::new(0i64);
        let element = theme.provider(5i64, [Element::host("span")]);
        assert_eq!(element.ty(), &ElementType::Provider(theme.id()));
        assert_eq!(element.props().get_any::<i64>(VALUE_PROP), Some(&5));
        let cell = element.props().get(CONTEXT_PROP).and_then(cell_from_prop);
        assert_eq!(cell.map(|cell| cell.id()), Some(theme.id()));
        assert_eq!(element.props().children().len(), 1);
    }
}
