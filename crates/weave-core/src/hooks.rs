//! Positional hook slots and the primitives components call while rendering.
//!
//! Every primitive consumes the next position of the rendering fiber's hook
//! cursor. Slots of one kind are indexed by how many hooks of that kind were
//! called before it in the same render, so components must call their hooks
//! unconditionally and in the same order on every render.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::context::{downcast_value, Context, ContextId};
use crate::fiber::FiberId;
use crate::props::Deps;

/// Cleanup returned by an effect; runs before the effect's next run.
pub type Cleanup = Box<dyn FnOnce()>;

pub(crate) type EffectFn = Box<dyn FnOnce() -> Option<Cleanup>>;

/// Wraps a closure as the cleanup of an effect.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) -> Option<Cleanup> {
    Some(Box::new(cleanup))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    State,
    Effect,
    Ref,
    Callback,
    Context,
}

impl HookKind {
    const COUNT: usize = 5;

    fn slot(self) -> usize {
        match self {
            HookKind::State => 0,
            HookKind::Effect => 1,
            HookKind::Ref => 2,
            HookKind::Callback => 3,
            HookKind::Context => 4,
        }
    }
}

/// Receives re-render requests from state setters.
pub(crate) trait UpdateSink {
    fn schedule_update(&self);
}

pub(crate) struct EffectHook {
    pub(crate) effect: RefCell<Option<EffectFn>>,
    /// Shared with the same hook of the alternate so an abandoned render
    /// never loses a pending cleanup.
    pub(crate) cleanup: Rc<RefCell<Option<Cleanup>>>,
    pub(crate) deps: Option<Deps>,
    pub(crate) is_dirty: bool,
}

impl EffectHook {
    /// A hook whose effect always runs on the next commit.
    pub(crate) fn always(
        effect: EffectFn,
        deps: Deps,
        cleanup: Rc<RefCell<Option<Cleanup>>>,
    ) -> Self {
        Self {
            effect: RefCell::new(Some(effect)),
            cleanup,
            deps: Some(deps),
            is_dirty: true,
        }
    }

    pub(crate) fn take_cleanup(&self) -> Option<Cleanup> {
        self.cleanup.borrow_mut().take()
    }
}

pub(crate) struct CallbackHook {
    callback: Rc<dyn Any>,
    deps: Deps,
}

pub(crate) struct ContextHook {
    pub(crate) context: ContextId,
    pub(crate) value: Rc<dyn Any>,
}

pub(crate) type StateSlot = Rc<RefCell<Box<dyn Any>>>;

/// The five slot sequences of a fiber.
///
/// Cloning shares every slot; a reused fiber starts from a clone of its
/// alternate's slots.
#[derive(Clone, Default)]
pub(crate) struct HookSlots {
    pub(crate) states: Vec<StateSlot>,
    pub(crate) effects: Vec<Rc<EffectHook>>,
    pub(crate) refs: Vec<Rc<dyn Any>>,
    pub(crate) callbacks: Vec<Rc<CallbackHook>>,
    pub(crate) contexts: Vec<Rc<ContextHook>>,
}

fn put<T>(slots: &mut Vec<T>, index: usize, value: T) {
    if index < slots.len() {
        slots[index] = value;
    } else {
        slots.push(value);
    }
}

/// Dependency comparison shared by effects and callbacks.
pub(crate) fn deps_changed(previous: Option<&Deps>, next: &Deps) -> bool {
    match previous {
        None => true,
        Some(previous) => {
            previous.len() != next.len()
                || previous.iter().zip(next).any(|(old, new)| !old.same(new))
        }
    }
}

/// Per-render state of the component currently being invoked.
pub(crate) struct HookFrame {
    pub(crate) fiber: FiberId,
    pub(crate) component: &'static str,
    pub(crate) has_alternate: bool,
    pub(crate) slots: HookSlots,
    pub(crate) cursor: usize,
    pub(crate) kinds: Vec<HookKind>,
    counts: [usize; HookKind::COUNT],
    /// Provider values on the return path, nearest first.
    providers: Vec<(ContextId, Rc<dyn Any>)>,
    updater: Weak<dyn UpdateSink>,
}

impl HookFrame {
    pub(crate) fn new(
        fiber: FiberId,
        component: &'static str,
        has_alternate: bool,
        slots: HookSlots,
        providers: Vec<(ContextId, Rc<dyn Any>)>,
        updater: Weak<dyn UpdateSink>,
    ) -> Self {
        Self {
            fiber,
            component,
            has_alternate,
            slots,
            cursor: 0,
            kinds: Vec::new(),
            counts: [0; HookKind::COUNT],
            providers,
            updater,
        }
    }

    fn claim(&mut self, kind: HookKind) -> usize {
        let index = self.counts[kind.slot()];
        self.counts[kind.slot()] += 1;
        self.cursor += 1;
        self.kinds.push(kind);
        index
    }

    fn mismatch(&self, hook: &str, index: usize) -> ! {
        panic!(
            "`{}` reads {hook} slot {index} with a different type than it was created with; \
             hooks must be called in the same order on every render",
            self.component
        )
    }
}

thread_local! {
    static CURRENT_FRAME: RefCell<Option<HookFrame>> = const { RefCell::new(None) };
}

/// Keeps a [`HookFrame`] installed for the duration of a component call.
pub(crate) struct FrameGuard {
    previous: Option<HookFrame>,
    active: bool,
}

pub(crate) fn enter_frame(frame: HookFrame) -> FrameGuard {
    let previous = CURRENT_FRAME.with(|current| current.borrow_mut().replace(frame));
    FrameGuard {
        previous,
        active: true,
    }
}

impl FrameGuard {
    /// Uninstalls the frame and hands it back.
    pub(crate) fn finish(mut self) -> Option<HookFrame> {
        self.active = false;
        let previous = self.previous.take();
        CURRENT_FRAME.with(|current| std::mem::replace(&mut *current.borrow_mut(), previous))
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.active {
            let previous = self.previous.take();
            let abandoned = CURRENT_FRAME
                .with(|current| std::mem::replace(&mut *current.borrow_mut(), previous));
            drop(abandoned);
        }
    }
}

fn with_frame<R>(hook: &'static str, f: impl FnOnce(&mut HookFrame) -> R) -> R {
    CURRENT_FRAME.with(|current| {
        let mut current = current.borrow_mut();
        match current.as_mut() {
            Some(frame) => f(frame),
            None => panic!("{hook} must be called while a component is rendering"),
        }
    })
}

/// Writes a state slot and requests a re-render when the value changes.
pub struct StateSetter<T> {
    slot: StateSlot,
    updater: Weak<dyn UpdateSink>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            updater: self.updater.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateSetter({:p})", Rc::as_ptr(&self.slot))
    }
}

impl<T: Clone + PartialEq + 'static> StateSetter<T> {
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Computes the next value from the previous one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let Some(previous) = self.current() else {
            log::error!(
                "state setter for `{}` points at a slot of another type",
                std::any::type_name::<T>()
            );
            return;
        };
        let next = f(&previous);
        if next == previous {
            return;
        }
        *self.slot.borrow_mut() = Box::new(next);
        if let Some(sink) = self.updater.upgrade() {
            sink.schedule_update();
        }
    }

    /// The value currently stored in the slot.
    pub fn current(&self) -> Option<T> {
        self.slot.borrow().downcast_ref::<T>().cloned()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

/// Returns the slot's value and a setter bound to it.
///
/// On a fiber with an alternate the stored value wins over `initial`.
pub fn use_state<T: Clone + PartialEq + 'static>(initial: T) -> (T, StateSetter<T>) {
    with_frame("use_state", |frame| {
        let index = frame.claim(HookKind::State);
        let existing = if frame.has_alternate {
            frame.slots.states.get(index).cloned()
        } else {
            None
        };
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot: StateSlot = Rc::new(RefCell::new(Box::new(initial)));
                put(&mut frame.slots.states, index, slot.clone());
                slot
            }
        };
        let value = slot.borrow().downcast_ref::<T>().cloned();
        let Some(value) = value else {
            frame.mismatch("state", index)
        };
        let setter = StateSetter {
            slot,
            updater: frame.updater.clone(),
            _marker: PhantomData,
        };
        (value, setter)
    })
}

/// Registers an effect to run after the next commit.
///
/// With `deps == None` the effect runs after every commit of this component;
/// otherwise only when an entry differs from the previous render's.
pub fn use_effect<F>(effect: F, deps: Option<Deps>)
where
    F: FnOnce() -> Option<Cleanup> + 'static,
{
    with_frame("use_effect", |frame| {
        let index = frame.claim(HookKind::Effect);
        let previous = if frame.has_alternate {
            frame.slots.effects.get(index).cloned()
        } else {
            None
        };
        let (is_dirty, cleanup) = match &previous {
            None => (true, Rc::default()),
            Some(previous) => {
                let dirty = match &deps {
                    None => true,
                    Some(deps) => deps_changed(previous.deps.as_ref(), deps),
                };
                (dirty, previous.cleanup.clone())
            }
        };
        let hook = EffectHook {
            effect: RefCell::new(Some(Box::new(effect))),
            cleanup,
            deps,
            is_dirty,
        };
        put(&mut frame.slots.effects, index, Rc::new(hook));
    });
}

/// A mutable holder whose identity survives re-renders.
pub struct RefObject<T>(Rc<RefCell<T>>);

impl<T> Clone for RefObject<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for RefObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefObject").field(&self.0.borrow()).finish()
    }
}

impl<T> RefObject<T> {
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> RefObject<T> {
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

pub fn use_ref<T: 'static>(initial: T) -> RefObject<T> {
    with_frame("use_ref", |frame| {
        let index = frame.claim(HookKind::Ref);
        let existing = if frame.has_alternate {
            frame.slots.refs.get(index).cloned()
        } else {
            None
        };
        match existing {
            Some(slot) => match slot.downcast::<RefCell<T>>() {
                Ok(cell) => RefObject(cell),
                Err(_) => frame.mismatch("ref", index),
            },
            None => {
                let cell = Rc::new(RefCell::new(initial));
                put(&mut frame.slots.refs, index, cell.clone() as Rc<dyn Any>);
                RefObject(cell)
            }
        }
    })
}

/// Returns the previously stored callable while `deps` are unchanged.
pub fn use_callback<C: Clone + 'static>(callback: C, deps: Deps) -> C {
    with_frame("use_callback", |frame| {
        let index = frame.claim(HookKind::Callback);
        let previous = if frame.has_alternate {
            frame.slots.callbacks.get(index).cloned()
        } else {
            None
        };
        if let Some(previous) = previous {
            if !deps_changed(Some(&previous.deps), &deps) {
                let Some(stored) = previous.callback.downcast_ref::<C>().cloned() else {
                    frame.mismatch("callback", index)
                };
                return stored;
            }
        }
        let hook = CallbackHook {
            callback: Rc::new(callback.clone()),
            deps,
        };
        put(&mut frame.slots.callbacks, index, Rc::new(hook));
        callback
    })
}

/// Value of the nearest enclosing provider of `context`, else its default.
pub fn use_context<T: Clone + 'static>(context: &Context<T>) -> T {
    with_frame("use_context", |frame| {
        let index = frame.claim(HookKind::Context);
        let id = context.id();
        let value = frame
            .providers
            .iter()
            .find(|(provider, _)| *provider == id)
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| context.cell().default_value());
        let hook = ContextHook {
            context: id,
            value: value.clone(),
        };
        put(&mut frame.slots.contexts, index, Rc::new(hook));
        downcast_value::<T>(&value)
    })
}
