#![doc = r"Fiber reconciler, hook slots and commit engine for the Weave UI runtime."]

extern crate self as weave_core;

pub mod collections;
pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod memory_host;
pub mod platform;
pub mod props;
pub mod runtime;

mod commit;
mod reconciler;
mod work_loop;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

pub use config::RuntimeConfig;
pub use context::{Context, ContextId};
pub use element::{
    create_element, fragment, text, Child, Component, Element, ElementType, Rendered,
    NODE_VALUE_PROP,
};
pub use error::{HostError, RenderError};
pub use fiber::{EffectTag, FiberId, FiberSnapshot};
pub use hooks::{
    on_cleanup, use_callback, use_context, use_effect, use_ref, use_state, Cleanup, HookKind,
    RefObject, StateSetter,
};
pub use host::{apply_ref, diff_props, release_ref, HostAdapter, NodeHandle, NodeKind, PropChange};
pub use memory_host::{HostMutation, MemoryHost, MemoryNode, MemoryNodeKind};
pub use platform::{ClockDeadline, Clock, NeverYield, RuntimeScheduler, UnitBudget, YieldPolicy};
pub use props::{Callback, Deps, Event, Key, NodeRef, PropValue, Props, RefCallback, StyleMap};
pub use runtime::{RenderRoot, RenderStats, RootHandle};

/// Scheduler that ignores frame requests; the host drains tasks on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}
