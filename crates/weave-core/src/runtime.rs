//! Render sessions: the state a render root owns and the task queue the host drains.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::element::{Element, ElementType};
use crate::fiber::{snapshot_tree, Fiber, FiberArena, FiberId, FiberSnapshot};
use crate::hooks::{Cleanup, EffectHook, UpdateSink};
use crate::host::{HostAdapter, NodeHandle};
use crate::platform::{NeverYield, RuntimeScheduler, YieldPolicy};
use crate::props::Props;

/// Counters describing what a render root has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub committed: usize,
    pub aborted: usize,
    pub units: usize,
    pub yields: usize,
}

pub(crate) struct WorkState {
    pub(crate) arena: FiberArena,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    /// Set while a pass is between its start and its commit or abort.
    pub(crate) is_rendering: bool,
    pub(crate) work_loop_running: bool,
    pub(crate) update_requested: bool,
    pub(crate) stats: RenderStats,
}

impl WorkState {
    fn new() -> Self {
        Self {
            arena: FiberArena::with_key(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            is_rendering: false,
            work_loop_running: false,
            update_requested: false,
            stats: RenderStats::default(),
        }
    }
}

pub(crate) struct PendingEffect {
    pub(crate) fiber: FiberId,
    pub(crate) index: usize,
    pub(crate) component: &'static str,
    pub(crate) hook: Rc<EffectHook>,
}

#[derive(Default)]
pub(crate) struct EffectQueues {
    pub(crate) cleanups: Vec<(&'static str, Cleanup)>,
    pub(crate) effects: Vec<PendingEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    PerformWork,
    FlushEffects,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TaskId(u64);

#[derive(Default)]
pub(crate) struct TaskQueue {
    next_id: u64,
    queue: VecDeque<(TaskId, TaskKind)>,
    /// The single outstanding work-loop continuation, if any.
    work_task: Option<TaskId>,
}

impl TaskQueue {
    fn push(&mut self, kind: TaskKind) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.queue.push_back((id, kind));
        id
    }

    /// Queues a work-loop task, cancelling the previous one.
    pub(crate) fn replace_work(&mut self) {
        if let Some(stale) = self.work_task.take() {
            self.queue.retain(|(id, _)| *id != stale);
        }
        let id = self.push(TaskKind::PerformWork);
        self.work_task = Some(id);
    }

    pub(crate) fn push_flush(&mut self) {
        self.push(TaskKind::FlushEffects);
    }

    fn pop(&mut self) -> Option<TaskKind> {
        let (id, kind) = self.queue.pop_front()?;
        if self.work_task == Some(id) {
            self.work_task = None;
        }
        Some(kind)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

pub(crate) struct RootInner<H: HostAdapter> {
    pub(crate) config: RuntimeConfig,
    scheduler: Arc<dyn RuntimeScheduler>,
    pub(crate) yield_policy: Box<dyn YieldPolicy>,
    pub(crate) host: RefCell<H>,
    pub(crate) work: RefCell<WorkState>,
    pub(crate) effects: RefCell<EffectQueues>,
    tasks: RefCell<TaskQueue>,
    weak_self: Weak<RootInner<H>>,
}

impl<H: HostAdapter + 'static> RootInner<H> {
    pub(crate) fn updater(&self) -> Weak<dyn UpdateSink> {
        self.weak_self.clone()
    }

    /// Starts a pass from a fresh root fiber whose alternate is the current root.
    pub(crate) fn begin_pass(&self, props: Rc<Props>, container: NodeHandle) {
        {
            let mut work = self.work.borrow_mut();
            if let Some(stale) = work.wip_root.take() {
                let freed = crate::fiber::free_subtree(&mut work.arena, stale);
                log::debug!("discarding superseded work-in-progress tree ({freed} fibers)");
            }
            let alternate = work.current_root;
            let root = work.arena.insert(Fiber::root(container, props, alternate));
            work.wip_root = Some(root);
            work.next_unit = Some(root);
            work.deletions.clear();
            work.is_rendering = true;
        }
        self.schedule_work();
    }

    /// Re-renders the committed tree from its root.
    pub(crate) fn rerender_current(&self) {
        let restart = {
            let work = self.work.borrow();
            work.current_root
                .and_then(|root| work.arena.get(root))
                .and_then(|root| root.node.map(|container| (root.props.clone(), container)))
        };
        match restart {
            Some((props, container)) => self.begin_pass(props, container),
            None => log::debug!("update requested before the first commit; ignoring"),
        }
    }

    pub(crate) fn schedule_work(&self) {
        self.tasks.borrow_mut().replace_work();
        self.scheduler.schedule_frame();
    }

    pub(crate) fn schedule_flush(&self) {
        self.tasks.borrow_mut().push_flush();
        self.scheduler.schedule_frame();
    }

    /// Starts the pass coalesced while another one was rendering, if any.
    pub(crate) fn run_requested_update(&self) {
        let requested = std::mem::take(&mut self.work.borrow_mut().update_requested);
        if requested {
            log::debug!("starting coalesced update pass");
            self.rerender_current();
        }
    }

    fn run_next_task(&self) -> bool {
        let task = self.tasks.borrow_mut().pop();
        match task {
            Some(TaskKind::PerformWork) => self.perform_work(),
            Some(TaskKind::FlushEffects) => self.flush_effects(),
            None => return false,
        }
        true
    }
}

impl<H: HostAdapter + 'static> UpdateSink for RootInner<H> {
    fn schedule_update(&self) {
        let rendering = {
            let mut work = self.work.borrow_mut();
            if work.is_rendering {
                work.update_requested = true;
            }
            work.is_rendering
        };
        if !rendering {
            self.rerender_current();
        }
    }
}

/// A render session bound to one host adapter.
///
/// All reconciler state lives here, so independent roots never share trees,
/// queues or flags. The root never runs work on its own: it queues tasks,
/// wakes the host through its [`RuntimeScheduler`], and the host calls
/// [`run_next_task`](Self::run_next_task) or [`drain_tasks`](Self::drain_tasks).
pub struct RenderRoot<H: HostAdapter> {
    inner: Rc<RootInner<H>>,
}

impl<H: HostAdapter> Clone for RenderRoot<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: HostAdapter + 'static> RenderRoot<H> {
    /// A root that never yields and uses the default configuration.
    pub fn new(host: H, scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self::with_options(host, scheduler, RuntimeConfig::default(), Box::new(NeverYield))
    }

    pub fn with_options(
        host: H,
        scheduler: Arc<dyn RuntimeScheduler>,
        config: RuntimeConfig,
        yield_policy: Box<dyn YieldPolicy>,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak_self| RootInner {
            config,
            scheduler,
            yield_policy,
            host: RefCell::new(host),
            work: RefCell::new(WorkState::new()),
            effects: RefCell::new(EffectQueues::default()),
            tasks: RefCell::new(TaskQueue::default()),
            weak_self: weak_self.clone(),
        });
        Self { inner }
    }

    /// Renders `element` into `container`.
    ///
    /// Ignored while a pass is in flight; a render issued before the queued
    /// pass started replaces it.
    pub fn render(&self, element: Element, container: NodeHandle) {
        if self.inner.work.borrow().work_loop_running {
            log::debug!("render ignored: a pass is already in flight");
            return;
        }
        let mut props = Props::new();
        props.push_child(element);
        self.inner.begin_pass(Rc::new(props), container);
    }

    /// Runs one queued task. Returns `false` when the queue was empty.
    pub fn run_next_task(&self) -> bool {
        self.inner.run_next_task()
    }

    /// Runs tasks until none are left, including those queued while draining.
    pub fn drain_tasks(&self) -> usize {
        let mut ran = 0;
        while self.inner.run_next_task() {
            ran += 1;
        }
        ran
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.inner.tasks.borrow().len() > 0
    }

    pub fn pending_task_count(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    pub fn handle(&self) -> RootHandle {
        RootHandle(self.inner.updater())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> RenderStats {
        self.inner.work.borrow().stats
    }

    pub fn is_rendering(&self) -> bool {
        self.inner.work.borrow().is_rendering
    }

    /// Borrows the host. Must not be called from inside a component or ref callback.
    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.inner.host.borrow())
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.host.borrow_mut())
    }

    /// The committed tree in pre-order, root first.
    pub fn snapshot(&self) -> Vec<FiberSnapshot> {
        let work = self.inner.work.borrow();
        match work.current_root {
            Some(root) => snapshot_tree(&work.arena, root),
            None => Vec::new(),
        }
    }

    /// First committed component fiber named `name`, in pre-order.
    pub fn find_component(&self, name: &str) -> Option<FiberId> {
        self.snapshot()
            .into_iter()
            .find(|fiber| fiber.label == name && self.is_component(fiber.id))
            .map(|fiber| fiber.id)
    }

    fn is_component(&self, id: FiberId) -> bool {
        let work = self.inner.work.borrow();
        work.arena.get(id).is_some_and(Fiber::is_component)
    }

    /// Value of state slot `index` of a committed fiber.
    pub fn read_state<T: Clone + 'static>(&self, fiber: FiberId, index: usize) -> Option<T> {
        let slot = {
            let work = self.inner.work.borrow();
            work.arena.get(fiber)?.hooks.states.get(index)?.clone()
        };
        let value = slot.borrow().downcast_ref::<T>().cloned();
        value
    }

    /// Host node of a committed fiber.
    pub fn node_of(&self, fiber: FiberId) -> Option<NodeHandle> {
        self.inner.work.borrow().arena.get(fiber)?.node
    }

    /// Type of a committed fiber; `None` for the root or an unknown id.
    pub fn type_of(&self, fiber: FiberId) -> Option<ElementType> {
        self.inner.work.borrow().arena.get(fiber)?.ty.clone()
    }
}

/// Weak handle that requests a re-render of the committed tree.
#[derive(Clone)]
pub struct RootHandle(Weak<dyn UpdateSink>);

impl RootHandle {
    /// Same effect as a state setter writing a new value.
    pub fn request_update(&self) {
        if let Some(sink) = self.0.upgrade() {
            sink.schedule_update();
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
