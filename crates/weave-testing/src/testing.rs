use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weave_core::{
    Element, Event, FiberId, FiberSnapshot, HostMutation, MemoryHost, NeverYield, NodeHandle,
    RenderRoot, RenderStats, RuntimeConfig, RuntimeScheduler, YieldPolicy,
};

/// Scheduler that records how often the runtime asked for a frame.
#[derive(Debug, Default, Clone)]
pub struct TestScheduler {
    requests: Arc<AtomicUsize>,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RuntimeScheduler for TestScheduler {
    fn schedule_frame(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Headless harness for exercising render roots in tests.
///
/// Owns a [`RenderRoot`] over a [`MemoryHost`] with a container node, and
/// exposes helpers for mounting descriptors, dispatching events and
/// draining the task queue until the root is idle.
pub struct TestRoot {
    root: RenderRoot<MemoryHost>,
    container: NodeHandle,
    scheduler: TestScheduler,
}

impl TestRoot {
    /// A root that never yields, using the default configuration.
    pub fn new() -> Self {
        Self::with_options(RuntimeConfig::default(), Box::new(NeverYield))
    }

    pub fn with_options(config: RuntimeConfig, yield_policy: Box<dyn YieldPolicy>) -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = TestScheduler::new();
        let root =
            RenderRoot::with_options(host, Arc::new(scheduler.clone()), config, yield_policy);
        Self {
            root,
            container,
            scheduler,
        }
    }

    /// Render `element` and run tasks until the root is idle.
    pub fn mount(&self, element: Element) {
        self.root.render(element, self.container);
        self.settle();
    }

    /// Start a render without running any task.
    pub fn render(&self, element: Element) {
        self.root.render(element, self.container);
    }

    /// Run queued tasks until none remain. Returns how many ran.
    pub fn settle(&self) -> usize {
        self.root.drain_tasks()
    }

    /// Run a single queued task.
    pub fn step(&self) -> bool {
        self.root.run_next_task()
    }

    pub fn root(&self) -> &RenderRoot<MemoryHost> {
        &self.root
    }

    pub fn container(&self) -> NodeHandle {
        self.container
    }

    pub fn scheduler(&self) -> &TestScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> RenderStats {
        self.root.stats()
    }

    /// Text of every text node under the container.
    pub fn text(&self) -> String {
        self.root.with_host(|host| host.text_content(self.container))
    }

    pub fn dump(&self) -> String {
        self.root.with_host(|host| host.dump_tree(Some(self.container)))
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeHandle> {
        self.root.with_host(|host| host.find_by_tag(self.container, tag))
    }

    pub fn attribute(&self, node: NodeHandle, name: &str) -> Option<String> {
        self.root
            .with_host(|host| host.attribute(node, name).map(str::to_string))
    }

    /// Invoke the `event` listener of `node`, if any, then settle.
    ///
    /// Returns whether a listener was found.
    pub fn dispatch(&self, node: NodeHandle, event: Event) -> bool {
        let listener = self.root.with_host(|host| host.listener(node, &event.name));
        match listener {
            Some(listener) => {
                listener.call(&event);
                self.settle();
                true
            }
            None => false,
        }
    }

    /// Click the `index`-th node with `tag`.
    pub fn click(&self, tag: &str, index: usize) -> bool {
        match self.find_by_tag(tag).get(index) {
            Some(node) => self.dispatch(*node, Event::new("click", *node)),
            None => false,
        }
    }

    /// Fire an `input` event carrying `value` on the `index`-th node with `tag`.
    pub fn input(&self, tag: &str, index: usize, value: &str) -> bool {
        match self.find_by_tag(tag).get(index) {
            Some(node) => self.dispatch(*node, Event::new("input", *node).with_value(value)),
            None => false,
        }
    }

    pub fn mutations(&self) -> Vec<HostMutation> {
        self.root.with_host(|host| host.mutations().to_vec())
    }

    pub fn take_mutations(&self) -> Vec<HostMutation> {
        self.root.with_host_mut(MemoryHost::take_mutations)
    }

    pub fn snapshot(&self) -> Vec<FiberSnapshot> {
        self.root.snapshot()
    }

    /// Committed fibers labelled `label` (a tag, component name or `#text`).
    pub fn fibers(&self, label: &str) -> Vec<FiberSnapshot> {
        self.snapshot()
            .into_iter()
            .filter(|fiber| fiber.label == label)
            .collect()
    }

    pub fn component(&self, name: &str) -> Option<FiberId> {
        self.root.find_component(name)
    }

    /// State slot `index` of the first committed component named `name`.
    pub fn state<T: Clone + 'static>(&self, name: &str, index: usize) -> Option<T> {
        let fiber = self.component(name)?;
        self.root.read_state(fiber, index)
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a [`TestRoot`].
pub fn run_test_root<R>(f: impl FnOnce(&TestRoot) -> R) -> R {
    let root = TestRoot::new();
    f(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::text;

    #[test]
    fn mounting_requests_frames_and_settles() {
        let root = TestRoot::new();
        root.mount(Element::host("p").child("hello"));
        assert_eq!(root.text(), "hello");
        assert!(root.scheduler().frame_requests() >= 2, "work and flush tasks");
        assert!(!root.root().has_pending_tasks());
    }

    #[test]
    fn step_runs_one_task_at_a_time() {
        let root = TestRoot::new();
        root.render(text("a"));
        assert!(root.step());
        assert_eq!(root.text(), "a");
        assert!(root.step(), "effect flush");
        assert!(!root.step());
    }

    #[test]
    fn missing_targets_are_reported() {
        run_test_root(|root| {
            root.mount(Element::host("div"));
            assert!(!root.click("button", 0));
            assert!(!root.input("input", 0, "x"));
        });
    }
}
