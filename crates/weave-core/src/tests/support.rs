use std::cell::RefCell;
use std::sync::Arc;

use crate::{
    DefaultScheduler, Element, Event, FiberSnapshot, HostMutation, MemoryHost, NeverYield,
    NodeHandle, RenderRoot, RuntimeConfig, YieldPolicy,
};

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn record(entry: impl Into<String>) {
    LOG.with(|log| log.borrow_mut().push(entry.into()));
}

pub(crate) fn take_log() -> Vec<String> {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

pub(crate) struct Mounted {
    pub(crate) root: RenderRoot<MemoryHost>,
    pub(crate) container: NodeHandle,
}

/// Renders `element` and runs every resulting task.
pub(crate) fn mount(element: Element) -> Mounted {
    let mounted = prepare(RuntimeConfig::default(), Box::new(NeverYield));
    mounted.root.render(element, mounted.container);
    mounted.root.drain_tasks();
    mounted
}

/// A root with nothing rendered yet.
pub(crate) fn prepare(config: RuntimeConfig, policy: Box<dyn YieldPolicy>) -> Mounted {
    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    let root = RenderRoot::with_options(host, Arc::new(DefaultScheduler), config, policy);
    Mounted { root, container }
}

impl Mounted {
    pub(crate) fn render(&self, element: Element) {
        self.root.render(element, self.container);
        self.root.drain_tasks();
    }

    pub(crate) fn text(&self) -> String {
        self.root.with_host(|host| host.text_content(self.container))
    }

    pub(crate) fn mutations(&self) -> Vec<HostMutation> {
        self.root.with_host(|host| host.mutations().to_vec())
    }

    pub(crate) fn clear_mutations(&self) {
        self.root.with_host_mut(MemoryHost::clear_mutations);
    }

    pub(crate) fn nodes(&self, tag: &str) -> Vec<NodeHandle> {
        self.root.with_host(|host| host.find_by_tag(self.container, tag))
    }

    /// Fires `event` on the first node with `tag` without draining tasks.
    pub(crate) fn dispatch(&self, tag: &str, event: &str) {
        let node = self.nodes(tag)[0];
        let listener = self
            .root
            .with_host(|host| host.listener(node, event))
            .expect("listener registered");
        listener.call(&Event::new(event, node));
    }

    pub(crate) fn click(&self, tag: &str) {
        self.dispatch(tag, "click");
        self.root.drain_tasks();
    }

    pub(crate) fn fibers(&self, label: &str) -> Vec<FiberSnapshot> {
        self.root
            .snapshot()
            .into_iter()
            .filter(|fiber| fiber.label == label)
            .collect()
    }
}
