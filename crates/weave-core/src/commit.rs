//! Commit engine and deferred effect flush.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::element::ElementType;
use crate::error::panic_message;
use crate::fiber::{free_subtree, subtree, EffectTag, FiberArena, FiberId};
use crate::hooks::Cleanup;
use crate::host::{apply_ref, release_ref, HostAdapter, NodeHandle, REF_PROP};
use crate::props::{PropValue, Props};
use crate::runtime::{PendingEffect, RootInner, WorkState};

enum Mutation {
    Append {
        parent: NodeHandle,
        node: NodeHandle,
        props: Rc<Props>,
    },
    Patch {
        node: NodeHandle,
        previous: Rc<Props>,
        next: Rc<Props>,
    },
}

#[derive(Default)]
struct CommitPlan {
    deletion_cleanups: Vec<(&'static str, Cleanup)>,
    released_refs: Vec<PropValue>,
    removals: Vec<(NodeHandle, NodeHandle)>,
    mutations: Vec<Mutation>,
    cleanups: Vec<(&'static str, Cleanup)>,
    effects: Vec<PendingEffect>,
    has_child: bool,
}

fn owns_effects(ty: Option<&ElementType>) -> bool {
    matches!(ty, Some(ElementType::Component(_) | ElementType::Provider(_)))
}

/// Nearest ancestor of `id` that owns a host node.
fn host_parent(arena: &FiberArena, id: FiberId) -> Option<NodeHandle> {
    let mut cursor = arena.get(id)?.return_fiber;
    while let Some(ancestor) = cursor {
        let fiber = arena.get(ancestor)?;
        if fiber.node.is_some() {
            return fiber.node;
        }
        cursor = fiber.return_fiber;
    }
    None
}

/// Topmost host nodes of a subtree: the fiber's own node, or those of its
/// children when it has none.
fn top_nodes(arena: &FiberArena, id: FiberId, out: &mut Vec<NodeHandle>) {
    let Some(fiber) = arena.get(id) else {
        return;
    };
    if let Some(node) = fiber.node {
        out.push(node);
        return;
    }
    let mut child = fiber.child;
    while let Some(child_id) = child {
        top_nodes(arena, child_id, out);
        child = arena.get(child_id).and_then(|fiber| fiber.sibling);
    }
}

impl CommitPlan {
    fn collect_deletions(&mut self, work: &WorkState) {
        let arena = &work.arena;
        for &deleted in &work.deletions {
            for id in subtree(arena, deleted) {
                let Some(fiber) = arena.get(id) else {
                    continue;
                };
                if owns_effects(fiber.ty.as_ref()) {
                    let name = fiber.component_name();
                    for hook in &fiber.hooks.effects {
                        if let Some(cleanup) = hook.take_cleanup() {
                            self.deletion_cleanups.push((name, cleanup));
                        }
                    }
                }
                if fiber.node.is_some() {
                    if let Some(node_ref) = fiber.props.get(REF_PROP) {
                        self.released_refs.push(node_ref.clone());
                    }
                }
            }
            let Some(parent) = host_parent(arena, deleted) else {
                log::warn!("deleted fiber has no host ancestor; nothing to detach");
                continue;
            };
            let mut nodes = Vec::new();
            top_nodes(arena, deleted, &mut nodes);
            self.removals
                .extend(nodes.into_iter().map(|node| (parent, node)));
        }
    }

    fn collect_mutations(&mut self, work: &WorkState, root: FiberId) {
        let arena = &work.arena;
        self.has_child = arena.get(root).is_some_and(|fiber| fiber.child.is_some());
        for id in subtree(arena, root).into_iter().skip(1) {
            let Some(fiber) = arena.get(id) else {
                continue;
            };
            match (fiber.effect_tag, fiber.node) {
                (Some(EffectTag::Placement), Some(node)) => match host_parent(arena, id) {
                    Some(parent) => self.mutations.push(Mutation::Append {
                        parent,
                        node,
                        props: fiber.props.clone(),
                    }),
                    None => log::warn!("placed node {node:?} has no host parent"),
                },
                (Some(EffectTag::Update), Some(node)) => {
                    let previous = fiber
                        .alternate
                        .and_then(|alternate| arena.get(alternate))
                        .map(|alternate| alternate.props.clone())
                        .unwrap_or_default();
                    self.mutations.push(Mutation::Patch {
                        node,
                        previous,
                        next: fiber.props.clone(),
                    });
                }
                _ => {}
            }

            let tagged = matches!(
                fiber.effect_tag,
                Some(EffectTag::Placement | EffectTag::Update)
            );
            if tagged && owns_effects(fiber.ty.as_ref()) {
                let component = fiber.component_name();
                for (index, hook) in fiber.hooks.effects.iter().enumerate() {
                    if !hook.is_dirty {
                        continue;
                    }
                    if let Some(cleanup) = hook.take_cleanup() {
                        self.cleanups.push((component, cleanup));
                    }
                    self.effects.push(PendingEffect {
                        fiber: id,
                        index,
                        component,
                        hook: hook.clone(),
                    });
                }
            }
        }
    }
}

fn run_caught(what: &str, component: &str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        log::error!(
            "{what} of `{component}` panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

impl<H: HostAdapter + 'static> RootInner<H> {
    /// Applies the finished work-in-progress tree to the host and promotes it.
    ///
    /// The pass counts as rendering until its effect flush is queued, so state
    /// updates made by deletion cleanups and ref callbacks are coalesced into a
    /// pass that runs after the flush.
    pub(crate) fn commit_root(&self) {
        let plan = {
            let mut work = self.work.borrow_mut();
            let Some(root) = work.wip_root else {
                return;
            };
            let mut plan = CommitPlan::default();
            plan.collect_deletions(&work);
            plan.collect_mutations(&work, root);

            let work = &mut *work;
            if let Some(previous) = work.current_root.replace(root) {
                free_subtree(&mut work.arena, previous);
            }
            for id in subtree(&work.arena, root) {
                if let Some(fiber) = work.arena.get_mut(id) {
                    fiber.alternate = None;
                }
            }
            work.wip_root = None;
            work.next_unit = None;
            work.deletions.clear();
            work.work_loop_running = false;
            work.stats.committed += 1;
            plan
        };

        for (component, cleanup) in plan.deletion_cleanups {
            run_caught("cleanup", component, cleanup);
        }
        for node_ref in &plan.released_refs {
            run_caught("ref release", "ref", || release_ref(node_ref));
        }

        let mut attached_refs = Vec::new();
        {
            let mut host = self.host.borrow_mut();
            for (parent, node) in plan.removals {
                if let Err(err) = host.remove_node(parent, node) {
                    log::warn!("could not remove {node:?} from {parent:?}: {err}");
                }
            }
            for mutation in plan.mutations {
                match mutation {
                    Mutation::Append { parent, node, props } => {
                        if let Err(err) = host.append_child(parent, node) {
                            log::error!("could not append {node:?} to {parent:?}: {err}");
                        }
                        if let Some(next) = props.get(REF_PROP) {
                            attached_refs.push((None, Some(next.clone()), node));
                        }
                    }
                    Mutation::Patch {
                        node,
                        previous,
                        next,
                    } => {
                        if let Err(err) = host.patch_node(node, &previous, &next) {
                            log::error!("could not patch {node:?}: {err}");
                        }
                        let (old, new) = (previous.get(REF_PROP), next.get(REF_PROP));
                        if old.is_some() || new.is_some() {
                            attached_refs.push((old.cloned(), new.cloned(), node));
                        }
                    }
                }
            }
        }
        for (previous, next, node) in &attached_refs {
            run_caught("ref update", "ref", || {
                apply_ref(previous.as_ref(), next.as_ref(), *node);
            });
        }

        log::debug!(
            "committed pass: {} effects, {} cleanups queued",
            plan.effects.len(),
            plan.cleanups.len()
        );
        if plan.has_child {
            {
                let mut queues = self.effects.borrow_mut();
                queues.cleanups.extend(plan.cleanups);
                queues.effects.extend(plan.effects);
            }
            self.schedule_flush();
        }
        let next_pass_begun = {
            let mut work = self.work.borrow_mut();
            let begun = work.wip_root.is_some();
            if !begun {
                work.is_rendering = false;
            }
            begun
        };
        // A render issued from a ref callback already began the next pass; a
        // coalesced update waits for that pass to commit.
        if !next_pass_begun {
            self.run_requested_update();
        }
    }

    /// Runs every queued cleanup, then every queued effect, storing the
    /// cleanups the effects return.
    pub(crate) fn flush_effects(&self) {
        let (cleanups, effects) = {
            let mut queues = self.effects.borrow_mut();
            (
                std::mem::take(&mut queues.cleanups),
                std::mem::take(&mut queues.effects),
            )
        };
        for (component, cleanup) in cleanups {
            run_caught("cleanup", component, cleanup);
        }
        for pending in effects {
            let effect = pending.hook.effect.borrow_mut().take();
            let Some(effect) = effect else {
                continue;
            };
            log::trace!(
                "running effect {} of `{}` ({:?})",
                pending.index,
                pending.component,
                pending.fiber
            );
            match catch_unwind(AssertUnwindSafe(effect)) {
                Ok(cleanup) => *pending.hook.cleanup.borrow_mut() = cleanup,
                Err(payload) => log::error!(
                    "effect {} of `{}` panicked: {}",
                    pending.index,
                    pending.component,
                    panic_message(payload.as_ref())
                ),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod tests;
