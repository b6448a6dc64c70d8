//! The cooperative work loop and per-fiber units of work.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::context::{cell_from_prop, ContextId, CONTEXT_PROP, VALUE_PROP};
use crate::element::{Component, Element, ElementType};
use crate::error::{panic_message, RenderError};
use crate::fiber::{free_subtree, next_unit_of_work, FiberArena, FiberId};
use crate::hooks::{enter_frame, on_cleanup, EffectFn, EffectHook, HookFrame, HookKind};
use crate::host::{HostAdapter, NodeKind};
use crate::props::PropValue;
use crate::reconciler::reconcile_children;
use crate::runtime::RootInner;

impl<H: HostAdapter + 'static> RootInner<H> {
    /// One work-loop task: process units until the tree is done or the yield
    /// policy asks to hand control back, then commit or queue a continuation.
    pub(crate) fn perform_work(&self) {
        {
            let mut work = self.work.borrow_mut();
            if work.next_unit.is_none() {
                return;
            }
            work.work_loop_running = true;
        }
        self.yield_policy.begin_slice();

        loop {
            let Some(unit) = self.work.borrow().next_unit else {
                break;
            };
            if self.yield_policy.should_yield() {
                break;
            }
            match self.perform_unit_of_work(unit) {
                Ok(next) => {
                    let mut work = self.work.borrow_mut();
                    work.next_unit = next;
                    work.stats.units += 1;
                }
                Err(err) => {
                    log::error!("render pass aborted: {err}");
                    self.abort_pass();
                    return;
                }
            }
        }

        let finished = {
            let work = self.work.borrow();
            work.next_unit.is_none() && work.wip_root.is_some()
        };
        if finished {
            self.commit_root();
        } else {
            self.work.borrow_mut().stats.yields += 1;
            log::trace!("work loop yielded; continuation queued");
            self.schedule_work();
        }
    }

    /// Drops the work-in-progress tree without touching the host.
    fn abort_pass(&self) {
        {
            let mut work = self.work.borrow_mut();
            if let Some(wip) = work.wip_root.take() {
                free_subtree(&mut work.arena, wip);
            }
            work.next_unit = None;
            work.deletions.clear();
            work.is_rendering = false;
            work.work_loop_running = false;
            work.stats.aborted += 1;
        }
        self.run_requested_update();
    }

    fn perform_unit_of_work(&self, unit: FiberId) -> Result<Option<FiberId>, RenderError> {
        let ty = {
            let work = self.work.borrow();
            match work.arena.get(unit) {
                Some(fiber) => fiber.ty.clone(),
                None => return Ok(None),
            }
        };
        log::trace!(
            "unit of work: {}",
            ty.as_ref().map_or_else(|| "#root".to_string(), ToString::to_string)
        );

        match ty {
            Some(ElementType::Component(component)) => self.update_component(unit, component)?,
            Some(ElementType::Provider(_)) => self.update_provider(unit),
            Some(ElementType::Host(tag)) => self.update_host(unit, NodeKind::Element(&tag))?,
            Some(ElementType::Text) => self.update_host(unit, NodeKind::Text)?,
            Some(ElementType::Fragment) | None => self.reconcile_own_children(unit),
        }

        let work = self.work.borrow();
        Ok(next_unit_of_work(&work.arena, unit))
    }

    fn reconcile_own_children(&self, unit: FiberId) {
        let mut work = self.work.borrow_mut();
        let Some(props) = work.arena.get(unit).map(|fiber| fiber.props.clone()) else {
            return;
        };
        let work = &mut *work;
        reconcile_children(&mut work.arena, &mut work.deletions, unit, props.children());
    }

    fn update_host(&self, unit: FiberId, kind: NodeKind<'_>) -> Result<(), RenderError> {
        let pending = {
            let work = self.work.borrow();
            work.arena
                .get(unit)
                .filter(|fiber| fiber.node.is_none())
                .map(|fiber| fiber.props.clone())
        };
        if let Some(props) = pending {
            let node = self.host.borrow_mut().create_node(kind, &props)?;
            if let Some(fiber) = self.work.borrow_mut().arena.get_mut(unit) {
                fiber.node = Some(node);
            }
        }
        self.reconcile_own_children(unit);
        Ok(())
    }

    fn update_component(&self, unit: FiberId, component: Component) -> Result<(), RenderError> {
        let name = component.name();
        let (props, frame, previous_kinds) = {
            let work = self.work.borrow();
            let Some(fiber) = work.arena.get(unit) else {
                return Ok(());
            };
            let previous_kinds = fiber
                .alternate
                .and_then(|alternate| work.arena.get(alternate))
                .map(|alternate| alternate.hook_kinds.clone());
            let frame = HookFrame::new(
                unit,
                name,
                fiber.alternate.is_some(),
                fiber.hooks.clone(),
                providers_above(&work.arena, fiber.return_fiber),
                self.updater(),
            );
            (fiber.props.clone(), frame, previous_kinds)
        };

        let guard = enter_frame(frame);
        let outcome = catch_unwind(AssertUnwindSafe(|| component.render(&props)));
        let frame = guard.finish();

        let rendered = match outcome {
            Ok(Ok(rendered)) => rendered,
            Ok(Err(source)) => return Err(RenderError::Component { name, source }),
            Err(payload) => {
                return Err(RenderError::ComponentPanicked {
                    name,
                    message: panic_message(payload.as_ref()),
                })
            }
        };
        let Some(frame) = frame else {
            return Ok(());
        };

        if let Some(previous) = previous_kinds {
            if previous != frame.kinds {
                if self.config.strict_hook_order {
                    return Err(RenderError::HookOrderChanged {
                        name,
                        previous: previous.len(),
                        current: frame.kinds.len(),
                    });
                }
                log::warn!(
                    "`{name}` changed its hook sequence between renders ({} -> {} hooks); \
                     slots are bound by position",
                    previous.len(),
                    frame.kinds.len()
                );
            }
        }

        let children: Vec<Element> = rendered.into_iter().collect();
        let mut work = self.work.borrow_mut();
        let work = &mut *work;
        if let Some(fiber) = work.arena.get_mut(frame.fiber) {
            fiber.hooks = frame.slots;
            fiber.hook_cursor = frame.cursor;
            fiber.hook_kinds = frame.kinds;
        }
        reconcile_children(&mut work.arena, &mut work.deletions, unit, &children);
        Ok(())
    }

    /// Writes the provided value into the shared context cell and keeps a
    /// restore effect in effect slot 0 that puts the previous value back when
    /// it is cleaned up.
    fn update_provider(&self, unit: FiberId) {
        {
            let mut work = self.work.borrow_mut();
            let Some(fiber) = work.arena.get_mut(unit) else {
                return;
            };
            let cell = fiber.props.get(CONTEXT_PROP).and_then(cell_from_prop);
            let value = match fiber.props.get(VALUE_PROP) {
                Some(PropValue::Any(value)) => Some(value.clone()),
                _ => None,
            };
            if let (Some(cell), Some(value)) = (cell, value) {
                let previous = cell.replace(value.clone());
                let effect: EffectFn = Box::new(move || {
                    on_cleanup(move || {
                        cell.replace(previous);
                    })
                });
                let cleanup = fiber
                    .hooks
                    .effects
                    .first()
                    .map(|hook| hook.cleanup.clone())
                    .unwrap_or_default();
                let hook = Rc::new(EffectHook::always(
                    effect,
                    vec![PropValue::Any(value)],
                    cleanup,
                ));
                if fiber.hooks.effects.is_empty() {
                    fiber.hooks.effects.push(hook);
                } else {
                    fiber.hooks.effects[0] = hook;
                }
                fiber.hook_cursor = 1;
                fiber.hook_kinds = vec![HookKind::Effect];
            } else {
                log::warn!("provider fiber without a context cell or value");
            }
        }
        self.reconcile_own_children(unit);
    }
}

/// Provider values on the return path starting at `start`, nearest first.
fn providers_above(arena: &FiberArena, start: Option<FiberId>) -> Vec<(ContextId, Rc<dyn Any>)> {
    let mut providers = Vec::new();
    let mut cursor = start;
    while let Some(id) = cursor {
        let Some(fiber) = arena.get(id) else {
            break;
        };
        if let Some(ElementType::Provider(context)) = &fiber.ty {
            if let Some(PropValue::Any(value)) = fiber.props.get(VALUE_PROP) {
                providers.push((*context, value.clone()));
            }
        }
        cursor = fiber.return_fiber;
    }
    providers
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
