use super::*;
use crate::test_support::{mount, prepare, Mounted};
use crate::{
    text, use_state, Component, EffectTag, Element, HostMutation, NeverYield, Rendered,
    UnitBudget,
};
use std::cell::Cell;

fn counter(_: &Props) -> Rendered {
    let (count, set_count) = use_state(0i64);
    Ok(Some(
        Element::host("button")
            .on("click", move |_| set_count.update(|count| count + 1))
            .child(count),
    ))
}

const COUNTER: Component = Component::new("Counter", counter);

fn article(_: &Props) -> Rendered {
    Ok(Some(
        Element::host("div")
            .class_name("box")
            .child(Element::host("p").child("hello"))
            .child(Element::host("span").child(42)),
    ))
}

const ARTICLE: Component = Component::new("Article", article);

thread_local! {
    static FAILURE: Cell<u8> = const { Cell::new(0) };
}

fn fragile(_: &Props) -> Rendered {
    match FAILURE.with(Cell::get) {
        1 => anyhow::bail!("render failed"),
        2 => panic!("render panicked"),
        _ => Ok(Some(text("ok"))),
    }
}

const FRAGILE: Component = Component::new("Fragile", fragile);

fn eager(_: &Props) -> Rendered {
    let (count, set_count) = use_state(0u32);
    if count < 3 {
        set_count.set(count + 1);
    }
    Ok(Some(text(i64::from(count))))
}

const EAGER: Component = Component::new("Eager", eager);

#[test]
fn counter_increments_through_a_click() {
    let app = mount(Element::component(COUNTER));
    assert_eq!(app.text(), "0");
    assert!(!app.root.has_pending_tasks());

    app.click("button");

    assert_eq!(app.text(), "1");
    let text_fiber = &app.fibers("#text")[0];
    assert_eq!(text_fiber.tag, Some(EffectTag::Update));
    let counter = &app.fibers("Counter")[0];
    assert_eq!(counter.state_slots, 1);
    assert_eq!(app.root.read_state::<i64>(counter.id, 0), Some(1));
    assert_eq!(app.root.find_component("Counter"), Some(counter.id));
    assert_eq!(app.root.stats().committed, 2);
}

#[test]
fn rerendering_an_unchanged_tree_only_skips() {
    let element = Element::component(ARTICLE);
    let app = mount(element.clone());
    assert_eq!(app.text(), "hello42");
    app.clear_mutations();

    app.render(element);

    assert!(app.mutations().is_empty());
    let snapshot = app.root.snapshot();
    assert_eq!(snapshot.len(), 7);
    assert!(snapshot
        .iter()
        .skip(1)
        .all(|fiber| fiber.tag == Some(EffectTag::Skip)));
}

#[test]
fn deletions_are_applied_before_updates() {
    let app = mount(
        Element::host("div")
            .child(Element::host("p").attr("title", "one"))
            .child(Element::host("span")),
    );
    let div = app.nodes("div")[0];
    let p = app.nodes("p")[0];
    let span = app.nodes("span")[0];
    app.clear_mutations();

    app.render(Element::host("div").child(Element::host("p").attr("title", "two")));

    assert_eq!(
        app.mutations(),
        vec![
            HostMutation::Removed {
                parent: div,
                node: span
            },
            HostMutation::Patched { node: p },
        ]
    );
    assert_eq!(
        app.root.with_host(|host| host.attribute(p, "title").map(str::to_string)),
        Some("two".to_string())
    );
}

fn list(keys: &[&str]) -> Element {
    Element::host("ul").children(
        keys.iter()
            .map(|key| Element::host("li").key(*key).child(key.to_uppercase())),
    )
}

#[test]
fn removing_a_middle_keyed_item_recreates_the_tail() {
    let app = mount(list(&["a", "b", "c"]));
    let before = app.nodes("li");
    assert_eq!(app.text(), "ABC");

    app.render(list(&["a", "c"]));

    assert_eq!(app.text(), "AC");
    let items = app.fibers("li");
    assert_eq!(items[0].tag, Some(EffectTag::Skip));
    assert_eq!(items[1].tag, Some(EffectTag::Placement));
    let after = app.nodes("li");
    assert_eq!(after[0], before[0]);
    assert_ne!(after[1], before[2], "the `c` item is recreated, not moved");
    let removed = app
        .mutations()
        .iter()
        .filter(|mutation| matches!(mutation, HostMutation::Removed { .. }))
        .count();
    assert_eq!(removed, 2);
}

#[test]
fn budgeted_work_yields_between_units() {
    let app = prepare(RuntimeConfig::default(), Box::new(UnitBudget::new(1)));
    app.root.render(Element::component(ARTICLE), app.container);

    assert!(app.root.run_next_task());
    assert!(app.root.is_rendering());
    assert_eq!(app.text(), "", "nothing is committed mid-pass");

    app.root.render(text("ignored"), app.container);
    app.root.drain_tasks();

    assert_eq!(app.text(), "hello42");
    let stats = app.root.stats();
    assert_eq!(stats.units, 7);
    assert_eq!(stats.yields, 6);
    assert_eq!(stats.committed, 1);
}

#[test]
fn a_new_render_replaces_the_queued_pass() {
    let app = prepare(RuntimeConfig::default(), Box::new(NeverYield));
    app.root.render(text("first"), app.container);
    app.root.render(text("second"), app.container);
    assert_eq!(app.root.pending_task_count(), 1);

    app.root.drain_tasks();

    assert_eq!(app.text(), "second");
    assert_eq!(app.root.stats().committed, 1);
}

fn assert_failed_update_is_discarded(mode: u8) {
    FAILURE.with(|failure| failure.set(0));
    let app = mount(Element::host("section").child(Element::component(FRAGILE)));
    assert_eq!(app.text(), "ok");
    let before = app.root.snapshot();
    app.clear_mutations();

    FAILURE.with(|failure| failure.set(mode));
    app.root.handle().request_update();
    app.root.drain_tasks();

    let stats = app.root.stats();
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.committed, 1);
    assert!(!app.root.is_rendering());
    assert!(app.mutations().is_empty());
    assert_eq!(app.text(), "ok");
    assert_eq!(app.root.snapshot().len(), before.len());

    FAILURE.with(|failure| failure.set(0));
    app.root.handle().request_update();
    app.root.drain_tasks();
    assert_eq!(app.root.stats().committed, 2);
}

#[test]
fn component_errors_abort_the_pass_without_committing() {
    assert_failed_update_is_discarded(1);
}

#[test]
fn component_panics_abort_the_pass_without_committing() {
    assert_failed_update_is_discarded(2);
}

#[test]
fn updates_requested_while_rendering_are_coalesced() {
    let app = mount(Element::component(EAGER));
    assert_eq!(app.text(), "3");
    assert_eq!(app.root.stats().committed, 4);
    assert!(!app.root.has_pending_tasks());
}

#[test]
fn independent_roots_do_not_share_state() {
    let first: Mounted = mount(Element::component(COUNTER));
    let second = mount(Element::component(COUNTER));

    first.click("button");
    first.click("button");

    assert_eq!(first.text(), "2");
    assert_eq!(second.text(), "0");
}

#[test]
fn handles_outlive_their_root_safely() {
    let app = mount(Element::component(COUNTER));
    let handle = app.root.handle();
    assert!(handle.is_alive());
    drop(app);
    assert!(!handle.is_alive());
    handle.request_update();
}

#[test]
fn task_queue_keeps_a_single_work_task() {
    let mut queue = TaskQueue::default();
    queue.replace_work();
    queue.push_flush();
    queue.replace_work();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop(), Some(TaskKind::FlushEffects));
    assert_eq!(queue.pop(), Some(TaskKind::PerformWork));
    assert_eq!(queue.pop(), None);
}
