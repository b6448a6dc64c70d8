use crate::test_support::{mount, prepare};
use crate::{
    deps, fragment, text, use_callback, use_context, use_ref, use_state, Callback, Component,
    Context, EffectTag, Element, NeverYield, Props, Rendered, RuntimeConfig,
};
use std::cell::{Cell, RefCell};

thread_local! {
    static CALLBACKS: RefCell<Vec<Callback>> = const { RefCell::new(Vec::new()) };
    static SKIP_FIRST: Cell<bool> = const { Cell::new(false) };
    static THEME: Context<&'static str> = Context::new("light");
    static RENDERS: Cell<usize> = const { Cell::new(0) };
}

fn memoized(props: &Props) -> Rendered {
    let dep = props.get_int("dep").unwrap_or_default();
    let callback = use_callback(Callback::new(move |_| {}), deps![dep]);
    CALLBACKS.with(|seen| seen.borrow_mut().push(callback));
    Ok(None)
}

const MEMOIZED: Component = Component::new("Memoized", memoized);

fn memo_tree(dep: i64, tick: i64) -> Element {
    Element::host("div").child(Element::component(MEMOIZED).attr("dep", dep).attr("tick", tick))
}

#[test]
fn callbacks_are_reused_while_dependencies_match() {
    let app = mount(memo_tree(1, 0));
    app.render(memo_tree(1, 1));
    app.render(memo_tree(2, 2));

    let seen = CALLBACKS.with(|seen| seen.borrow().clone());
    assert_eq!(seen.len(), 3);
    assert!(seen[0].ptr_eq(&seen[1]));
    assert!(!seen[1].ptr_eq(&seen[2]));
    assert_eq!(app.fibers("Memoized")[0].callback_slots, 1);
}

fn conditional(_: &Props) -> Rendered {
    if !SKIP_FIRST.with(Cell::get) {
        let _ = use_state(String::from("first"));
    }
    let (second, _) = use_state(String::from("second"));
    Ok(Some(text(second)))
}

const CONDITIONAL: Component = Component::new("Conditional", conditional);

#[test]
fn conditional_hooks_bind_to_the_wrong_slot() {
    SKIP_FIRST.with(|skip| skip.set(false));
    let app = mount(Element::component(CONDITIONAL));
    assert_eq!(app.text(), "second");

    SKIP_FIRST.with(|skip| skip.set(true));
    app.root.handle().request_update();
    app.root.drain_tasks();

    assert_eq!(app.text(), "first");
    assert_eq!(app.root.stats().aborted, 0);
}

#[test]
fn strict_mode_rejects_a_changed_hook_sequence() {
    SKIP_FIRST.with(|skip| skip.set(false));
    let app = prepare(
        RuntimeConfig::default().with_strict_hook_order(true),
        Box::new(NeverYield),
    );
    app.render(Element::component(CONDITIONAL));
    assert_eq!(app.text(), "second");

    SKIP_FIRST.with(|skip| skip.set(true));
    app.root.handle().request_update();
    app.root.drain_tasks();

    assert_eq!(app.text(), "second");
    assert_eq!(app.root.stats().aborted, 1);
}

fn themed(_: &Props) -> Rendered {
    let theme = THEME.with(Clone::clone);
    let value = use_context(&theme);
    Ok(Some(text(value)))
}

const THEMED: Component = Component::new("Themed", themed);

#[test]
fn context_resolves_the_nearest_provider() {
    let theme = THEME.with(Clone::clone);
    let app = mount(fragment([
        theme.provider(
            "dark",
            [
                Element::component(THEMED),
                theme.provider("blue", [Element::component(THEMED)]),
            ],
        ),
        Element::component(THEMED),
    ]));

    assert_eq!(app.text(), "darkbluelight");
    let themed = app.fibers("Themed");
    assert!(themed.iter().all(|fiber| fiber.context_slots == 1));
}

#[test]
fn consumers_read_the_shared_cell() {
    let theme = THEME.with(Clone::clone);
    let app = mount(theme.provider(
        "dark",
        [theme.consumer(|value| Ok(Some(text(format!("[{value}]")))))],
    ));
    assert_eq!(app.text(), "[dark]");
    assert_eq!(theme.current(), "dark");
}

#[test]
fn removing_a_provider_restores_the_cell() {
    let theme = THEME.with(Clone::clone);
    let app = mount(Element::host("div").child(theme.provider("dark", [text("x")])));
    assert_eq!(theme.current(), "dark");

    app.render(Element::host("div"));

    assert_eq!(theme.current(), "light");
}

#[test]
fn providers_and_consumers_update_even_with_equal_values() {
    let theme = THEME.with(Clone::clone);
    let tree = || {
        theme.provider(
            "dark",
            [theme.consumer(|value| Ok(Some(text(format!("[{value}]")))))],
        )
    };
    let app = mount(tree());

    app.render(tree());

    let snapshot = app.root.snapshot();
    let provider = snapshot
        .iter()
        .find(|fiber| fiber.label.starts_with("Provider"))
        .expect("provider fiber");
    assert_eq!(provider.tag, Some(EffectTag::Update));
    assert_eq!(provider.effect_slots, 1);
    let consumer = snapshot
        .iter()
        .find(|fiber| fiber.label == "Consumer")
        .expect("consumer fiber");
    assert_eq!(consumer.tag, Some(EffectTag::Update));
    assert_eq!(app.text(), "[dark]");
}

fn render_counter(_: &Props) -> Rendered {
    let renders = use_ref(0usize);
    renders.with_mut(|count| *count += 1);
    RENDERS.with(|seen| seen.set(renders.get()));
    let (count, set) = use_state(0i64);
    Ok(Some(
        Element::host("button")
            .on("click", move |_| set.set(count + 1))
            .child(count),
    ))
}

const RENDER_COUNTER: Component = Component::new("RenderCounter", render_counter);

#[test]
fn refs_persist_across_renders() {
    let app = mount(Element::component(RENDER_COUNTER));
    app.click("button");
    app.click("button");
    assert_eq!(app.text(), "2");
    assert_eq!(RENDERS.with(Cell::get), 3);
    assert_eq!(app.fibers("RenderCounter")[0].ref_slots, 1);
}

#[test]
fn hooks_called_from_event_handlers_panic() {
    fn leaky(_: &Props) -> Rendered {
        Ok(Some(Element::host("button").on("click", |_| {
            let _ = use_state(0);
        })))
    }
    let app = mount(Element::component(Component::new("Leaky", leaky)));

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        app.dispatch("button", "click");
    }));

    assert!(outcome.is_err());
}
