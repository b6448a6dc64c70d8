//! Headless walk-through of a counter, a keyed list and a theme provider
//! rendered into the in-memory host.
//!
//! Run with `RUST_LOG=debug` to watch the work loop, and set
//! `WEAVE_TIME_SLICE_MS` to change how long each slice may run.

use anyhow::{anyhow, Context as _};
use weave_core::{
    deps, on_cleanup, use_context, use_effect, use_state, Context, Element, Event, MemoryHost,
    NodeHandle, Props, RenderRoot, Rendered,
};
use weave_macros::component;
use weave_runtime_std::StdRuntime;

thread_local! {
    static ACCENT: Context<&'static str> = Context::new("plain");
}

fn accent() -> Context<&'static str> {
    ACCENT.with(Clone::clone)
}

#[component]
fn Title(props: &Props) -> Rendered {
    let accent = use_context(&accent());
    let count = props.get_int("count").unwrap_or_default();
    use_effect(
        move || {
            log::info!("title shows {count}");
            on_cleanup(move || log::debug!("title stops showing {count}"))
        },
        Some(deps![count]),
    );
    Ok(Some(
        Element::host("h1")
            .class_name(accent)
            .child(format!("Clicked {count} times")),
    ))
}

#[component]
fn App(_: &Props) -> Rendered {
    let (count, set_count) = use_state(0i64);
    let (fancy, set_fancy) = use_state(false);

    let items = (0..count.min(5)).map(|item| {
        Element::host("li")
            .key(item)
            .child(format!("item {item}"))
    });

    Ok(Some(
        Element::host("main")
            .child(accent().provider(
                if fancy { "fancy" } else { "plain" },
                [Element::component(TITLE).attr("count", count)],
            ))
            .child(
                Element::host("button")
                    .attr("id", "increment")
                    .on("click", move |_| set_count.update(|count| count + 1))
                    .child("+1"),
            )
            .child(
                Element::host("button")
                    .attr("id", "accent")
                    .on("click", move |_| set_fancy.update(|fancy| !fancy))
                    .child("toggle accent"),
            )
            .child(Element::host("ul").children(items)),
    ))
}

fn run_frames(runtime: &StdRuntime, root: &RenderRoot<MemoryHost>) {
    while runtime.run_frame(root) > 0 {}
}

fn click(
    runtime: &StdRuntime,
    root: &RenderRoot<MemoryHost>,
    container: NodeHandle,
    id: &str,
) -> anyhow::Result<()> {
    let button = root
        .with_host(|host| {
            host.find_by_tag(container, "button")
                .into_iter()
                .find(|node| host.attribute(*node, "id") == Some(id))
        })
        .ok_or_else(|| anyhow!("no button with id `{id}`"))?;
    let listener = root
        .with_host(|host| host.listener(button, "click"))
        .with_context(|| format!("button `{id}` has no click listener"))?;
    listener.call(&Event::new("click", button));
    run_frames(runtime, root);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let runtime = StdRuntime::new();
    log::debug!("runtime config: {:?}", runtime.config());

    let mut host = MemoryHost::new();
    let container = host.create_container("app");
    let root = runtime.create_root(host);

    root.render(Element::component(APP), container);
    run_frames(&runtime, &root);
    println!("initial:\n{}", root.with_host(|host| host.dump_tree(Some(container))));

    for _ in 0..3 {
        click(&runtime, &root, container, "increment")?;
    }
    click(&runtime, &root, container, "accent")?;
    println!("after clicks:\n{}", root.with_host(|host| host.dump_tree(Some(container))));

    let stats = root.stats();
    println!(
        "committed {} passes in {} units ({} yields, {} aborted)",
        stats.committed, stats.units, stats.yields, stats.aborted
    );
    Ok(())
}
