use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weave_core::{
    use_state, DefaultScheduler, Element, MemoryHost, NodeHandle, Props, RenderRoot, Rendered,
    UnitBudget,
};
use weave_macros::component;

const ROW_COUNT_SAMPLES: &[usize] = &[16, 64, 256];

fn rows(count: usize, revision: usize) -> Element {
    Element::host("ul").children((0..count).map(|row| {
        Element::host("li")
            .key(row)
            .class_name(if row % 2 == 0 { "even" } else { "odd" })
            .child(format!("Row {row} rev {}", revision + row % 3))
    }))
}

#[component]
fn Ticker(props: &Props) -> Rendered {
    let count = props.get_int("rows").unwrap_or_default().max(0) as usize;
    let (revision, _) = use_state(0usize);
    Ok(Some(rows(count, revision)))
}

struct Fixture {
    root: RenderRoot<MemoryHost>,
    container: NodeHandle,
}

impl Fixture {
    fn new() -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        Self {
            root: RenderRoot::new(host, std::sync::Arc::new(DefaultScheduler)),
            container,
        }
    }

    fn render(&self, element: Element) -> usize {
        self.root.render(element, self.container);
        self.root.drain_tasks()
    }
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("mount");
    for &count in ROW_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let fixture = Fixture::new();
                black_box(fixture.render(rows(count, 0)));
            });
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    for &count in ROW_COUNT_SAMPLES {
        let fixture = Fixture::new();
        fixture.render(rows(count, 0));
        let mut revision = 0;
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                revision += 1;
                black_box(fixture.render(rows(count, revision)));
            });
        });
    }
    group.finish();
}

fn bench_idle_rerender(c: &mut Criterion) {
    let fixture = Fixture::new();
    let element = Element::component(TICKER).attr("rows", 64);
    fixture.render(element.clone());
    c.bench_function("rerender_unchanged_component", |b| {
        b.iter(|| black_box(fixture.render(element.clone())));
    });
}

fn bench_time_sliced(c: &mut Criterion) {
    c.bench_function("mount_time_sliced_256", |b| {
        b.iter(|| {
            let mut host = MemoryHost::new();
            let container = host.create_container("root");
            let root = RenderRoot::with_options(
                host,
                std::sync::Arc::new(DefaultScheduler),
                Default::default(),
                Box::new(UnitBudget::new(32)),
            );
            root.render(rows(256, 0), container);
            black_box(root.drain_tasks());
        });
    });
}

criterion_group!(
    benches,
    bench_mount,
    bench_update,
    bench_idle_rerender,
    bench_time_sliced
);
criterion_main!(benches);
