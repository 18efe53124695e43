use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use trellis_core::{
    push_context, ComponentTree, ContextGuard, MapRequest, NodeId, Pipeline, Repeater,
    SessionContext,
};
use trellis_widgets::{CheckBox, Container, NumberField, Text, TextField};

const ROW_COUNT: usize = 64;
const ROW_COUNT_SAMPLES: &[usize] = &[16, 64, 256, 1024];

fn build_tree(rows: usize) -> (ComponentTree, NodeId, Vec<serde_json::Value>) {
    let mut tree = ComponentTree::new(Container::new());
    let header = tree
        .add_named_child(0, "header", Container::naming())
        .expect("header");
    tree.add_named_child(header, "title", TextField::new().mandatory())
        .expect("title");
    tree.add_named_child(header, "count", NumberField::new())
        .expect("count");
    let lines = tree
        .add_named_child(0, "lines", Repeater::keyed_by("id"))
        .expect("lines");
    tree.add_named_child(lines, "label", Text::bound_to("label"))
        .expect("label");
    tree.add_named_child(lines, "qty", NumberField::new().bound_to("qty").mandatory())
        .expect("qty");
    tree.add_named_child(lines, "done", CheckBox::new())
        .expect("done");
    tree.lock();

    let beans = (0..rows)
        .map(|row| json!({"id": row, "label": format!("Line {row}"), "qty": row}))
        .collect();
    (tree, lines, beans)
}

struct SessionFixture {
    tree: ComponentTree,
    pipeline: Pipeline,
    _guard: ContextGuard,
    lines: NodeId,
    beans: Vec<serde_json::Value>,
    request: MapRequest,
}

impl SessionFixture {
    fn new(rows: usize) -> Self {
        let (tree, lines, beans) = build_tree(rows);
        let guard = push_context(SessionContext::new("bench"));
        tree.repeater(lines)
            .expect("repeater")
            .set_bean_list(beans.clone())
            .expect("bind rows");
        let mut request = MapRequest::new().with("header-title", "Order");
        for row in (0..rows).step_by(2) {
            request = request
                .with(format!("lines-r{row}-qty"), (row + 1).to_string())
                .with(format!("lines-r{row}-done-h"), "");
        }
        Self {
            tree,
            pipeline: Pipeline::default(),
            _guard: guard,
            lines,
            beans,
            request,
        }
    }

    fn cycle(&self) -> usize {
        let outcome = self
            .pipeline
            .handle_request(&self.tree, &self.request)
            .expect("request");
        let diagnostics = self.pipeline.validate(&self.tree).expect("validate");
        outcome.len() + diagnostics.len()
    }
}

fn bench_request_cycle(c: &mut Criterion) {
    let fixture = SessionFixture::new(ROW_COUNT);
    fixture.cycle();

    c.bench_function("pipeline_request_validate", |b| {
        b.iter(|| black_box(fixture.cycle()));
    });
}

fn bench_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_rows");
    for &rows in ROW_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            let fixture = SessionFixture::new(rows);
            fixture.cycle();
            b.iter(|| black_box(fixture.cycle()));
        });
    }
    group.finish();
}

fn bench_rebind(c: &mut Criterion) {
    let fixture = SessionFixture::new(ROW_COUNT);
    let repeater = fixture.tree.repeater(fixture.lines).expect("repeater");
    let beans = fixture.beans.clone();
    let mut reversed = beans.clone();
    reversed.reverse();

    c.bench_function("pipeline_rebind_reordered", |b| {
        b.iter(|| {
            repeater.set_bean_list(reversed.clone()).expect("reverse");
            repeater.set_bean_list(beans.clone()).expect("restore");
            black_box(repeater.row_count().expect("rows"))
        });
    });
}

fn bench_paint(c: &mut Criterion) {
    let fixture = SessionFixture::new(ROW_COUNT);
    c.bench_function("pipeline_prepare_paint", |b| {
        b.iter(|| black_box(fixture.pipeline.prepare_paint(&fixture.tree).expect("paint")));
    });
}

criterion_group!(
    pipeline,
    bench_request_cycle,
    bench_rows,
    bench_rebind,
    bench_paint
);
criterion_main!(pipeline);
