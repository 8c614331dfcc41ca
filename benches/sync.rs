use criterion::{Criterion, black_box, criterion_group, criterion_main};
use part_mvc::{
    BendConnectionOperation, Bounds, HeadlessToolkit, LeafPartFactory, OperationHistory, PartKind,
    Point, PositionStrategy, StraightRouter, Viewer,
};

const CONTENT_COUNT: u32 = 1_000;

fn build_viewer() -> Viewer<u32, HeadlessToolkit> {
    let mut viewer = Viewer::new(HeadlessToolkit::new(), LeafPartFactory);
    viewer.activate().expect("activate");
    viewer
}

fn sync_initial_population(c: &mut Criterion) {
    let contents: Vec<u32> = (0..CONTENT_COUNT).collect();
    c.bench_function("sync_initial_population", |b| {
        b.iter(|| {
            let mut viewer = build_viewer();
            viewer
                .set_contents(black_box(contents.clone()))
                .expect("sync");
        });
    });
}

fn sync_reverse_and_replace(c: &mut Criterion) {
    let forward: Vec<u32> = (0..CONTENT_COUNT).collect();
    let mut shuffled: Vec<u32> = forward.iter().rev().copied().collect();
    for slot in shuffled.iter_mut().step_by(10) {
        *slot += CONTENT_COUNT;
    }

    let mut viewer = build_viewer();
    viewer.set_contents(forward.clone()).expect("sync");
    c.bench_function("sync_reverse_and_replace", |b| {
        b.iter(|| {
            viewer
                .set_contents(black_box(shuffled.clone()))
                .expect("sync");
            viewer.set_contents(black_box(forward.clone())).expect("sync");
        });
    });
}

fn bend_execute_undo(c: &mut Criterion) {
    let mut viewer = build_viewer();
    let owner = viewer.create_part(PartKind::Feedback).expect("part");
    let source = viewer.create_part(PartKind::Feedback).expect("part");
    let target = viewer.create_part(PartKind::Feedback).expect("part");

    let layer = viewer.connections_mut();
    let start = layer.anchors_mut().dynamic_anchor(
        source,
        Bounds::new(0.0, 0.0, 10.0, 10.0),
        PositionStrategy::ChopBox,
    );
    let waypoints: Vec<_> = (1..=8)
        .map(|i| {
            layer
                .anchors_mut()
                .static_anchor(Point::new(20.0 * i as f64, 5.0 * (i % 3) as f64))
        })
        .collect();
    let end = layer.anchors_mut().dynamic_anchor(
        target,
        Bounds::new(200.0, 0.0, 10.0, 10.0),
        PositionStrategy::ChopBox,
    );
    let mut anchors = vec![start];
    anchors.extend(&waypoints);
    anchors.push(end);
    let id = layer
        .add_connection(owner, anchors, StraightRouter::new())
        .expect("connection");

    let mut history = OperationHistory::new();
    c.bench_function("bend_execute_undo", |b| {
        b.iter(|| {
            let mut op = BendConnectionOperation::new(viewer.connections_mut(), id).expect("bend");
            op.set_new_anchors(viewer.connections_mut(), &[start, waypoints[4], end])
                .expect("anchors");
            history.execute(op, &mut viewer).expect("execute");
            history.undo(&mut viewer).expect("undo");
        });
    });
    history.clear(&mut viewer);
}

criterion_group!(
    benches,
    sync_initial_population,
    sync_reverse_and_replace,
    bend_execute_undo
);
criterion_main!(benches);
