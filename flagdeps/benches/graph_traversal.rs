use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use flagdeps::graph::{FlagGraph, Traversal};
use flagdeps::prelude::*;

// =============================================================================
// Graph Builders
// =============================================================================

/// A layered DAG: every flag in layer `n` depends on every flag in layer
/// `n - 1`. Returns the graph, the first-layer ids and the last-layer ids.
fn layered(width: usize, depth: usize) -> (FlagGraph, Vec<FlagId>, Vec<FlagId>) {
    let traversal = Traversal::unbounded();
    let mut graph = FlagGraph::new();
    let mut previous: Vec<FlagId> = Vec::new();
    let mut first = Vec::new();

    for layer in 0..depth {
        let mut current = Vec::with_capacity(width);
        for i in 0..width {
            let flag = graph.add_flag(&format!("l{}_{}", layer, i), true).unwrap();
            for source in &previous {
                graph
                    .add_dependency(flag.id(), *source, None, &traversal)
                    .unwrap();
            }
            current.push(flag.id());
        }
        if layer == 0 {
            first = current.clone();
        }
        previous = current;
    }

    (graph, first, previous)
}

/// A single chain `c0 <- c1 <- ... <- c{len-1}`.
fn chain(len: usize) -> (FlagGraph, Vec<FlagId>) {
    let traversal = Traversal::unbounded();
    let mut graph = FlagGraph::new();
    let mut ids = Vec::with_capacity(len);
    for i in 0..len {
        let flag = graph.add_flag(&format!("c{}", i), true).unwrap();
        if let Some(previous) = ids.last() {
            graph
                .add_dependency(flag.id(), *previous, None, &traversal)
                .unwrap();
        }
        ids.push(flag.id());
    }
    (graph, ids)
}

// =============================================================================
// Graph Benchmarks
// =============================================================================

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");

    for (width, depth) in [(4, 8), (8, 16), (16, 16)] {
        let (graph, _, leaves) = layered(width, depth);
        let leaf = leaves[0];
        group.bench_with_input(
            BenchmarkId::new("is_active_layered", format!("{}x{}", width, depth)),
            &leaf,
            |b, leaf| {
                b.iter(|| black_box(graph.is_active(*leaf, &Traversal::unbounded()).unwrap()))
            },
        );
    }

    let (graph, ids) = chain(1_000);
    let tail = ids[ids.len() - 1];
    group.bench_function("is_active_chain_1000", |b| {
        b.iter(|| black_box(graph.is_active(tail, &Traversal::unbounded()).unwrap()))
    });

    group.finish();
}

fn bench_cycle_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_check");

    // Closing the chain into a loop explores every node before failing.
    let (graph, ids) = chain(1_000);
    let head = ids[0];
    let tail = ids[ids.len() - 1];
    group.bench_function("rejected_chain_1000", |b| {
        b.iter_batched(
            || graph.clone(),
            |mut graph| {
                let result = graph.add_dependency(head, tail, None, &Traversal::unbounded());
                black_box(result.is_err())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("cascade");

    for (width, depth) in [(4, 8), (8, 16)] {
        let (graph, roots, _) = layered(width, depth);
        let root = roots[0];
        group.bench_with_input(
            BenchmarkId::new("disable_root_layered", format!("{}x{}", width, depth)),
            &root,
            |b, root| {
                b.iter_batched(
                    || graph.clone(),
                    |mut graph| black_box(graph.disable(*root, &Traversal::unbounded()).unwrap()),
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

// =============================================================================
// Engine Benchmarks
// =============================================================================

fn bench_engine(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("engine");

    let engine = rt.block_on(async {
        let engine = Engine::open(
            Arc::new(InMemoryFlagStore::new()),
            Arc::new(InMemoryEventLog::new()),
            EngineConfig::default(),
        )
        .await
        .unwrap();
        engine.create_flag("root", true, None).await.unwrap();
        let mut previous = "root".to_string();
        for i in 0..50 {
            let title = format!("f{}", i);
            engine
                .create_flag_with_dependencies(&title, true, &[previous.as_str()], None)
                .await
                .unwrap();
            previous = title;
        }
        engine
    });

    group.bench_function("toggle_root_off_and_on_chain_50", |b| {
        b.iter(|| {
            rt.block_on(async {
                let root = engine.get_flag_by_title("root").await.unwrap().flag.id();
                let off = engine.set_enabled(root, false, None, None).await;
                let on = engine.set_enabled(root, true, None, None).await;
                black_box((off.is_ok(), on.is_ok()))
            })
        })
    });

    group.bench_function("list_flags_51", |b| {
        b.iter(|| rt.block_on(async { black_box(engine.list_flags().await.unwrap().len()) }))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_evaluation,
    bench_cycle_check,
    bench_cascade,
    bench_engine
);
criterion_main!(benches);
