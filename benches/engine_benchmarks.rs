//! Throughput benchmarks for the merge and iteration engines

use blockflow::iteration::{BatchOptions, IterationMode};
use blockflow::merge::{MergeMode, ObjectStrategy};
use blockflow::{IterationConfig, IterationEngine, MergeConfig, MergeEngine};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};
use std::hint::black_box;

fn array_inputs(size: usize) -> Map<String, Value> {
    let mut inputs = Map::new();
    for name in ["input1", "input2", "input3"] {
        let items: Vec<Value> = (0..size)
            .map(|i| json!({"id": i % (size / 2 + 1), "name": format!("{name}-{i}")}))
            .collect();
        inputs.insert(name.to_string(), Value::Array(items));
    }
    inputs
}

fn object_inputs(size: usize) -> Map<String, Value> {
    let mut inputs = Map::new();
    for n in 0..3 {
        let fields: Map<String, Value> = (0..size)
            .map(|i| (format!("key{i}"), json!({"nested": {"value": i + n, "source": n}})))
            .collect();
        inputs.insert(format!("input{n}"), Value::Object(fields));
    }
    inputs
}

fn bench_merge(c: &mut Criterion) {
    let engine = MergeEngine::default();
    let mut group = c.benchmark_group("merge");

    for size in [10, 100, 1000] {
        let arrays = array_inputs(size);
        let mut concat = MergeConfig {
            mode: MergeMode::Concat,
            ..MergeConfig::default()
        };
        concat.array_options.remove_duplicates = true;
        concat.array_options.identifier_field = Some("id".to_string());
        concat.array_options.sort = true;
        concat.array_options.sort_field = Some("id".to_string());

        group.bench_with_input(BenchmarkId::new("concat_dedupe_sort", size), &arrays, |b, inputs| {
            b.iter(|| black_box(engine.merge(inputs, &concat)))
        });

        let union = MergeConfig {
            mode: MergeMode::Union,
            ..MergeConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("union", size), &arrays, |b, inputs| {
            b.iter(|| black_box(engine.merge(inputs, &union)))
        });

        let objects = object_inputs(size);
        let deep = MergeConfig {
            mode: MergeMode::Merge,
            object_strategy: ObjectStrategy::Deep,
            collect_stats: true,
            ..MergeConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("deep_merge", size), &objects, |b, inputs| {
            b.iter(|| black_box(engine.merge(inputs, &deep)))
        });
    }

    group.finish();
}

fn bench_iteration(c: &mut Criterion) {
    let engine = IterationEngine::default();
    let mut group = c.benchmark_group("iteration");

    for size in [10, 100, 1000] {
        let collection = json!((0..size).collect::<Vec<_>>());

        let sequential = IterationConfig::default();
        group.bench_with_input(BenchmarkId::new("sequential_step", size), &collection, |b, items| {
            b.iter(|| black_box(engine.advance(items, &sequential, size / 2, Vec::new())))
        });

        let parallel = IterationConfig {
            mode: IterationMode::Parallel,
            accumulate_results: true,
            item_transform: Some("item * 2".to_string()),
            ..IterationConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("parallel_transform", size), &collection, |b, items| {
            b.iter(|| black_box(engine.advance(items, &parallel, 0, Vec::new())))
        });

        let batch = IterationConfig {
            mode: IterationMode::Batch,
            batch_options: Some(BatchOptions {
                size: 25,
                ..BatchOptions::default()
            }),
            ..IterationConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("batch_slice", size), &collection, |b, items| {
            b.iter(|| black_box(engine.advance(items, &batch, 0, Vec::new())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge, bench_iteration);
criterion_main!(benches);
