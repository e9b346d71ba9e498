//! Tree growth benchmarks: exhaustive search, two-class fallback, threads.

mod common;

use common::criterion_config::default_criterion;

use statetie::data::DensityMerger;
use statetie::testing::{random_corpus, random_questions};
use statetie::training::{
    ClusterConfig, GainParams, Metric, QuestionStrategy, TreeGrower, TwoClassParams,
    TwoClassSplitter,
};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_grow(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow");
    for &n_states in &[200usize, 1_000] {
        let corpus = random_corpus(n_states, 2, 32, 24, 42);
        let questions = random_questions(24, 60, 7);
        group.throughput(Throughput::Elements(n_states as u64));

        for (name, strategy) in [
            ("auto", QuestionStrategy::Auto),
            ("two_class", QuestionStrategy::TwoClassOnly),
        ] {
            let mut config = ClusterConfig::builder()
                .gain(GainParams { min_gain: 1.0, min_leaf_size: 2, ..Default::default() })
                .build()
                .unwrap();
            config.search.strategy = strategy;
            let grower = TreeGrower::new(&corpus, &questions, config).unwrap();
            group.bench_with_input(BenchmarkId::new(name, n_states), &grower, |b, g| {
                b.iter(|| black_box(g.grow().unwrap()))
            });
        }
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let corpus = random_corpus(1_000, 2, 32, 24, 42);
    let questions = random_questions(24, 60, 7);
    let mut group = c.benchmark_group("grow/thread_scaling");
    for &n_threads in &[1usize, 2, 4] {
        let config = ClusterConfig::builder().n_threads(n_threads).build().unwrap();
        let grower = TreeGrower::new(&corpus, &questions, config).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n_threads), &grower, |b, g| {
            b.iter(|| black_box(g.grow().unwrap()))
        });
    }
    group.finish();
}

fn bench_two_class_split(c: &mut Criterion) {
    let corpus = random_corpus(500, 2, 32, 24, 11);
    let config = ClusterConfig::default();
    let metric = Metric::from_config(&config, corpus.n_streams());
    let merger = DensityMerger::new(&corpus);
    let items: Vec<_> = (0..corpus.len() as u32).map(|r| merger.state_density(r)).collect();
    let params = TwoClassParams::default();

    c.bench_function("two_class/500", |b| {
        b.iter(|| black_box(TwoClassSplitter::new(&metric, &params).split(black_box(&items))))
    });
}

criterion_group! {
    name = benches;
    config = default_criterion();
    targets = bench_grow, bench_thread_scaling, bench_two_class_split
}
criterion_main!(benches);
