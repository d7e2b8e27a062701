//! Benchmarks for the Rulebook engine layer.
//!
//! Run with: `cargo bench --package rulebook_engine`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use rulebook_engine::{Agenda, BuildMode, KnowledgeBase, KnowledgeBuilder, NetworkMemory, Propagator};
use rulebook_foundation::{FactType, FieldType, Object, Value};
use rulebook_language::{PackageDescr, PatternDescr, RuleDescr};
use rulebook_storage::FactStore;

// =============================================================================
// Helper Functions
// =============================================================================

fn person_type() -> FactType {
    FactType::new("bench.Person")
        .with_field("name", FieldType::String)
        .with_field("age", FieldType::Int)
        .with_field("team", FieldType::Int)
}

fn person(i: usize) -> Value {
    Object::new("bench.Person")
        .with("name", format!("p{i}"))
        .with("age", i64::try_from(i % 90).unwrap_or_default())
        .with("team", i64::try_from(i % 10).unwrap_or_default())
        .into()
}

/// A package whose rules join `depth` people of the same team.
fn team_package(depth: usize) -> PackageDescr {
    let mut rule = RuleDescr::new("Team")
        .with_pattern(PatternDescr::new("Person").bind("$p0").with_constraint("age > 20"));
    for i in 1..depth {
        rule = rule.with_pattern(
            PatternDescr::new("Person")
                .bind(format!("$p{i}"))
                .with_constraint("team == $p0.team")
                .with_constraint(format!("age > $p{}.age", i - 1)),
        );
    }
    PackageDescr::new("bench")
        .with_rule(rule.then("update($p0);"))
        .with_rule(
            RuleDescr::new("Adult")
                .with_pattern(PatternDescr::new("Person").with_constraint("age >= 18"))
                .then("System.out.println(\"adult\");"),
        )
}

fn build(mode: BuildMode, depth: usize) -> KnowledgeBase {
    KnowledgeBuilder::new()
        .with_mode(mode)
        .with_type(person_type())
        .with_package(team_package(depth))
        .build()
        .unwrap()
}

fn insert_all(kb: &KnowledgeBase, count: usize) -> (FactStore, NetworkMemory, Agenda) {
    let mut store = FactStore::new();
    let mut memory = NetworkMemory::new(kb.network());
    let mut agenda = Agenda::new();
    Propagator::new(kb.network(), &mut memory, &mut agenda, &store, kb.registry()).seed();
    for i in 0..count {
        let (_, delta) = store.insert(person(i));
        Propagator::new(kb.network(), &mut memory, &mut agenda, &store, kb.registry())
            .apply(&delta)
            .unwrap();
    }
    (store, memory, agenda)
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for mode in [BuildMode::Interpreted, BuildMode::Compiled] {
        group.bench_with_input(BenchmarkId::new("depth_4", mode), &mode, |b, &mode| {
            b.iter(|| black_box(build(mode, 4)));
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for mode in [BuildMode::Interpreted, BuildMode::Compiled] {
        let kb = build(mode, 3);
        for count in [100usize, 500] {
            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(
                BenchmarkId::new(mode.to_string(), count),
                &count,
                |b, &count| {
                    b.iter(|| black_box(insert_all(&kb, count).2.len()));
                },
            );
        }
    }

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    group.sample_size(50);

    for mode in [BuildMode::Interpreted, BuildMode::Compiled] {
        let kb = build(mode, 2);
        let (store, memory, agenda) = insert_all(&kb, 300);
        group.throughput(Throughput::Elements(100));
        group.bench_function(mode.to_string(), |b| {
            b.iter_batched(
                || (store.clone(), memory.clone(), agenda.clone()),
                |(mut store, mut memory, mut agenda)| {
                    for i in 0..100 {
                        let handles: Vec<_> = store.iter().map(|(h, _)| h).take(1).collect();
                        for handle in handles {
                            let delta = store.retract(handle).unwrap();
                            Propagator::new(kb.network(), &mut memory, &mut agenda, &store, kb.registry())
                                .apply(&delta)
                                .unwrap();
                        }
                        let (_, delta) = store.insert(person(1000 + i));
                        Propagator::new(kb.network(), &mut memory, &mut agenda, &store, kb.registry())
                            .apply(&delta)
                            .unwrap();
                    }
                    black_box(agenda.len())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_insert, bench_churn);
criterion_main!(benches);
