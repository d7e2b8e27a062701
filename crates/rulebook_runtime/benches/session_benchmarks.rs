//! Benchmarks for Rulebook sessions and the firing loop.
//!
//! Run with: `cargo bench --package rulebook_runtime --bench session_benchmarks`

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use rulebook_engine::{BuildMode, KnowledgeBase, KnowledgeBuilder};
use rulebook_foundation::Value;
use rulebook_language::RuleSource;
use rulebook_runtime::Session;

// =============================================================================
// Helper Functions
// =============================================================================

const COUNTER: &str = "\
package bench;
declare Counter
  count : int
end
rule \"Step\"
when
  $c : Counter(count < 1000)
then
  modify($c) { setCount($c.getCount() + 1) };
end
";

/// Ten chained patterns over the built-in `Integer` type, fed by a
/// pattern-less rule.
fn chain_source() -> String {
    let mut text = String::from("package bench;\nrule \"Seed\"\nwhen\nthen\n");
    for i in 1..=10 {
        text.push_str(&format!("  insert({i});\n"));
    }
    text.push_str("end\nrule \"Chain\"\nwhen\n");
    for i in 1..=10 {
        text.push_str(&format!("  $i{i} : Integer(this == {i})\n"));
    }
    text.push_str("then\n  System.out.println(\"chain\");\nend\n");
    text
}

fn build(mode: BuildMode, text: &str) -> Arc<KnowledgeBase> {
    Arc::new(
        KnowledgeBuilder::new()
            .with_mode(mode)
            .with_source(RuleSource::new("bench.drl", text))
            .build()
            .unwrap(),
    )
}

// =============================================================================
// Session Benchmarks
// =============================================================================

fn bench_firing(c: &mut Criterion) {
    let mut group = c.benchmark_group("firing");
    group.sample_size(30);

    for mode in [BuildMode::Interpreted, BuildMode::Compiled] {
        let kb = build(mode, COUNTER);
        group.bench_with_input(BenchmarkId::new("counter_1000", mode), &kb, |b, kb| {
            b.iter(|| {
                let mut session = Session::new(kb.clone());
                let counter = session.instantiate("Counter", vec![Value::Int(0)]).unwrap();
                session.insert(counter).unwrap();
                black_box(session.fire_all_rules().unwrap())
            });
        });

        let kb = build(mode, &chain_source());
        group.bench_with_input(BenchmarkId::new("chain_10", mode), &kb, |b, kb| {
            b.iter(|| {
                let mut session = Session::new(kb.clone());
                black_box(session.fire_all_rules().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_firing);
criterion_main!(benches);
