//! Interpreted and compiled knowledge bases must be indistinguishable.

use proptest::prelude::*;
use rulebook_engine::BuildMode;
use rulebook_foundation::FactHandle;
use rulebook_runtime::{EventRecorder, SessionConfig};

use crate::{person, session_with};

const RULES: &str = "package org.test\n\
    rule Adult salience 10\n\
    when $p : Person( age >= 18 )\n\
    then System.out.println(\"adult \" + $p.name);\n\
    end\n\
    rule Namesakes\n\
    when $a : Person( $n : name ) $b : Person( name == $n, age > $a.age )\n\
    then System.out.println($n + \" \" + $a.age + \"<\" + $b.age);\n\
    end\n\
    rule GrowUp no-loop\n\
    when $p : Person( age < 18, name == \"kid\" )\n\
    then modify($p) { setAge($p.age + 1) }\n\
    end\n\
    rule Claim salience -5\n\
    when $i : Integer( this > 2 ) $p : Person( age == $i )\n\
    then retract($i);\n\
    insert(\"claimed \" + $p.name);\n\
    end\n";

#[derive(Clone, Debug)]
enum Op {
    InsertPerson(&'static str, i64),
    InsertInt(i64),
    SetAge(usize, i64),
    Retract(usize),
    Fire,
    FireSome(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let name = prop::sample::select(vec!["kid", "Ann", "Bob"]);
    prop_oneof![
        (name, 0i64..40).prop_map(|(n, a)| Op::InsertPerson(n, a)),
        (0i64..40).prop_map(Op::InsertInt),
        (0usize..8, 0i64..40).prop_map(|(h, a)| Op::SetAge(h, a)),
        (0usize..8).prop_map(Op::Retract),
        Just(Op::Fire),
        (1usize..4).prop_map(Op::FireSome),
    ]
}

/// Runs the operations and renders everything observable.
fn run(mode: BuildMode, ops: &[Op]) -> Vec<String> {
    let config = SessionConfig::new().with_max_firings(200);
    let mut session = session_with(mode, RULES, config);
    let recorder = EventRecorder::new();
    session.add_listener(recorder.clone());

    let mut results = Vec::new();
    for op in ops {
        let result = match op {
            Op::InsertPerson(name, age) => session.insert(person(name, *age)).map(|h| h.to_string()),
            Op::InsertInt(n) => session.insert(*n).map(|h| h.to_string()),
            Op::SetAge(h, age) => {
                let handle = FactHandle::new(*h as u64 + 1);
                let name = session
                    .get_object(handle)
                    .and_then(|v| v.field("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("kid")
                    .to_string();
                session.update(handle, person(&name, *age)).map(|()| String::new())
            }
            Op::Retract(h) => session
                .retract(FactHandle::new(*h as u64 + 1))
                .map(|()| String::new()),
            Op::Fire => session.fire_all_rules().map(|n| n.to_string()),
            Op::FireSome(n) => session.fire_until_limit(*n).map(|n| n.to_string()),
        };
        results.push(match result {
            Ok(text) => text,
            Err(err) => format!("error: {err}"),
        });
    }

    let mut observed = recorder.lines();
    observed.extend(results);
    observed.extend(session.output().iter().cloned());
    observed.extend(session.snapshot().iter().map(|(h, v)| format!("{h} {v}")));
    observed.extend(session.agenda().iter().map(ToString::to_string));
    observed
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn both_modes_observe_the_same_run(ops in prop::collection::vec(op(), 1..24)) {
        let interpreted = run(BuildMode::Interpreted, &ops);
        let compiled = run(BuildMode::Compiled, &ops);
        prop_assert_eq!(interpreted, compiled);
    }
}

#[test]
fn fixed_scenario_matches() {
    let ops = vec![
        Op::InsertPerson("kid", 15),
        Op::InsertPerson("Ann", 20),
        Op::InsertPerson("Ann", 30),
        Op::InsertInt(20),
        Op::Fire,
        Op::SetAge(1, 40),
        Op::Retract(0),
        Op::Fire,
    ];
    let interpreted = run(BuildMode::Interpreted, &ops);
    assert_eq!(interpreted, run(BuildMode::Compiled, &ops));
    assert!(interpreted.iter().any(|line| line == "adult Ann"));
    assert!(interpreted.iter().any(|line| line == "Ann 20<30"));
    assert!(interpreted.iter().any(|line| line.starts_with("insert #5 claimed Ann")));
}
