//! Working memory lifecycle: retraction, cancellation, ordering, and limits.

use rulebook_foundation::{ErrorKind, FactHandle, Object, PropertyMask, Value};
use rulebook_runtime::{EventRecorder, SessionConfig};

use crate::{MODES, person, session, session_with, strings};

const JOIN: &str = "package org.test\n\
    rule Pair when $p : Person( age >= 18 ) $i : Integer( this == $p.age ) then\n\
    insert(\"pair \" + $p.name);\n\
    end\n";

#[test]
fn insert_then_retract_leaves_no_trace() {
    for mode in MODES {
        let mut session = session(mode, JOIN);
        let before = session.memory_stats();
        let p = session.insert(person("Ann", 30)).unwrap();
        let i = session.insert(30).unwrap();
        assert_eq!(session.agenda_len(), 1);
        assert_ne!(session.memory_stats(), before);

        session.retract(i).unwrap();
        session.retract(p).unwrap();
        assert_eq!(session.memory_stats(), before, "{mode}");
        assert_eq!(session.fact_count(), 0);
        assert_eq!(session.agenda_len(), 0);
        assert_eq!(session.cancelled_count(), 1);
        assert_eq!(session.fire_all_rules().unwrap(), 0);
    }
}

#[test]
fn empty_session_has_empty_memories() {
    let session = session(MODES[0], JOIN);
    let stats = session.memory_stats();
    assert_eq!(stats.alpha_facts, 0);
    assert_eq!(stats.indexed, 0);
}

#[test]
fn update_out_of_a_match_cancels() {
    for mode in MODES {
        let mut session = session(mode, JOIN);
        let p = session.insert(person("Ann", 30)).unwrap();
        session.insert(30).unwrap();
        session.update(p, person("Ann", 31)).unwrap();
        assert_eq!(session.agenda_len(), 0, "{mode}");
        session.update(p, person("Ann", 30)).unwrap();
        assert_eq!(session.agenda_len(), 1);
        assert_eq!(session.fire_all_rules().unwrap(), 1);
        assert_eq!(strings(&session), vec!["pair Ann"]);
    }
}

const ADULT: &str = "package org.test\n\
    rule Adult when $p : Person( age > 18 ) then\n\
    System.out.println(\"P \" + $p.name);\n\
    end\n";

#[test]
fn updates_reactivate_like_retract_and_insert() {
    for mode in MODES {
        let mut session = session(mode, ADULT);
        let ann = session.insert(person("Ann", 30)).unwrap();
        assert_eq!(session.fire_all_rules().unwrap(), 1);
        session.update(ann, person("Anna", 30)).unwrap();
        assert_eq!(session.agenda_len(), 1, "{mode}");
        session.fire_all_rules().unwrap();
        assert_eq!(session.output(), &["P Ann".to_string(), "P Anna".to_string()]);
    }
}

#[test]
fn updated_matches_queue_behind_newer_ones() {
    for mode in MODES {
        let mut session = session(mode, ADULT);
        let a = session.insert(person("A", 30)).unwrap();
        session.insert(person("B", 30)).unwrap();
        session.update(a, person("A2", 30)).unwrap();
        assert_eq!(session.cancelled_count(), 1, "{mode}");
        session.fire_all_rules().unwrap();
        assert_eq!(session.output(), &["P B".to_string(), "P A2".to_string()]);
        assert_eq!(session.fact_handles(), vec![a, FactHandle::new(2)]);
    }
}

#[test]
fn field_updates_skip_unwatched_patterns() {
    for mode in MODES {
        let mut session = session(mode, ADULT);
        let ann = session.insert(person("Ann", 30)).unwrap();
        session.fire_all_rules().unwrap();
        session
            .update_fields(ann, person("Anna", 30), PropertyMask::of(["name"]))
            .unwrap();
        assert_eq!(session.agenda_len(), 0, "{mode}");
        session
            .update_fields(ann, person("Anna", 31), PropertyMask::of(["age"]))
            .unwrap();
        assert_eq!(session.agenda_len(), 1);
    }
}

#[test]
fn indexed_joins_agree_with_numeric_equality() {
    let rules = "package org.test\n\
        rule Indexed when $i : Integer() Double( this == $i ) then\n\
        System.out.println(\"indexed\");\n\
        end\n\
        rule Tested when $i : Integer() Double( !(this != $i) ) then\n\
        System.out.println(\"tested\");\n\
        end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        session.insert(10_000_000_000_000_000_i64).unwrap();
        session.insert(1.0e16).unwrap();
        session.insert(-0.0).unwrap();
        session.insert(0).unwrap();
        session.fire_all_rules().unwrap();
        let mut output = session.output().to_vec();
        output.sort();
        assert_eq!(output, vec!["indexed", "indexed", "tested", "tested"], "{mode}");
    }
}

#[test]
fn consequences_retract_other_matches() {
    let rules = "package org.test\n\
        rule Claim salience 5 when $s : String() $p : Person() then retract($s); end\n\
        rule Greet when $s : String() then System.out.println($s); end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        session.insert("ticket").unwrap();
        session.insert(person("Ann", 30)).unwrap();
        assert_eq!(session.agenda_len(), 2);
        assert_eq!(session.fire_all_rules().unwrap(), 1, "{mode}");
        assert!(session.output().is_empty());
        assert!(strings(&session).is_empty());
    }
}

#[test]
fn salience_then_recency_orders_the_agenda() {
    let rules = "package org.test\n\
        rule Low salience -1 when Integer() then System.out.println(\"low\"); end\n\
        rule High salience 10 when Integer() then System.out.println(\"high\"); end\n\
        rule Plain when Integer() then System.out.println(\"plain\"); end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        session.insert(1).unwrap();
        let queued: Vec<_> = session.agenda().iter().map(ToString::to_string).collect();
        assert_eq!(queued, vec!["High[#1]", "Plain[#1]", "Low[#1]"]);
        session.fire_all_rules().unwrap();
        assert_eq!(session.output(), ["high", "plain", "low"], "{mode}");
    }
}

const RUNAWAY: &str = "package org.test\n\
    rule Spin when $c : Counter() then modify($c) { setCount($c.count + 1) } end\n";

#[test]
fn runaway_rules_hit_the_firing_limit() {
    for mode in MODES {
        let config = SessionConfig::new()
            .with_max_firings(50)
            .with_property_reactive(false);
        let mut session = session_with(mode, RUNAWAY, config);
        let c = session
            .insert(Object::new("org.test.Counter").with("count", 0))
            .unwrap();
        let err = session.fire_all_rules().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MaxFiringsExceeded { limit: 50 }), "{mode}");
        assert_eq!(session.get_object(c).and_then(|v| v.field("count")), Some(&Value::Int(50)));
        assert_eq!(session.agenda_len(), 1);
    }
}

#[test]
fn property_reactivity_stops_self_modification() {
    for mode in MODES {
        let config = SessionConfig::new().with_max_firings(50);
        let mut session = session_with(mode, RUNAWAY, config);
        session
            .insert(Object::new("org.test.Counter").with("count", 0))
            .unwrap();
        assert_eq!(session.fire_all_rules().unwrap(), 1, "{mode}");
    }
}

#[test]
fn no_loop_suppresses_self_activation() {
    let rules = "package org.test\n\
        rule Spin no-loop when $c : Counter( count >= 0 ) then modify($c) { setCount($c.count + 1) } end\n";
    for mode in MODES {
        let config = SessionConfig::new().with_max_firings(50);
        let mut session = session_with(mode, rules, config);
        session
            .insert(Object::new("org.test.Counter").with("count", 0))
            .unwrap();
        assert_eq!(session.fire_all_rules().unwrap(), 1, "{mode}");
    }
}

#[test]
fn consequence_failures_name_the_rule() {
    let rules = "package org.test\n\
        rule Divide when $i : Integer() then insert(10 / $i); end\n";
    for mode in MODES {
        let mut session = session(mode, rules);
        session.insert(0).unwrap();
        let err = session.fire_all_rules().unwrap_err();
        let ErrorKind::ConsequenceExecution { rule, .. } = &err.kind else {
            panic!("{mode}: expected consequence error, got {err}");
        };
        assert_eq!(rule, "Divide");
        assert!(err.to_string().contains("division by zero"));
        let context = err.context.as_ref().expect("consequence errors are located");
        assert_eq!(context.source.as_deref(), Some("test.drl"));
        assert_eq!((context.line, context.column), (Some(2), Some(1)));
        assert!(err.to_string().ends_with("(at test.drl:2:1)"), "{err}");
    }
}

#[test]
fn stale_handles_are_rejected() {
    let mut session = session(MODES[1], JOIN);
    let h = session.insert(1).unwrap();
    session.retract(h).unwrap();
    assert!(matches!(
        session.retract(h).unwrap_err().kind,
        ErrorKind::UnknownHandle(_)
    ));
    assert!(session.update(FactHandle::new(77), 2).is_err());
}

#[test]
fn listeners_see_the_whole_story() {
    let recorder = EventRecorder::new();
    let mut session = session(MODES[0], JOIN);
    session.add_listener(recorder.clone());
    let p = session.insert(person("Ann", 30)).unwrap();
    session.insert(30).unwrap();
    session.fire_all_rules().unwrap();
    session.retract(p).unwrap();
    assert_eq!(
        recorder.lines(),
        vec![
            "insert #1 Person(age=30, name=\"Ann\")",
            "insert #2 30",
            "create Pair[#1, #2]",
            "fire Pair[#1, #2]",
            "insert #3 pair Ann",
            "fired Pair[#1, #2]",
            "retract #1",
        ]
    );
}
