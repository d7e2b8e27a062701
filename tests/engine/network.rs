//! Integration tests for the shared matching network.

use rulebook_engine::{Agenda, NetworkMemory, Propagator};
use rulebook_foundation::{Object, Value};
use rulebook_storage::FactStore;

use crate::{MODES, build};

const SHARED: &str = "package org.test\n\
    rule Adults when $p : Person( age >= 18 ) then end\n\
    rule Voters when $p : Person( age >= 18 ) then end\n\
    rule Named when $p : Person( name == \"Ann\" ) then end\n\
    rule Pairs when $p : Person( age >= 18 ) $i : Integer( this == $p.age ) then end\n";

#[test]
fn identical_patterns_share_alpha_nodes() {
    for mode in MODES {
        let kb = build(mode, SHARED).unwrap();
        let alphas: Vec<_> = kb.network().alphas().map(|(_, node)| node).collect();
        assert_eq!(alphas.len(), 3);
        let adults = alphas
            .iter()
            .find(|node| node.type_name() == "org.test.Person" && node.refcount() == 3);
        assert!(adults.is_some(), "{mode}: adult pattern not shared");
    }
}

#[test]
fn removing_rules_releases_unshared_nodes() {
    let mut kb = build(MODES[0], SHARED).unwrap();
    assert!(kb.remove_rule("Named"));
    assert_eq!(kb.network().alphas().count(), 2);
    assert!(kb.remove_rule("Pairs"));
    assert!(kb.remove_rule("Voters"));
    let refcounts: Vec<_> = kb.network().alphas().map(|(_, n)| n.refcount()).collect();
    assert_eq!(refcounts, vec![1]);
    assert!(kb.rule_by_name("Voters").is_none());
}

#[test]
fn one_fact_activates_every_sharing_rule() {
    for mode in MODES {
        let kb = build(mode, SHARED).unwrap();
        let mut memory = NetworkMemory::new(kb.network());
        let mut agenda = Agenda::new();
        let mut store = FactStore::new();

        let ann: Value = Object::new("org.test.Person")
            .with("name", "Ann")
            .with("age", 40)
            .into();
        let (_, delta) = store.insert(ann);
        Propagator::new(kb.network(), &mut memory, &mut agenda, &store, kb.registry())
            .apply(&delta)
            .unwrap();
        let (_, delta) = store.insert(Value::Int(40));
        Propagator::new(kb.network(), &mut memory, &mut agenda, &store, kb.registry())
            .apply(&delta)
            .unwrap();

        let fired: Vec<_> = agenda.iter().map(ToString::to_string).collect();
        assert_eq!(
            fired,
            vec!["Adults[#1]", "Voters[#1]", "Named[#1]", "Pairs[#1, #2]"],
            "{mode}"
        );
        assert_eq!(memory.stats().alpha_facts, 3);
    }
}
