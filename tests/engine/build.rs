//! Integration tests for knowledge building.

use rulebook_engine::{BuildMode, KnowledgeBuilder};
use rulebook_foundation::{Diagnostic, Error, ErrorKind, Severity, Value};
use rulebook_language::{Dialect, RuleSource};

use crate::{MODES, build, person_type};

fn errors(err: &Error) -> Vec<Diagnostic> {
    let ErrorKind::RuleBuild(diagnostics) = &err.kind else {
        panic!("expected build error, got {err}");
    };
    diagnostics.iter().filter(|d| d.is_error()).cloned().collect()
}

#[test]
fn build_reports_every_broken_rule() {
    let err = build(
        BuildMode::Interpreted,
        "package org.test\n\
         rule A when Nobody() then end\n\
         rule B when Person( height > 2 ) then end\n\
         rule C when Person() then insert($q); end\n\
         rule D when Person() then insert(1); end\n",
    )
    .unwrap_err();
    let errors = errors(&err);
    let rules: Vec<_> = errors.iter().filter_map(|d| d.rule.as_deref()).collect();
    assert_eq!(rules, vec!["A", "B", "C"]);
    assert!(errors[0].message.contains("unknown type 'Nobody'"));
    assert!(errors[1].message.contains("unknown field 'height'"));
    assert!(errors[2].message.contains("unresolved identifier '$q'"));
    assert!(errors.iter().all(|d| d.resource.as_deref() == Some("rules.drl")));
}

#[test]
fn java_consequences_need_semicolons() {
    let text = "package org.test\nrule R when Integer() then insert(\"x\") end\n";
    let err = build(BuildMode::Compiled, text).unwrap_err();
    assert!(errors(&err)[0].message.contains("expected ';'"));

    let kb = KnowledgeBuilder::new()
        .with_dialect(Dialect::Mvel)
        .with_source(RuleSource::new("rules.drl", text))
        .build()
        .unwrap();
    assert_eq!(kb.rule_by_name("R").unwrap().dialect(), Dialect::Mvel);
}

#[test]
fn rule_dialect_overrides_package_dialect() {
    let kb = build(
        BuildMode::Interpreted,
        "package org.test\ndialect \"mvel\"\n\
         rule M when Integer() then insert(\"a\")\nend\n\
         rule J dialect \"java\" when Integer() then insert(\"b\"); end\n",
    )
    .unwrap();
    assert_eq!(kb.rule_by_name("M").unwrap().dialect(), Dialect::Mvel);
    assert_eq!(kb.rule_by_name("J").unwrap().dialect(), Dialect::Java);
}

#[test]
fn rules_keep_their_attributes_and_pattern_types() {
    for mode in MODES {
        let kb = build(
            mode,
            "package org.test\n\
             rule \"join\" salience 7 no-loop\n\
             when\n  $i : Integer()\n  $p : Person( age == $i )\n\
             then\nend\n",
        )
        .unwrap();
        let rule = kb.rule_by_name("join").unwrap();
        assert_eq!(rule.salience(), 7);
        assert!(rule.no_loop());
        assert!(rule.enabled());
        let patterns: Vec<_> = rule.patterns().iter().map(|p| p.to_string()).collect();
        assert_eq!(patterns, vec!["Integer", "org.test.Person"]);
    }
}

#[test]
fn declared_types_extend_host_types() {
    let kb = build(
        BuildMode::Interpreted,
        "package org.test\n\
         declare Student extends Person\n  school : String\nend\n",
    )
    .unwrap();
    let student = kb
        .instantiate("Student", vec![Value::from("Ann"), Value::Int(20), Value::from("MIT")])
        .unwrap();
    assert_eq!(student.type_name(), "org.test.Student");
    assert_eq!(student.field("age"), Some(&Value::Int(20)));
    assert!(kb.registry().is_assignable("org.test.Student", "org.test.Person"));
}

#[test]
fn unknown_types_cannot_be_instantiated() {
    let kb = KnowledgeBuilder::new().with_type(person_type()).build().unwrap();
    let err = kb.instantiate("Robot", vec![]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownType(_)));
}

#[test]
fn warnings_do_not_fail_the_build() {
    let kb = build(
        BuildMode::Interpreted,
        "package org.test\nrule Off enabled false when Person() then end\n",
    )
    .unwrap();
    assert!(
        kb.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Info && d.rule.as_deref() == Some("Off"))
    );
}
