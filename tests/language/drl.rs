//! Integration tests for reading rule files.

use rulebook_foundation::ErrorKind;
use rulebook_language::{Dialect, Parser, RuleSource, parse_source};

const MULTIPLE: &str = r#"package mypackage;dialect "mvel"
import org.test.Person

rule R1
when
    Integer()
then
    System.out.println("Hello World")
    insert(new Person("Matteo", 47))
    insert("Hello World")
end

rule R2
when
    $p : Person()
then
    modify($p) { setAge(1); }
    insert("Modified person age to 1 for: "+$p.name)
end

rule R3
when
    $s : String( this == "Hello World")
    $p : Person()
then
    retract($s)end
"#;

#[test]
fn reads_a_multi_rule_package() {
    let pkg = parse_source(&RuleSource::new("multiple.drl", MULTIPLE)).unwrap();
    assert_eq!(pkg.name, "mypackage");
    assert_eq!(pkg.dialect, Some(Dialect::Mvel));
    assert_eq!(pkg.imports, vec!["org.test.Person"]);
    assert_eq!(pkg.resource.as_deref(), Some("multiple.drl"));

    let names: Vec<_> = pkg.rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["R1", "R2", "R3"]);

    let r3 = &pkg.rules[2];
    assert_eq!(r3.patterns.len(), 2);
    assert_eq!(r3.patterns[0].binding.as_deref(), Some("$s"));
    assert_eq!(r3.patterns[0].constraints[0].text, "this == \"Hello World\"");
    assert_eq!(r3.consequence.trim(), "retract($s)");
}

#[test]
fn consequences_parse_in_the_package_dialect() {
    let pkg = parse_source(&RuleSource::new("multiple.drl", MULTIPLE)).unwrap();
    let dialect = pkg.dialect.unwrap_or_default();
    for rule in &pkg.rules {
        let body = Parser::new(&rule.consequence, dialect).parse_block();
        assert!(body.is_ok(), "rule {} failed: {:?}", rule.name, body.err());
    }
    let r1 = &pkg.rules[0].consequence;
    assert!(Parser::new(r1, Dialect::Java).parse_block().is_err());
}

#[test]
fn attributes_and_declarations() {
    let pkg = parse_source(&RuleSource::new(
        "decls.drl",
        "package org.test\n\
         declare Address\n  street : String\nend\n\
         declare TempDecl1\nend\n\
         rule \"with attributes\" salience -5 no-loop true enabled false dialect \"java\"\n\
         when\n  $a : Address( street != null )\nthen\n  insert(\"x\");\nend\n",
    ))
    .unwrap();
    assert_eq!(pkg.types.len(), 2);
    assert!(pkg.types[1].fields.is_empty());

    let rule = &pkg.rules[0];
    assert_eq!(rule.name, "with attributes");
    assert_eq!(rule.attributes.salience, -5);
    assert!(rule.attributes.no_loop);
    assert!(!rule.attributes.enabled);
    assert_eq!(rule.attributes.dialect, Some(Dialect::Java));
    assert_eq!(rule.span.line, 7);
}

#[test]
fn errors_report_lines() {
    let err = parse_source(&RuleSource::new(
        "bad.drl",
        "rule R\nwhen\n  Integer()\nthen\n  insert(1);\n",
    ))
    .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ParseError { .. }));
}
