//! Integration tests for errors and diagnostics.

use rulebook_foundation::{Diagnostic, Error, ErrorContext, ErrorKind, FactHandle, Severity};

#[test]
fn rule_build_summarizes_errors() {
    let err = Error::rule_build(vec![
        Diagnostic::warning("unused"),
        Diagnostic::error("unknown type 'Nope'").in_rule("R").at(3, 5),
        Diagnostic::error("second"),
    ]);
    let msg = err.to_string();
    assert!(msg.contains("unknown type 'Nope'"));
    assert!(msg.contains("(and 1 more)"));
    assert_eq!(err.diagnostics().map(<[Diagnostic]>::len), Some(3));
}

#[test]
fn consequence_errors_keep_their_source() {
    let err = Error::consequence("R1", Error::unknown_handle(FactHandle::new(7)));
    assert_eq!(
        err.to_string(),
        "consequence of rule 'R1' failed: unknown fact handle: #7"
    );
    let ErrorKind::ConsequenceExecution { rule, source } = &err.kind else {
        panic!("expected consequence error");
    };
    assert_eq!(rule, "R1");
    assert!(matches!(source.kind, ErrorKind::UnknownHandle(h) if h.id() == 7));
}

#[test]
fn context_locates_the_failure() {
    let err = Error::evaluation("boom")
        .with_context(ErrorContext::new().with_source("rules.drl").with_position(3, 1));
    assert_eq!(err.to_string(), "evaluation error: boom (at rules.drl:3:1)");
    assert_eq!(err.context.map(|c| c.line), Some(Some(3)));
    assert!(Error::evaluation("boom").context.is_none());
}

#[test]
fn max_firings_display() {
    assert_eq!(Error::max_firings(10).to_string(), "max firings (10) exceeded");
}

#[test]
fn diagnostic_display() {
    let d = Diagnostic::error("expected ';'")
        .in_rule("R")
        .in_resource("rules.drl")
        .at(4, 12);
    assert_eq!(d.severity, Severity::Error);
    assert!(d.is_error());
    let text = d.to_string();
    assert!(text.contains("[R]"));
    assert!(text.contains("rules.drl:4:12"));
    assert!(!Diagnostic::info("note").is_error());
}
