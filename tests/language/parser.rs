//! Integration tests for the consequence parser.

use rulebook_foundation::ErrorKind;
use rulebook_language::{Dialect, Expr, ModifyItem, Parser, Stmt};

fn block(source: &str, dialect: Dialect) -> Vec<Stmt> {
    Parser::new(source, dialect).parse_block().unwrap()
}

fn block_error(source: &str, dialect: Dialect) -> String {
    let err = Parser::new(source, dialect).parse_block().unwrap_err();
    let ErrorKind::ParseError { message, .. } = err.kind else {
        panic!("expected parse error, got {err}");
    };
    message
}

// =============================================================================
// Dialects
// =============================================================================

#[test]
fn java_rejects_missing_semicolons() {
    let source = "System.out.println(\"Hello World\")\ninsert(\"Hello World\");";
    assert_eq!(block_error(source, Dialect::Java), "expected ';'");
    assert_eq!(block(source, Dialect::Mvel).len(), 2);
}

#[test]
fn both_dialects_accept_semicolons() {
    let source = "insert(1); insert(2);";
    assert_eq!(block(source, Dialect::Java), block(source, Dialect::Mvel));
}

#[test]
fn mvel_statement_ends_at_end_of_block() {
    assert_eq!(block("insert(\"matched\")", Dialect::Mvel).len(), 1);
    assert!(Parser::new("insert(1)", Dialect::Java).parse_block().is_err());
}

#[test]
fn modify_trailing_semicolon_is_optional() {
    let with = block("modify($p) { setAge(1); };", Dialect::Java);
    let without = block("modify($p) { setAge(1); }", Dialect::Java);
    assert_eq!(with.len(), 1);
    assert_eq!(without.len(), 1);
}

#[test]
fn mvel_scenario_consequences() {
    let body = block(
        "System.out.println(\"Hello World\")\n\
         insert(new Person(\"Matteo\", 47))\n\
         insert(\"Hello World\")\n",
        Dialect::Mvel,
    );
    assert_eq!(body.len(), 3);
    let Stmt::Expr(Expr::Call { args, .. }) = &body[1] else {
        panic!("expected call");
    };
    assert!(matches!(&args[0], Expr::New { .. }));

    let body = block(
        "modify($p) { setAge(1); }\ninsert(\"Modified person age to 1 for: \"+$p.name)\n",
        Dialect::Mvel,
    );
    let Stmt::Modify { items, .. } = &body[0] else {
        panic!("expected modify");
    };
    assert!(matches!(&items[0], ModifyItem::Setter { name, .. } if name == "setAge"));
    assert_eq!(body.len(), 2);
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn expressions_print_with_explicit_grouping() {
    let expr = Parser::new("a + b * -c == d", Dialect::Java)
        .parse_expression()
        .unwrap();
    assert_eq!(expr.to_string(), "((a + (b * -c)) == d)");
}

#[test]
fn unbalanced_parentheses_fail() {
    assert!(Parser::new("f(1", Dialect::Java).parse_expression().is_err());
    assert!(Parser::new("(1))", Dialect::Java).parse_expression().is_err());
}
