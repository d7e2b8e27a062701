//! Integration tests for the lexer.

use proptest::prelude::*;
use rulebook_language::{Lexer, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::tokenize_all(source)
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn pattern_constraint_tokens() {
    assert_eq!(
        kinds("$p : Person( age >= 18 )"),
        vec![
            TokenKind::Ident("$p".into()),
            TokenKind::Colon,
            TokenKind::Ident("Person".into()),
            TokenKind::LParen,
            TokenKind::Ident("age".into()),
            TokenKind::Ge,
            TokenKind::Int(18),
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn minus_is_always_an_operator() {
    assert_eq!(
        kinds("-1"),
        vec![TokenKind::Minus, TokenKind::Int(1), TokenKind::Eof]
    );
}

#[test]
fn literal_suffixes_and_quotes() {
    assert_eq!(kinds("42L")[0], TokenKind::Int(42));
    assert_eq!(kinds("2.5")[0], TokenKind::Float(2.5));
    assert_eq!(kinds("'hi'")[0], TokenKind::String("hi".into()));
    assert_eq!(kinds("\"a\\\"b\"")[0], TokenKind::String("a\"b".into()));
    assert_eq!(
        kinds("null true false"),
        vec![TokenKind::Null, TokenKind::True, TokenKind::False, TokenKind::Eof]
    );
}

#[test]
fn comments_are_skipped_and_lines_tracked() {
    let tokens = Lexer::tokenize_all("a // note\n/* block\n */ b");
    assert_eq!(tokens[0].kind, TokenKind::Ident("a".into()));
    assert_eq!(tokens[1].kind, TokenKind::Ident("b".into()));
    assert!(tokens[1].newline_before);
    assert_eq!(tokens[1].span.line, 3);
    assert!(!tokens[0].newline_before);
}

#[test]
fn errors_are_tokens() {
    assert!(matches!(kinds("\"open")[0], TokenKind::Error(_)));
    assert!(matches!(kinds("#")[0], TokenKind::Error(_)));
}

proptest! {
    #[test]
    fn tokenizing_always_terminates_with_eof(source in "\\PC{0,64}") {
        let tokens = Lexer::tokenize_all(&source);
        let eofs = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
        prop_assert_eq!(eofs, 1);
        prop_assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
        for token in &tokens {
            prop_assert!(token.span.start <= token.span.end);
            prop_assert!(token.span.end <= source.len());
        }
    }

    #[test]
    fn integers_lex_to_their_value(n in 0i64..1_000_000_000) {
        prop_assert_eq!(kinds(&n.to_string()), vec![TokenKind::Int(n), TokenKind::Eof]);
    }
}
