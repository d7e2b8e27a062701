//! Rule language front end for Rulebook.
//!
//! This crate provides:
//! - [`Lexer`] and [`Token`] - Java-like tokenization with line tracking
//! - [`Parser`] - Expressions and consequence statements in either [`Dialect`]
//! - [`descr`] - The rule descriptor IR consumed by the compiler
//! - [`drl`] - A front end that reads rule source files into descriptors

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ast;
pub mod descr;
pub mod dialect;
pub mod drl;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

pub use ast::{BinaryOp, Expr, Literal, ModifyItem, Stmt, UnaryOp};
pub use descr::{
    AttributesDescr, ConstraintDescr, PackageDescr, PatternDescr, RuleDescr, RuleSource,
    TypeDeclDescr,
};
pub use dialect::Dialect;
pub use drl::parse_source;
pub use lexer::Lexer;
pub use parser::Parser;
pub use span::Span;
pub use token::{Token, TokenKind};
