//! Integration tests for Layer 2: Language
//!
//! Tests for the lexer, the consequence parser in both dialects, and the
//! rule file reader.

mod drl;
mod lexer;
mod parser;
