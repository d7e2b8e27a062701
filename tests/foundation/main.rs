//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, FactType, PropertyMask, Error, and Diagnostic.

mod errors;
mod types;
mod values;
