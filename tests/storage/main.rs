//! Integration tests for Layer 1: Storage
//!
//! Tests for the fact store, its deltas, and object filters.

mod facts;
mod queries;
