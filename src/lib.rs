//! Rulebook - Incremental production rule engine
//!
//! This crate re-exports all layers of the Rulebook system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 4: rulebook_runtime    - Sessions, events, REPL, CLI
//! Layer 3: rulebook_engine     - Resolver, dual-path lowering, network, agenda
//! Layer 2: rulebook_language   - Lexer, parser, dialects, rule descriptors
//! Layer 1: rulebook_storage    - Working memory, deltas, object filters
//! Layer 0: rulebook_foundation - Core types (Value, FactHandle, Error)
//! ```

pub use rulebook_engine as engine;
pub use rulebook_foundation as foundation;
pub use rulebook_language as language;
pub use rulebook_runtime as runtime;
pub use rulebook_storage as storage;
