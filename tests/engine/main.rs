//! Integration tests for Layer 3: Engine
//!
//! Tests for knowledge building, the shared matching network, and
//! consequence execution in both build modes.

mod build;
mod consequences;
mod network;

use rulebook_engine::{BuildMode, KnowledgeBase, KnowledgeBuilder};
use rulebook_foundation::{FactType, FieldType};
use rulebook_language::RuleSource;

/// Both build modes, for tests that must behave identically under each.
pub const MODES: [BuildMode; 2] = [BuildMode::Interpreted, BuildMode::Compiled];

/// The `org.test.Person` host type.
pub fn person_type() -> FactType {
    FactType::new("org.test.Person")
        .with_field("name", FieldType::String)
        .with_field("age", FieldType::Int)
}

/// Builds a knowledge base from one rule file with `org.test.Person` registered.
pub fn build(mode: BuildMode, text: &str) -> rulebook_foundation::Result<KnowledgeBase> {
    KnowledgeBuilder::new()
        .with_mode(mode)
        .with_type(person_type())
        .with_source(RuleSource::new("rules.drl", text))
        .build()
}
