//! End-to-end tests across all layers.
//!
//! These tests build knowledge bases from rule source, run sessions, and
//! check the working memory that results. Every scenario runs under both
//! build modes.

mod concurrency;
mod equivalence;
mod lifecycle;
mod mvel;

use std::sync::Arc;

use rulebook_engine::{BuildMode, KnowledgeBase, KnowledgeBuilder};
use rulebook_foundation::{FactType, FieldType, Value};
use rulebook_language::RuleSource;
use rulebook_runtime::{Session, SessionConfig};
use rulebook_storage::ObjectFilter;

/// Both build modes.
pub const MODES: [BuildMode; 2] = [BuildMode::Interpreted, BuildMode::Compiled];

/// Host types available to every test rule file.
pub fn host_types() -> Vec<FactType> {
    let mut types = vec![
        FactType::new("org.test.Person")
            .with_field("name", FieldType::String)
            .with_field("age", FieldType::Int),
        FactType::new("org.test.Address").with_field("street", FieldType::String),
        FactType::new("org.test.Counter").with_field("count", FieldType::Int),
    ];
    types.extend((1..=10).map(|i| FactType::new(format!("org.test.TempDecl{i}"))));
    types
}

/// Builds a shared knowledge base from one rule file.
pub fn knowledge(mode: BuildMode, text: &str) -> Arc<KnowledgeBase> {
    let builder = host_types()
        .into_iter()
        .fold(KnowledgeBuilder::new().with_mode(mode), KnowledgeBuilder::with_type);
    match builder.with_source(RuleSource::new("test.drl", text)).build() {
        Ok(kb) => Arc::new(kb),
        Err(err) => panic!("{mode} build failed: {err}"),
    }
}

/// Opens a session with default settings.
pub fn session(mode: BuildMode, text: &str) -> Session {
    Session::new(knowledge(mode, text))
}

/// Opens a session with the given settings.
pub fn session_with(mode: BuildMode, text: &str, config: SessionConfig) -> Session {
    Session::with_config(knowledge(mode, text), config)
}

/// Returns every `String` fact in working memory.
pub fn strings(session: &Session) -> Vec<String> {
    session
        .query_objects(&ObjectFilter::of_type("String"))
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Creates an `org.test.Person`.
pub fn person(name: &str, age: i64) -> Value {
    rulebook_foundation::Object::new("org.test.Person")
        .with("name", name)
        .with("age", age)
        .into()
}
