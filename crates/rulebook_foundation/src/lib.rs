//! Core values, fact types, handles, and errors for Rulebook.
//!
//! This crate provides:
//! - [`Value`] - The value type for every fact and expression result
//! - [`FactHandle`] - Stable identity of a fact in working memory
//! - [`FactType`] and [`TypeRegistry`] - Fact type descriptors and resolution
//! - [`PropertyMask`] - Field sets used for property-reactive updates
//! - [`Error`] and [`Diagnostic`] - Runtime errors and build diagnostics

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod diagnostic;
pub mod error;
pub mod handle;
pub mod mask;
pub mod types;
pub mod value;

pub use diagnostic::{Diagnostic, Severity};
pub use error::{Error, ErrorContext, ErrorKind};
pub use handle::FactHandle;
pub use mask::PropertyMask;
pub use types::{FactType, FieldDef, FieldType, TypeRegistry, construct};
pub use value::{Object, Value};

/// Result type for Rulebook operations.
pub type Result<T> = std::result::Result<T, Error>;
