//! Working memory storage for Rulebook.
//!
//! This crate provides:
//! - [`FactStore`] - Handle-keyed fact storage with cheap snapshots
//! - [`Delta`] - The change record produced by every store mutation
//! - [`ObjectFilter`] - Type-based selection of facts for queries

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod delta;
pub mod filter;
pub mod store;

pub use delta::Delta;
pub use filter::ObjectFilter;
pub use store::{FactStore, Snapshot};
