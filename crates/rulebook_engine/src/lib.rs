//! Rule compiler, matching network, agenda, and consequence execution for Rulebook.
//!
//! This crate provides:
//! - [`KnowledgeBuilder`] - Parses, resolves, and lowers rules into a [`KnowledgeBase`]
//! - [`BuildMode`] - Interpreted or closure-compiled evaluation, with identical behaviour
//! - [`network`] - Shared alpha nodes, per-rule join chains, and the delta [`Propagator`]
//! - [`Agenda`] - Activations ordered by salience, then creation order
//! - [`Consequence`] - Rule actions routed back to a session through [`WorkingMemoryActions`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod agenda;
pub mod builder;
pub mod closure;
pub mod consequence;
pub mod evaluator;
pub mod interpret;
pub mod ir;
pub mod kbase;
pub mod network;
pub mod ops;
pub mod resolve;

pub use agenda::{Activation, Agenda, AgendaEvent};
pub use builder::KnowledgeBuilder;
pub use consequence::{Consequence, ConsequenceContext, WorkingMemoryActions};
pub use evaluator::{Action, BuildMode, Evaluator, Frame};
pub use kbase::{CompiledRule, KnowledgeBase};
pub use network::{MemoryStats, NetworkMemory, NetworkSpec, Propagator, RuleId, Token};
pub use resolve::{ResolvedPattern, ResolvedRule, Resolver};
