//! Sessions, REPL, and CLI for Rulebook.
//!
//! This crate provides:
//! - [`Session`] - Working memory, agenda, and the firing loop
//! - [`SessionConfig`] - Firing limits, property reactivity, and output capture
//! - [`SessionEvent`] and [`SessionListener`] - Observing what a session does
//! - [`Repl`] - Interactive read-eval-print loop over rule files and facts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod editor;
pub mod event;
pub mod repl;
pub mod session;

pub use config::SessionConfig;
pub use editor::{LineEditor, ReadResult, RustylineEditor, ScriptedEditor};
pub use event::{EventRecorder, SessionEvent, SessionListener};
pub use repl::Repl;
pub use session::Session;
