//! Error types for the Rulebook system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::handle::FactHandle;

/// The main error type for Rulebook operations.
#[derive(Clone, Debug, Error)]
#[error("{kind}{}", located(.context))]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a rule build error from the collected diagnostics.
    #[must_use]
    pub fn rule_build(diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(ErrorKind::RuleBuild(diagnostics))
    }

    /// Creates an unknown handle error.
    #[must_use]
    pub fn unknown_handle(handle: FactHandle) -> Self {
        Self::new(ErrorKind::UnknownHandle(handle))
    }

    /// Wraps an error raised while running a rule's consequence.
    #[must_use]
    pub fn consequence(rule: impl Into<String>, source: Error) -> Self {
        Self::new(ErrorKind::ConsequenceExecution {
            rule: rule.into(),
            source: Box::new(source),
        })
    }

    /// Creates a max-firings error.
    #[must_use]
    pub fn max_firings(limit: usize) -> Self {
        Self::new(ErrorKind::MaxFiringsExceeded { limit })
    }

    /// Creates an expression evaluation error.
    #[must_use]
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Evaluation(message.into()))
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        })
    }

    /// Creates an arity mismatch error.
    #[must_use]
    pub fn arity_mismatch(expected: impl Into<String>, actual: usize) -> Self {
        Self::new(ErrorKind::ArityMismatch {
            expected: expected.into(),
            actual,
        })
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::new(ErrorKind::ParseError {
            message: message.into(),
            line,
            column,
        })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns the build diagnostics if this is a rule build error.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&[Diagnostic]> {
        match &self.kind {
            ErrorKind::RuleBuild(diags) => Some(diags),
            _ => None,
        }
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Clone, Debug, Error)]
pub enum ErrorKind {
    /// The knowledge build reported at least one error diagnostic.
    #[error("rule build failed: {}", summarize(.0))]
    RuleBuild(Vec<Diagnostic>),

    /// A handle that is not (or no longer) in working memory.
    #[error("unknown fact handle: {0}")]
    UnknownHandle(FactHandle),

    /// A consequence failed while firing.
    #[error("consequence of rule '{rule}' failed: {source}")]
    ConsequenceExecution {
        /// Name of the rule whose consequence failed.
        rule: String,
        /// The underlying failure.
        source: Box<Error>,
    },

    /// `fire_all_rules` reached the configured firing limit.
    #[error("max firings ({limit}) exceeded")]
    MaxFiringsExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Expression evaluation failed.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Type mismatch during runtime type checking.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: String,
        /// The actual type encountered.
        actual: String,
    },

    /// Field not declared on a type.
    #[error("unknown field: {field} on type {type_name}")]
    UnknownField {
        /// The type that was queried.
        type_name: String,
        /// The field name that was not found.
        field: String,
    },

    /// Type name could not be resolved.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Type registered twice.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// Wrong number of arguments.
    #[error("arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Description of expected arity.
        expected: String,
        /// Actual number of arguments.
        actual: usize,
    },

    /// Parse error in rule source.
    #[error("parse error at {line}:{column}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Line number (1-indexed).
        line: u32,
        /// Column number (1-indexed).
        column: u32,
    },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

#[allow(clippy::ref_option)]
fn located(context: &Option<ErrorContext>) -> String {
    context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default()
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    match errors.as_slice() {
        [] => "no errors".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Where an error occurred in rule source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Resource path, or the package name for rules built without one.
    pub source: Option<String>,
    /// Line number in source (1-indexed).
    pub line: Option<u32>,
    /// Column number in source (1-indexed).
    pub column: Option<u32>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the line and column.
    #[must_use]
    pub const fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}", self.source.as_deref().unwrap_or("<unknown>"))?;
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, ":{line}:{col}")?;
        }
        Ok(())
    }
}
