//! Executable forms of constraints and consequences.
//!
//! A [`BuildMode`] selects how resolved IR is lowered. Interpreted forms keep
//! the IR and walk it on every evaluation; compiled forms are closure trees
//! built once ahead of time. Callers see one interface either way.

use std::fmt;
use std::sync::Arc;

use rulebook_foundation::{Result, Value};

use crate::consequence::ConsequenceContext;
use crate::ops;
use crate::{closure, interpret, ir};

/// How rules are lowered into executable form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BuildMode {
    /// Walk the resolved IR at evaluation time.
    #[default]
    Interpreted,
    /// Build closures over the IR ahead of time.
    Compiled,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpreted => write!(f, "interpreted"),
            Self::Compiled => write!(f, "compiled"),
        }
    }
}

/// Values visible to an expression.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    /// The fact being tested, in constraint context.
    pub this: Option<&'a Value>,
    /// Facts matched by earlier patterns, by position.
    pub facts: &'a [Value],
    /// Consequence locals, by slot.
    pub locals: &'a [Value],
}

impl<'a> Frame<'a> {
    /// Frame for an alpha test: only `this` is visible.
    #[must_use]
    pub const fn alpha(this: &'a Value) -> Self {
        Self {
            this: Some(this),
            facts: &[],
            locals: &[],
        }
    }

    /// Frame for a join test against a partial match.
    #[must_use]
    pub const fn join(this: &'a Value, facts: &'a [Value]) -> Self {
        Self {
            this: Some(this),
            facts,
            locals: &[],
        }
    }

    /// Frame over a partial match, without a tested fact.
    #[must_use]
    pub const fn facts(facts: &'a [Value]) -> Self {
        Self {
            this: None,
            facts,
            locals: &[],
        }
    }

    pub(crate) fn this(&self) -> Result<&'a Value> {
        self.this
            .ok_or_else(|| rulebook_foundation::Error::internal("'this' outside a pattern"))
    }

    pub(crate) fn fact(&self, n: usize) -> Result<&'a Value> {
        self.facts
            .get(n)
            .ok_or_else(|| rulebook_foundation::Error::internal(format!("no fact at position {n}")))
    }

    pub(crate) fn local(&self, slot: usize) -> Result<&'a Value> {
        self.locals
            .get(slot)
            .ok_or_else(|| rulebook_foundation::Error::internal(format!("no local in slot {slot}")))
    }
}

/// A closure-compiled expression.
pub type CompiledExpr = Arc<dyn Fn(&Frame<'_>) -> Result<Value> + Send + Sync>;

/// A closure-compiled consequence.
pub type CompiledAction = Arc<dyn Fn(&mut ConsequenceContext<'_>) -> Result<()> + Send + Sync>;

/// An executable expression.
#[derive(Clone)]
pub enum Evaluator {
    /// Tree-walking evaluation of the IR.
    Interpreted(Arc<ir::Expr>),
    /// Ahead-of-time closure tree.
    Compiled(CompiledExpr),
}

impl Evaluator {
    /// Lowers an expression for the given mode.
    #[must_use]
    pub fn lower(expr: &ir::Expr, mode: BuildMode) -> Self {
        match mode {
            BuildMode::Interpreted => Self::Interpreted(Arc::new(expr.clone())),
            BuildMode::Compiled => Self::Compiled(closure::compile_expr(expr)),
        }
    }

    /// Evaluates the expression.
    ///
    /// # Errors
    /// Returns any evaluation error raised by the expression.
    pub fn eval(&self, frame: &Frame<'_>) -> Result<Value> {
        match self {
            Self::Interpreted(expr) => interpret::eval(expr, frame),
            Self::Compiled(f) => f(frame),
        }
    }

    /// Evaluates the expression as a condition.
    ///
    /// # Errors
    /// Returns an error if evaluation fails or the result is not boolean.
    pub fn test(&self, frame: &Frame<'_>) -> Result<bool> {
        ops::condition(&self.eval(frame)?)
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpreted(expr) => f.debug_tuple("Interpreted").field(expr).finish(),
            Self::Compiled(_) => write!(f, "Compiled(..)"),
        }
    }
}

/// An executable consequence.
#[derive(Clone)]
pub enum Action {
    /// Tree-walking execution of the statement IR.
    Interpreted(Arc<[ir::Stmt]>),
    /// Ahead-of-time closure tree.
    Compiled(CompiledAction),
}

impl Action {
    /// Lowers a statement list for the given mode.
    #[must_use]
    pub fn lower(stmts: &[ir::Stmt], mode: BuildMode) -> Self {
        match mode {
            BuildMode::Interpreted => Self::Interpreted(stmts.into()),
            BuildMode::Compiled => Self::Compiled(closure::compile_block(stmts)),
        }
    }

    /// Runs the consequence.
    ///
    /// # Errors
    /// Returns the first evaluation or working memory error.
    pub fn run(&self, ctx: &mut ConsequenceContext<'_>) -> Result<()> {
        match self {
            Self::Interpreted(stmts) => interpret::exec_block(stmts, ctx),
            Self::Compiled(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpreted(stmts) => write!(f, "Interpreted({} statements)", stmts.len()),
            Self::Compiled(_) => write!(f, "Compiled(..)"),
        }
    }
}
