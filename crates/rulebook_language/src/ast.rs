//! Abstract syntax tree for constraint expressions and consequence statements.
//!
//! Both dialects parse into the same tree; they differ only in how statements
//! are terminated.

use std::fmt;

use crate::span::Span;

/// A literal value.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    String(String),
}

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// Returns the operator's source symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Returns the binding power; higher binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }

    /// Returns true for comparison operators.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// An expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal, Span),
    /// A bare name: declaration (`$p`), local, field, or `this`.
    Name(String, Span),
    /// Field access `target.name`.
    Field {
        /// The object expression.
        target: Box<Expr>,
        /// Field name.
        name: String,
        /// Source location.
        span: Span,
    },
    /// Method or function call, `target.name(args)` or `name(args)`.
    Call {
        /// Receiver, if any.
        target: Option<Box<Expr>>,
        /// Method name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Source location.
        span: Span,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// Object construction `new Type(args)`.
    New {
        /// Type name as written (possibly qualified).
        type_name: String,
        /// Positional constructor arguments.
        args: Vec<Expr>,
        /// Source location.
        span: Span,
    },
}

impl Expr {
    /// Returns the source span of this expression.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, span) | Self::Name(_, span) => *span,
            Self::Field { span, .. }
            | Self::Call { span, .. }
            | Self::Unary { span, .. }
            | Self::Binary { span, .. }
            | Self::New { span, .. } => *span,
        }
    }

    /// Returns the name if this is a bare name.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name, _) => Some(name),
            _ => None,
        }
    }

    /// Returns the dotted path this expression spells, like `System.out`.
    #[must_use]
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Self::Name(name, _) => Some(name.clone()),
            Self::Field { target, name, .. } => {
                target.dotted_path().map(|prefix| format!("{prefix}.{name}"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n:?}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit, _) => write!(f, "{lit}"),
            Self::Name(name, _) => write!(f, "{name}"),
            Self::Field { target, name, .. } => write!(f, "{target}.{name}"),
            Self::Call {
                target, name, args, ..
            } => {
                if let Some(target) = target {
                    write!(f, "{target}.")?;
                }
                write!(f, "{name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Self::Unary { op, operand, .. } => match op {
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::Not => write!(f, "!{operand}"),
            },
            Self::Binary { op, lhs, rhs, .. } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::New {
                type_name, args, ..
            } => {
                write!(f, "new {type_name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// One assignment inside a `modify` block.
#[derive(Clone, Debug, PartialEq)]
pub enum ModifyItem {
    /// Setter call `setAge(1)`.
    Setter {
        /// Method name (`setAge`).
        name: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Source location.
        span: Span,
    },
    /// Field assignment `age = 1`.
    Assign {
        /// Field name.
        field: String,
        /// New value.
        value: Expr,
        /// Source location.
        span: Span,
    },
}

/// A consequence statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// An expression evaluated for its effect.
    Expr(Expr),
    /// Local declaration `Type name = init;`.
    Local {
        /// Declared type as written.
        ty: String,
        /// Local name.
        name: String,
        /// Initializer, if any.
        init: Option<Expr>,
        /// Source location.
        span: Span,
    },
    /// Assignment to a local or a field of a local.
    Assign {
        /// Assignment target (`a` or `a.b`).
        target: Expr,
        /// Assigned value.
        value: Expr,
        /// Source location.
        span: Span,
    },
    /// `if (cond) { .. } else { .. }`
    If {
        /// Condition.
        cond: Expr,
        /// Statements when true.
        then_branch: Vec<Stmt>,
        /// Statements when false.
        else_branch: Vec<Stmt>,
        /// Source location.
        span: Span,
    },
    /// `modify($d) { .. }`
    Modify {
        /// The fact being modified.
        target: Expr,
        /// Assignments applied to the fact.
        items: Vec<ModifyItem>,
        /// Source location.
        span: Span,
    },
}

impl Stmt {
    /// Returns the source span of this statement.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Expr(expr) => expr.span(),
            Self::Local { span, .. }
            | Self::Assign { span, .. }
            | Self::If { span, .. }
            | Self::Modify { span, .. } => *span,
        }
    }
}
