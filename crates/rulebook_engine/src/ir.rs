//! Resolved intermediate representation.
//!
//! The resolver turns parsed expressions and statements into this form:
//! names are bound to pattern positions or local slots, getters are turned
//! into field reads, and constructors carry their field list. Both build modes
//! lower from the same IR, which is also the key for alpha node sharing.

use std::sync::Arc;

use rulebook_foundation::{FieldDef, FieldType, PropertyMask, Value};
use rulebook_language::{BinaryOp, UnaryOp};

/// A resolved expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A constant.
    Const(Value),
    /// The fact currently being tested by a pattern.
    This,
    /// The fact matched by pattern `n`.
    Fact(usize),
    /// A consequence local slot.
    Local(usize),
    /// Field read.
    Field {
        /// Object expression.
        target: Box<Expr>,
        /// Field name.
        field: Arc<str>,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operation; `&&` and `||` short-circuit.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Built-in method call.
    Method {
        /// Receiver.
        target: Box<Expr>,
        /// Method.
        method: Method,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Object construction.
    New {
        /// Qualified type name.
        type_name: Arc<str>,
        /// Fields in constructor order.
        fields: Arc<[FieldDef]>,
        /// Positional arguments.
        args: Vec<Expr>,
    },
}

/// Built-in methods available on values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `s.length()`
    Length,
    /// `s.isEmpty()`
    IsEmpty,
    /// `s.startsWith(p)`
    StartsWith,
    /// `s.endsWith(p)`
    EndsWith,
    /// `s.contains(p)`
    Contains,
    /// `s.toUpperCase()`
    ToUpperCase,
    /// `s.toLowerCase()`
    ToLowerCase,
    /// `s.trim()`
    Trim,
    /// `v.equals(o)`
    Equals,
    /// `v.toString()`
    ToString,
    /// `n.intValue()`
    IntValue,
    /// `n.doubleValue()`
    DoubleValue,
}

impl Method {
    /// Looks up a built-in method by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "length" | "size" => Self::Length,
            "isEmpty" => Self::IsEmpty,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "contains" => Self::Contains,
            "toUpperCase" => Self::ToUpperCase,
            "toLowerCase" => Self::ToLowerCase,
            "trim" => Self::Trim,
            "equals" => Self::Equals,
            "toString" => Self::ToString,
            "intValue" | "longValue" => Self::IntValue,
            "doubleValue" | "floatValue" => Self::DoubleValue,
            _ => return None,
        })
    }

    /// Returns the number of arguments the method takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::StartsWith | Self::EndsWith | Self::Contains | Self::Equals => 1,
            _ => 0,
        }
    }
}

impl Expr {
    /// Creates a field read.
    #[must_use]
    pub fn field(target: Expr, field: impl Into<Arc<str>>) -> Self {
        Self::Field {
            target: Box::new(target),
            field: field.into(),
        }
    }

    /// Returns true if the expression reads the tested fact.
    #[must_use]
    pub fn reads_this(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e, Self::This));
        found
    }

    /// Returns true if the expression reads any earlier pattern's fact.
    #[must_use]
    pub fn reads_facts(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e, Self::Fact(_)));
        found
    }

    /// Calls `f` on this expression and every subexpression.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Self::Const(_) | Self::This | Self::Fact(_) | Self::Local(_) => {}
            Self::Field { target, .. } => target.visit(f),
            Self::Unary { operand, .. } => operand.visit(f),
            Self::Binary { lhs, rhs, .. } => {
                lhs.visit(f);
                rhs.visit(f);
            }
            Self::Method { target, args, .. } => {
                target.visit(f);
                for arg in args {
                    arg.visit(f);
                }
            }
            Self::New { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
        }
    }

    /// Rewrites every node bottom-up with `f`.
    #[must_use]
    pub fn map(self, f: &impl Fn(Expr) -> Expr) -> Self {
        let mapped = match self {
            leaf @ (Self::Const(_) | Self::This | Self::Fact(_) | Self::Local(_)) => leaf,
            Self::Field { target, field } => Self::Field {
                target: Box::new(target.map(f)),
                field,
            },
            Self::Unary { op, operand } => Self::Unary {
                op,
                operand: Box::new(operand.map(f)),
            },
            Self::Binary { op, lhs, rhs } => Self::Binary {
                op,
                lhs: Box::new(lhs.map(f)),
                rhs: Box::new(rhs.map(f)),
            },
            Self::Method {
                target,
                method,
                args,
            } => Self::Method {
                target: Box::new(target.map(f)),
                method,
                args: args.into_iter().map(|a| a.map(f)).collect(),
            },
            Self::New {
                type_name,
                fields,
                args,
            } => Self::New {
                type_name,
                fields,
                args: args.into_iter().map(|a| a.map(f)).collect(),
            },
        };
        f(mapped)
    }

    /// Replaces `Fact(pattern)` with `This`.
    #[must_use]
    pub fn rebase(self, pattern: usize) -> Self {
        self.map(&|e| match e {
            Self::Fact(n) if n == pattern => Self::This,
            other => other,
        })
    }

    /// Replaces `This` with `Fact(pattern)`.
    #[must_use]
    pub fn unbase(self, pattern: usize) -> Self {
        self.map(&|e| match e {
            Self::This => Self::Fact(pattern),
            other => other,
        })
    }

    /// Adds the fields of `subject` read by this expression to `mask`.
    ///
    /// A use of `subject` other than a field read covers every field.
    pub fn collect_reads(&self, subject: &Expr, mask: &mut PropertyMask) {
        match self {
            Self::Field { target, field } if **target == *subject => mask.insert(field.clone()),
            e if e == subject => mask.set_all(),
            Self::Const(_) | Self::This | Self::Fact(_) | Self::Local(_) => {}
            Self::Field { target, .. } => target.collect_reads(subject, mask),
            Self::Unary { operand, .. } => operand.collect_reads(subject, mask),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_reads(subject, mask);
                rhs.collect_reads(subject, mask);
            }
            Self::Method { target, args, .. } => {
                target.collect_reads(subject, mask);
                for arg in args {
                    arg.collect_reads(subject, mask);
                }
            }
            Self::New { args, .. } => {
                for arg in args {
                    arg.collect_reads(subject, mask);
                }
            }
        }
    }

    /// Splits a conjunction into its conjuncts.
    #[must_use]
    pub fn conjuncts(self) -> Vec<Expr> {
        match self {
            Self::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => {
                let mut out = lhs.conjuncts();
                out.extend(rhs.conjuncts());
                out
            }
            other => vec![other],
        }
    }
}

/// Assignment of one field inside a `modify` block or through a setter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldAssign {
    /// Field name.
    pub field: Arc<str>,
    /// Declared field type, used to coerce the value.
    pub ty: FieldType,
    /// New value.
    pub value: Expr,
}

/// A resolved consequence statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// Evaluate for effect.
    Expr(Expr),
    /// Initialize a local slot.
    Let {
        /// Slot.
        slot: usize,
        /// Declared type, used to coerce the value.
        ty: FieldType,
        /// Initial value.
        init: Expr,
    },
    /// Overwrite a local slot.
    SetLocal {
        /// Slot.
        slot: usize,
        /// Declared type.
        ty: FieldType,
        /// New value.
        value: Expr,
    },
    /// Set a field on the object held by a local.
    SetLocalField {
        /// Slot.
        slot: usize,
        /// Assignment.
        assign: FieldAssign,
    },
    /// Set a field on the consequence's copy of a matched fact, without
    /// notifying working memory.
    SetFactField {
        /// Pattern position.
        pattern: usize,
        /// Assignment.
        assign: FieldAssign,
    },
    /// Insert a new fact.
    Insert(Expr),
    /// Push the consequence's copy of a matched fact to working memory.
    Update(usize),
    /// Retract a matched fact.
    Retract(usize),
    /// Assign fields of a matched fact and update it.
    Modify {
        /// Pattern position.
        pattern: usize,
        /// Assignments, applied in order.
        assigns: Vec<FieldAssign>,
    },
    /// Print a line of output.
    Print(Expr),
    /// Conditional.
    If {
        /// Condition.
        cond: Expr,
        /// Statements when true.
        then_branch: Vec<Stmt>,
        /// Statements when false.
        else_branch: Vec<Stmt>,
    },
}
