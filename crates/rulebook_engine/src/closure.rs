//! Ahead-of-time compilation of the resolved IR into closure trees.
//!
//! Each IR node becomes one boxed closure that captures its already-compiled
//! children, so dispatch on node kind happens once at build time instead of
//! on every evaluation. Primitive semantics come from [`crate::ops`].

use std::sync::Arc;

use rulebook_foundation::{Result, Value};
use rulebook_language::BinaryOp;

use crate::consequence::ConsequenceContext;
use crate::evaluator::{CompiledAction, CompiledExpr, Frame};
use crate::ir::{Expr, FieldAssign, Stmt};
use crate::ops;

fn boxed(f: impl Fn(&Frame<'_>) -> Result<Value> + Send + Sync + 'static) -> CompiledExpr {
    Arc::new(f)
}

fn action(
    f: impl Fn(&mut ConsequenceContext<'_>) -> Result<()> + Send + Sync + 'static,
) -> CompiledAction {
    Arc::new(f)
}

/// Compiles an expression into a closure.
#[must_use]
pub fn compile_expr(expr: &Expr) -> CompiledExpr {
    match expr {
        Expr::Const(v) => {
            let v = v.clone();
            boxed(move |_| Ok(v.clone()))
        }
        Expr::This => boxed(|frame| frame.this().cloned()),
        Expr::Fact(n) => {
            let n = *n;
            boxed(move |frame| frame.fact(n).cloned())
        }
        Expr::Local(slot) => {
            let slot = *slot;
            boxed(move |frame| frame.local(slot).cloned())
        }
        Expr::Field { target, field } => {
            let field = field.clone();
            match &**target {
                Expr::This => boxed(move |frame| ops::field(frame.this()?, &field)),
                Expr::Fact(n) => {
                    let n = *n;
                    boxed(move |frame| ops::field(frame.fact(n)?, &field))
                }
                other => {
                    let target = compile_expr(other);
                    boxed(move |frame| ops::field(&target(frame)?, &field))
                }
            }
        }
        Expr::Unary { op, operand } => {
            let op = *op;
            let operand = compile_expr(operand);
            boxed(move |frame| ops::unary(op, &operand(frame)?))
        }
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => {
            let lhs = compile_expr(lhs);
            let rhs = compile_expr(rhs);
            boxed(move |frame| {
                if !ops::condition(&lhs(frame)?)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(ops::condition(&rhs(frame)?)?))
            })
        }
        Expr::Binary {
            op: BinaryOp::Or,
            lhs,
            rhs,
        } => {
            let lhs = compile_expr(lhs);
            let rhs = compile_expr(rhs);
            boxed(move |frame| {
                if ops::condition(&lhs(frame)?)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(ops::condition(&rhs(frame)?)?))
            })
        }
        Expr::Binary { op, lhs, rhs } => {
            let op = *op;
            let lhs = compile_expr(lhs);
            match &**rhs {
                Expr::Const(constant) => {
                    let constant = constant.clone();
                    boxed(move |frame| ops::binary(op, &lhs(frame)?, &constant))
                }
                other => {
                    let rhs = compile_expr(other);
                    boxed(move |frame| ops::binary(op, &lhs(frame)?, &rhs(frame)?))
                }
            }
        }
        Expr::Method {
            target,
            method,
            args,
        } => {
            let method = *method;
            let target = compile_expr(target);
            let args = compile_all(args);
            boxed(move |frame| {
                let receiver = target(frame)?;
                let args = eval_all(&args, frame)?;
                ops::method(&receiver, method, &args)
            })
        }
        Expr::New {
            type_name,
            fields,
            args,
        } => {
            let type_name = type_name.clone();
            let fields = fields.clone();
            let args = compile_all(args);
            boxed(move |frame| ops::new_object(&type_name, &fields, eval_all(&args, frame)?))
        }
    }
}

fn compile_all(exprs: &[Expr]) -> Arc<[CompiledExpr]> {
    exprs.iter().map(compile_expr).collect()
}

fn eval_all(exprs: &[CompiledExpr], frame: &Frame<'_>) -> Result<Vec<Value>> {
    exprs.iter().map(|e| e(frame)).collect()
}

/// Compiles a statement list into a single closure.
#[must_use]
pub fn compile_block(stmts: &[Stmt]) -> CompiledAction {
    let compiled: Arc<[CompiledAction]> = stmts.iter().map(compile_stmt).collect();
    action(move |ctx| {
        for stmt in compiled.iter() {
            stmt(ctx)?;
        }
        Ok(())
    })
}

struct CompiledAssign {
    assign: FieldAssign,
    value: CompiledExpr,
}

impl CompiledAssign {
    fn new(assign: &FieldAssign) -> Self {
        Self {
            value: compile_expr(&assign.value),
            assign: assign.clone(),
        }
    }
}

fn compile_stmt(stmt: &Stmt) -> CompiledAction {
    match stmt {
        Stmt::Expr(expr) => {
            let expr = compile_expr(expr);
            action(move |ctx| {
                expr(&ctx.frame())?;
                Ok(())
            })
        }
        Stmt::Let { slot, ty, init }
        | Stmt::SetLocal {
            slot,
            ty,
            value: init,
        } => {
            let (slot, ty) = (*slot, ty.clone());
            let init = compile_expr(init);
            action(move |ctx| {
                let value = ty.coerce(init(&ctx.frame())?)?;
                ctx.set_local(slot, value);
                Ok(())
            })
        }
        Stmt::SetLocalField { slot, assign } => {
            let slot = *slot;
            let assign = CompiledAssign::new(assign);
            action(move |ctx| {
                let value = (assign.value)(&ctx.frame())?;
                ctx.assign_local_field(slot, &assign.assign, value)
            })
        }
        Stmt::SetFactField { pattern, assign } => {
            let pattern = *pattern;
            let assign = CompiledAssign::new(assign);
            action(move |ctx| {
                let value = (assign.value)(&ctx.frame())?;
                ctx.assign_fact_field(pattern, &assign.assign, value)
            })
        }
        Stmt::Insert(expr) => {
            let expr = compile_expr(expr);
            action(move |ctx| {
                let fact = expr(&ctx.frame())?;
                ctx.insert(fact)
            })
        }
        Stmt::Update(pattern) => {
            let pattern = *pattern;
            action(move |ctx| ctx.update(pattern))
        }
        Stmt::Retract(pattern) => {
            let pattern = *pattern;
            action(move |ctx| ctx.retract(pattern))
        }
        Stmt::Modify { pattern, assigns } => {
            let pattern = *pattern;
            let mask = ops::assigned_mask(assigns);
            let assigns: Vec<CompiledAssign> = assigns.iter().map(CompiledAssign::new).collect();
            action(move |ctx| {
                for assign in &assigns {
                    let value = (assign.value)(&ctx.frame())?;
                    ctx.assign_fact_field(pattern, &assign.assign, value)?;
                }
                ctx.commit_modify(pattern, mask.clone())
            })
        }
        Stmt::Print(expr) => {
            let expr = compile_expr(expr);
            action(move |ctx| {
                let value = expr(&ctx.frame())?;
                ctx.print(&value);
                Ok(())
            })
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond = compile_expr(cond);
            let then_branch = compile_block(then_branch);
            let else_branch = compile_block(else_branch);
            action(move |ctx| {
                if ops::condition(&cond(&ctx.frame())?)? {
                    then_branch(ctx)
                } else {
                    else_branch(ctx)
                }
            })
        }
    }
}
