//! Tree-walking evaluation of the resolved IR.

use rulebook_foundation::{Result, Value};
use rulebook_language::BinaryOp;

use crate::consequence::ConsequenceContext;
use crate::evaluator::Frame;
use crate::ir::{Expr, Stmt};
use crate::ops;

/// Evaluates an expression.
///
/// # Errors
/// Returns any evaluation error raised by the expression.
pub fn eval(expr: &Expr, frame: &Frame<'_>) -> Result<Value> {
    match expr {
        Expr::Const(v) => Ok(v.clone()),
        Expr::This => frame.this().cloned(),
        Expr::Fact(n) => frame.fact(*n).cloned(),
        Expr::Local(slot) => frame.local(*slot).cloned(),
        Expr::Field { target, field } => match &**target {
            // Avoid cloning the whole fact for a single field read.
            Expr::This => ops::field(frame.this()?, field),
            Expr::Fact(n) => ops::field(frame.fact(*n)?, field),
            other => ops::field(&eval(other, frame)?, field),
        },
        Expr::Unary { op, operand } => ops::unary(*op, &eval(operand, frame)?),
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => {
            if !ops::condition(&eval(lhs, frame)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(ops::condition(&eval(rhs, frame)?)?))
        }
        Expr::Binary {
            op: BinaryOp::Or,
            lhs,
            rhs,
        } => {
            if ops::condition(&eval(lhs, frame)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(ops::condition(&eval(rhs, frame)?)?))
        }
        Expr::Binary { op, lhs, rhs } => ops::binary(*op, &eval(lhs, frame)?, &eval(rhs, frame)?),
        Expr::Method {
            target,
            method,
            args,
        } => {
            let target = eval(target, frame)?;
            let args = args
                .iter()
                .map(|a| eval(a, frame))
                .collect::<Result<Vec<_>>>()?;
            ops::method(&target, *method, &args)
        }
        Expr::New {
            type_name,
            fields,
            args,
        } => {
            let args = args
                .iter()
                .map(|a| eval(a, frame))
                .collect::<Result<Vec<_>>>()?;
            ops::new_object(type_name, fields, args)
        }
    }
}

/// Executes a statement list.
///
/// # Errors
/// Returns the first evaluation or working memory error.
pub fn exec_block(stmts: &[Stmt], ctx: &mut ConsequenceContext<'_>) -> Result<()> {
    for stmt in stmts {
        exec(stmt, ctx)?;
    }
    Ok(())
}

fn exec(stmt: &Stmt, ctx: &mut ConsequenceContext<'_>) -> Result<()> {
    match stmt {
        Stmt::Expr(expr) => {
            eval(expr, &ctx.frame())?;
            Ok(())
        }
        Stmt::Let { slot, ty, init } | Stmt::SetLocal {
            slot,
            ty,
            value: init,
        } => {
            let value = ty.coerce(eval(init, &ctx.frame())?)?;
            ctx.set_local(*slot, value);
            Ok(())
        }
        Stmt::SetLocalField { slot, assign } => {
            let value = eval(&assign.value, &ctx.frame())?;
            ctx.assign_local_field(*slot, assign, value)
        }
        Stmt::SetFactField { pattern, assign } => {
            let value = eval(&assign.value, &ctx.frame())?;
            ctx.assign_fact_field(*pattern, assign, value)
        }
        Stmt::Insert(expr) => {
            let fact = eval(expr, &ctx.frame())?;
            ctx.insert(fact)
        }
        Stmt::Update(pattern) => ctx.update(*pattern),
        Stmt::Retract(pattern) => ctx.retract(*pattern),
        Stmt::Modify { pattern, assigns } => {
            for assign in assigns {
                let value = eval(&assign.value, &ctx.frame())?;
                ctx.assign_fact_field(*pattern, assign, value)?;
            }
            ctx.commit_modify(*pattern, ops::assigned_mask(assigns))
        }
        Stmt::Print(expr) => {
            let value = eval(expr, &ctx.frame())?;
            ctx.print(&value);
            Ok(())
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if ops::condition(&eval(cond, &ctx.frame())?)? {
                exec_block(then_branch, ctx)
            } else {
                exec_block(else_branch, ctx)
            }
        }
    }
}
