//! Expression evaluation against a variable context

use std::cmp::Ordering;

use super::ast::{BinaryOp, CmpOp, Expr, UnaryOp};
use super::functions::call_function;
use super::value::Value;
use super::{ExprError, ExprResult};
use crate::types::Context;

/// Evaluate an expression to a value.
///
/// Boolean nodes (`and`, `or`, `not`, comparisons) evaluate to [`Value::Bool`].
pub(crate) fn eval_value(expr: &Expr, ctx: &Context) -> ExprResult<Value> {
    match expr {
        Expr::Num(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Var(name) => Ok(Value::String(ctx.get(name).cloned().unwrap_or_default())),
        Expr::Unary { op, operand } => {
            let value = eval_value(operand, ctx)?;
            let n = value.as_number().ok_or_else(|| ExprError::NonNumeric {
                op: op.symbol(),
                value: value.to_string(),
            })?;
            Ok(Value::Number(match op {
                UnaryOp::Pos => n,
                UnaryOp::Neg => -n,
            }))
        }
        Expr::Binary { op, left, right } => {
            let left = eval_value(left, ctx)?;
            let right = eval_value(right, ctx)?;
            binary(*op, &left, &right)
        }
        Expr::Call { func, args } => {
            let args = args
                .iter()
                .map(|arg| eval_value(arg, ctx))
                .collect::<ExprResult<Vec<_>>>()?;
            call_function(*func, &args)
        }
        Expr::And(_) | Expr::Or(_) | Expr::Not(_) | Expr::Compare { .. } => {
            Ok(Value::Bool(eval_bool(expr, ctx)?))
        }
    }
}

/// Evaluate an expression as a condition.
///
/// `and`/`or` short-circuit, comparison chains stop at the first failing pair,
/// any other node is tested for truthiness.
pub(crate) fn eval_bool(expr: &Expr, ctx: &Context) -> ExprResult<bool> {
    match expr {
        Expr::And(operands) => {
            for operand in operands {
                if !eval_bool(operand, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::Or(operands) => {
            for operand in operands {
                if eval_bool(operand, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expr::Not(operand) => Ok(!eval_bool(operand, ctx)?),
        Expr::Compare { first, rest } => {
            let mut left = eval_value(first, ctx)?;
            for (op, operand) in rest {
                let right = eval_value(operand, ctx)?;
                if !compare(*op, &left, &right) {
                    return Ok(false);
                }
                left = right;
            }
            Ok(true)
        }
        _ => Ok(eval_value(expr, ctx)?.is_truthy()),
    }
}

/* ===================== Operators ===================== */

fn binary(op: BinaryOp, left: &Value, right: &Value) -> ExprResult<Value> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return arithmetic(op, a, b).map(Value::Number);
    }

    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        _ => Err(ExprError::UnsupportedOperands {
            op: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> ExprResult<f64> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => Err(ExprError::DivisionByZero),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::FloorDiv => Ok((a / b).floor()),
        BinaryOp::Mod => {
            // result takes the sign of the divisor
            let r = a % b;
            Ok(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
        }
    }
}

/// Numeric when both sides coerce to numbers, lexicographic otherwise.
fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(left.to_string().cmp(&right.to_string())),
    };

    let Some(ordering) = ordering else {
        return op == CmpOp::Ne;
    };

    match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    }
}
