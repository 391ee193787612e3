//! Restricted expression language
//!
//! Used for `if`/`elif` conditions and `set <var> = <expr>`. Source text is
//! parsed by a small pest grammar into a closed expression tree; anything
//! the grammar does not describe (attribute access, subscripts, calls to
//! functions outside the built-in list, assignment) is rejected before
//! evaluation starts.
//!
//! Variables are read from the engine's [`Context`]. Their values are strings;
//! arithmetic and comparisons recover numbers by best-effort parsing.
//!
//! ```
//! use flowtalk_core::expr::{eval_bool, eval_value, Value};
//! use flowtalk_core::Context;
//!
//! let mut ctx = Context::new();
//! ctx.insert("age".to_string(), "30".to_string());
//!
//! assert_eq!(eval_value("age + 1", &ctx).unwrap(), Value::Number(31.0));
//! assert!(eval_bool("18 <= age < 65 and contains(\"abc\", \"b\")", &ctx).unwrap());
//! ```

mod ast;
mod builder;
mod eval;
mod functions;
mod value;


pub use value::Value;

pub(crate) use functions::title_case;

use crate::types::Context;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("invalid expression `{expr}`: {message}")]
    Syntax { expr: String, message: String },

    #[error("function '{name}' is not allowed")]
    UnknownFunction { name: String },

    #[error("{function}() takes {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("unsupported operand types for {op}: {left} and {right}")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("{op} expects a number, got '{value}'")]
    NonNumeric { op: &'static str, value: String },

    #[error("division by zero")]
    DivisionByZero,
}

pub type ExprResult<T> = Result<T, ExprError>;

/* ===================== Public API ===================== */

/// Check that `source` belongs to the expression grammar without evaluating it.
pub fn validate_expression(source: &str) -> ExprResult<()> {
    builder::parse_expression(source).map(|_| ())
}

/// Evaluate a value expression.
pub fn eval_value(source: &str, ctx: &Context) -> ExprResult<Value> {
    let expr = builder::parse_expression(source)?;
    eval::eval_value(&expr, ctx)
}

/// Evaluate a boolean expression.
pub fn eval_bool(source: &str, ctx: &Context) -> ExprResult<bool> {
    let expr = builder::parse_expression(source)?;
    eval::eval_bool(&expr, ctx)
}
