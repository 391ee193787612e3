//! Built-in functions callable from expressions
//!
//! The set is closed: a call to any other name is rejected while the
//! expression is being built, before anything is evaluated.

use super::value::Value;
use super::{ExprError, ExprResult};

/* ===================== Function Identifiers ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Len,
    Abs,
    Int,
    Float,
    Str,
    Upper,
    Lower,
    Title,
    Trim,
    Min,
    Max,
    Contains,
}

impl Function {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "len" => Function::Len,
            "abs" => Function::Abs,
            "int" => Function::Int,
            "float" => Function::Float,
            "str" => Function::Str,
            "upper" => Function::Upper,
            "lower" => Function::Lower,
            "title" => Function::Title,
            "trim" => Function::Trim,
            "min" => Function::Min,
            "max" => Function::Max,
            "contains" => Function::Contains,
            _ => return None,
        };
        Some(func)
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Function::Len => "len",
            Function::Abs => "abs",
            Function::Int => "int",
            Function::Float => "float",
            Function::Str => "str",
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Title => "title",
            Function::Trim => "trim",
            Function::Min => "min",
            Function::Max => "max",
            Function::Contains => "contains",
        }
    }

    pub(crate) fn arity(self) -> usize {
        match self {
            Function::Min | Function::Max | Function::Contains => 2,
            _ => 1,
        }
    }
}

/* ===================== Dispatcher ===================== */

/// Call a built-in with already evaluated arguments.
///
/// Arity was checked when the call node was built.
pub(crate) fn call_function(func: Function, args: &[Value]) -> ExprResult<Value> {
    let [first, rest @ ..] = args else {
        return Err(ExprError::Arity {
            function: func.name(),
            expected: func.arity(),
            found: 0,
        });
    };

    match func {
        Function::Len => Ok(Value::Number(first.to_string().chars().count() as f64)),
        Function::Abs => Ok(Value::Number(numeric(func, first)?.abs())),
        Function::Int => Ok(Value::Number(numeric(func, first)?.trunc())),
        Function::Float => Ok(Value::Number(numeric(func, first)?)),
        Function::Str => Ok(Value::String(first.to_string())),
        Function::Upper => Ok(Value::String(first.to_string().to_uppercase())),
        Function::Lower => Ok(Value::String(first.to_string().to_lowercase())),
        Function::Title => Ok(Value::String(title_case(&first.to_string()))),
        Function::Trim => Ok(Value::String(first.to_string().trim().to_string())),
        Function::Min | Function::Max | Function::Contains => {
            let second = rest.first().ok_or(ExprError::Arity {
                function: func.name(),
                expected: func.arity(),
                found: args.len(),
            })?;
            Ok(binary_function(func, first, second))
        }
    }
}

fn binary_function(func: Function, first: &Value, second: &Value) -> Value {
    if func == Function::Contains {
        return Value::Bool(first.to_string().contains(&second.to_string()));
    }

    if let (Some(a), Some(b)) = (first.as_number(), second.as_number()) {
        return Value::Number(if func == Function::Min { a.min(b) } else { a.max(b) });
    }

    let (a, b) = (first.to_string(), second.to_string());
    let pick_first = if func == Function::Min { a <= b } else { a >= b };
    Value::String(if pick_first { a } else { b })
}

fn numeric(func: Function, value: &Value) -> ExprResult<f64> {
    value.as_number().ok_or_else(|| ExprError::NonNumeric {
        op: func.name(),
        value: value.to_string(),
    })
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
