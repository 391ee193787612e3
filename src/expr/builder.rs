//! pest parse tree -> [`Expr`]

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use super::ast::{BinaryOp, CmpOp, Expr, UnaryOp};
use super::functions::Function;
use super::{ExprError, ExprResult};

#[derive(Parser)]
#[grammar = "expr/expr.pest"]
struct ExprParser;

/* ===================== Public API ===================== */

pub(crate) fn parse_expression(source: &str) -> ExprResult<Expr> {
    let mut pairs =
        ExprParser::parse(Rule::expression, source).map_err(|err| pest_error(source, err))?;

    // expression = { SOI ~ or_expr ~ EOI }
    let expression = next_pair(&mut pairs, source)?;
    let mut inner = expression.into_inner();
    let body = next_pair(&mut inner, source)?;
    build_expression(body, source)
}

/* ===================== Builders ===================== */

fn build_expression(pair: Pair<Rule>, source: &str) -> ExprResult<Expr> {
    match pair.as_rule() {
        Rule::or_expr => build_variadic(pair, source, Rule::op_or, Expr::Or),
        Rule::and_expr => build_variadic(pair, source, Rule::op_and, Expr::And),
        Rule::not_expr => {
            let mut inner = pair.into_inner();
            let first = next_pair(&mut inner, source)?;
            if first.as_rule() == Rule::op_not {
                let operand = next_pair(&mut inner, source)?;
                Ok(Expr::Not(Box::new(build_expression(operand, source)?)))
            } else {
                build_expression(first, source)
            }
        }
        Rule::comparison => build_comparison(pair, source),
        Rule::sum | Rule::product => build_binary(pair, source),
        Rule::unary => build_unary(pair, source),
        Rule::call => build_call(pair, source),
        Rule::number => {
            let text = pair.as_str();
            text.parse::<f64>()
                .map(Expr::Num)
                .map_err(|e| syntax(source, format!("invalid number '{}': {}", text, e)))
        }
        Rule::string => {
            let mut inner = pair.into_inner();
            let content = next_pair(&mut inner, source)?;
            Ok(Expr::Str(unescape(content.as_str())))
        }
        Rule::identifier => {
            let name = pair.as_str();
            Ok(match name.to_ascii_lowercase().as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" => Expr::Null,
                _ => Expr::Var(name.to_string()),
            })
        }
        rule => Err(syntax(source, format!("unexpected {:?}", rule))),
    }
}

/// `a or b or c` -> `Or([a, b, c])`; a single operand is returned unwrapped.
fn build_variadic(
    pair: Pair<Rule>,
    source: &str,
    separator: Rule,
    wrap: fn(Vec<Expr>) -> Expr,
) -> ExprResult<Expr> {
    let mut operands = pair
        .into_inner()
        .filter(|p| p.as_rule() != separator)
        .map(|p| build_expression(p, source))
        .collect::<ExprResult<Vec<_>>>()?;

    if operands.len() == 1 {
        Ok(operands.remove(0))
    } else {
        Ok(wrap(operands))
    }
}

fn build_comparison(pair: Pair<Rule>, source: &str) -> ExprResult<Expr> {
    let mut inner = pair.into_inner();
    let first = build_expression(next_pair(&mut inner, source)?, source)?;

    let mut rest = Vec::new();
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_rule() {
            Rule::op_eq => CmpOp::Eq,
            Rule::op_ne => CmpOp::Ne,
            Rule::op_lt => CmpOp::Lt,
            Rule::op_le => CmpOp::Le,
            Rule::op_gt => CmpOp::Gt,
            Rule::op_ge => CmpOp::Ge,
            rule => return Err(syntax(source, format!("expected comparison operator, got {:?}", rule))),
        };
        let operand = build_expression(next_pair(&mut inner, source)?, source)?;
        rest.push((op, operand));
    }

    if rest.is_empty() {
        Ok(first)
    } else {
        Ok(Expr::Compare {
            first: Box::new(first),
            rest,
        })
    }
}

/// Left-associative fold of `operand (op operand)*`.
fn build_binary(pair: Pair<Rule>, source: &str) -> ExprResult<Expr> {
    let mut inner = pair.into_inner();
    let mut left = build_expression(next_pair(&mut inner, source)?, source)?;

    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_rule() {
            Rule::op_add => BinaryOp::Add,
            Rule::op_sub => BinaryOp::Sub,
            Rule::op_mul => BinaryOp::Mul,
            Rule::op_div => BinaryOp::Div,
            Rule::op_floor_div => BinaryOp::FloorDiv,
            Rule::op_mod => BinaryOp::Mod,
            rule => return Err(syntax(source, format!("expected operator, got {:?}", rule))),
        };
        let right = build_expression(next_pair(&mut inner, source)?, source)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    Ok(left)
}

/// `unary_op* primary`; operators apply innermost-last, so fold from the right.
fn build_unary(pair: Pair<Rule>, source: &str) -> ExprResult<Expr> {
    let mut parts: Vec<Pair<Rule>> = pair.into_inner().collect();
    let primary = parts
        .pop()
        .ok_or_else(|| syntax(source, "missing operand".to_string()))?;
    let mut expr = build_expression(primary, source)?;

    for op_pair in parts.into_iter().rev() {
        let op = match op_pair.as_rule() {
            Rule::op_pos => UnaryOp::Pos,
            Rule::op_neg => UnaryOp::Neg,
            rule => return Err(syntax(source, format!("expected unary operator, got {:?}", rule))),
        };
        expr = Expr::Unary {
            op,
            operand: Box::new(expr),
        };
    }

    Ok(expr)
}

fn build_call(pair: Pair<Rule>, source: &str) -> ExprResult<Expr> {
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, source)?.as_str();

    let func = Function::from_name(name).ok_or_else(|| ExprError::UnknownFunction {
        name: name.to_string(),
    })?;

    let args = inner
        .map(|arg| build_expression(arg, source))
        .collect::<ExprResult<Vec<_>>>()?;

    if args.len() != func.arity() {
        return Err(ExprError::Arity {
            function: func.name(),
            expected: func.arity(),
            found: args.len(),
        });
    }

    Ok(Expr::Call { func, args })
}

/* ===================== Helpers ===================== */

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, source: &str) -> ExprResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| syntax(source, "unexpected end of expression".to_string()))
}

fn syntax(source: &str, message: String) -> ExprError {
    ExprError::Syntax {
        expr: source.to_string(),
        message,
    }
}

fn pest_error(source: &str, err: pest::error::Error<Rule>) -> ExprError {
    let col = match err.line_col {
        pest::error::LineColLocation::Pos((_, col)) => col,
        pest::error::LineColLocation::Span((_, col), _) => col,
    };
    syntax(source, format!("{} at column {}", err.variant.message(), col))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other @ ('\\' | '"' | '\'')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
