//! Action handlers
//!
//! Each handler runs one action of the top frame. Handlers advance the
//! frame themselves, so `ask` can stay on its action while it waits.

use std::path::Path;

use super::store;
use super::types::{Control, Frame, Status};
use super::vm::Step;
use super::{Engine, EngineError};
use crate::expr::{eval_bool, eval_value, ExprError};
use crate::interpolate::interpolate;
use crate::types::{Action, Branch};

/// Dispatch one action.
pub fn execute_action(engine: &mut Engine, action: &Action) -> Result<Step, EngineError> {
    tracing::trace!(state = %engine.vm.state, action = action.keyword(), "executing");

    match action {
        Action::Reply { text } => execute_reply(engine, text),
        Action::Set { var, value } => {
            engine.vm.advance();
            engine.vm.context.insert(var.clone(), value.clone());
        }
        Action::SetExpr { var, expr } => execute_set_expr(engine, var, expr)?,
        Action::Ask { var, prompt } => return Ok(execute_ask(engine, var, prompt)),
        Action::Goto { target } => jump(engine, target),
        Action::IfGoto { left, right, target } => execute_if_goto(engine, left, right, target),
        Action::IfChain {
            branches,
            else_actions,
        } => execute_if_chain(engine, branches, else_actions.as_deref())?,
        Action::Save { var, path } => {
            engine.vm.advance();
            let value = engine.vm.context.get(var).cloned().unwrap_or_default();
            store::save_var(Path::new(path), var, &value);
        }
        Action::Load { var, path } => {
            engine.vm.advance();
            if let Some(value) = store::load_var(Path::new(path), var) {
                engine.vm.context.insert(var.clone(), value);
            }
        }
    }

    Ok(Step::Continue)
}

/* ===================== Output & Assignment ===================== */

fn execute_reply(engine: &mut Engine, text: &str) {
    engine.vm.advance();
    let line = interpolate(text, &engine.vm.context);
    engine.vm.buffer.push(line);
}

fn execute_set_expr(engine: &mut Engine, var: &str, expr: &str) -> Result<(), EngineError> {
    engine.vm.advance();
    let value = eval_value(expr, &engine.vm.context).map_err(|e| expression_error(engine, e))?;
    engine.vm.context.insert(var.to_string(), value.to_string());
    Ok(())
}

/* ===================== Ask ===================== */

/// Bound variables are skipped. Pending replies are flushed before the
/// prompt so they are pulled first; the handler is only consulted once the
/// buffer is empty.
fn execute_ask(engine: &mut Engine, var: &str, prompt: &str) -> Step {
    if engine.vm.context.contains_key(var) {
        engine.vm.advance();
        return Step::Continue;
    }

    if !engine.vm.buffer.is_empty() {
        engine.vm.flush();
        return Step::Continue;
    }

    match engine.ask.ask(var, prompt) {
        Some(answer) => {
            engine.vm.context.insert(var.to_string(), answer);
            engine.vm.last_asked = Some(var.to_string());
            engine.vm.advance();
            Step::Continue
        }
        None => {
            tracing::debug!(state = %engine.vm.state, var, "waiting for answer");
            engine.vm.status = Status::Awaiting {
                var: var.to_string(),
                prompt: prompt.to_string(),
            };
            Step::Suspended
        }
    }
}

/* ===================== Branching ===================== */

/// Record the target; the step loop unwinds the whole visit.
fn jump(engine: &mut Engine, target: &str) {
    engine.vm.control = Control::Goto(target.to_string());
}

fn execute_if_goto(engine: &mut Engine, left: &str, right: &str, target: &str) {
    engine.vm.advance();
    let value = engine.vm.context.get(left).map(String::as_str).unwrap_or("");
    if value == right {
        jump(engine, target);
    }
}

/// Push the body of the first branch whose condition holds, else the
/// else-body. Later conditions are never evaluated.
fn execute_if_chain(
    engine: &mut Engine,
    branches: &[Branch],
    else_actions: Option<&[Action]>,
) -> Result<(), EngineError> {
    engine.vm.advance();

    for branch in branches {
        let matched =
            eval_bool(&branch.condition, &engine.vm.context).map_err(|e| expression_error(engine, e))?;
        if matched {
            engine.vm.frames.push(Frame::new(branch.actions.clone()));
            return Ok(());
        }
    }

    if let Some(actions) = else_actions {
        engine.vm.frames.push(Frame::new(actions.to_vec()));
    }
    Ok(())
}

fn expression_error(engine: &Engine, source: ExprError) -> EngineError {
    EngineError::Expression {
        state: engine.vm.state.clone(),
        source,
    }
}
