//! Rule: Unreachable Action
//!
//! Reports a warning for actions that follow an unconditional `goto` in
//! the same action list. They can never run.

use crate::types::{Action, Flow, Program, State};

use super::super::{Location, ValidationError, ValidationRule};

pub struct UnreachableActionRule;

impl ValidationRule for UnreachableActionRule {
    fn id(&self) -> &'static str {
        "unreachable-action"
    }

    fn description(&self) -> &'static str {
        "Actions after an unconditional goto never run"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for flow in program.flows.values() {
            for state in flow.states.values() {
                check_list(self.id(), flow, state, &state.actions, &mut errors);
            }
        }
        errors
    }
}

fn check_list(rule_id: &'static str, flow: &Flow, state: &State, actions: &[Action], errors: &mut Vec<ValidationError>) {
    if let Some(pos) = actions.iter().position(|a| matches!(a, Action::Goto { .. })) {
        let dead = actions.len() - pos - 1;
        if dead > 0 {
            errors.push(ValidationError::warning(
                Location::state(&flow.name, state),
                format!("{} action(s) after 'goto' will never run", dead),
                rule_id,
            ));
        }
    }

    for action in actions {
        if let Action::IfChain {
            branches,
            else_actions,
        } = action
        {
            for branch in branches {
                check_list(rule_id, flow, state, &branch.actions, errors);
            }
            if let Some(actions) = else_actions {
                check_list(rule_id, flow, state, actions, errors);
            }
        }
    }
}
