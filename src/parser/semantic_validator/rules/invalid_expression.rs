//! Rule: Invalid Expression
//!
//! Reports an error for an `if`/`elif` condition or `set` expression that
//! the expression language rejects: unknown functions, wrong arity,
//! attribute access, subscripts or plain syntax errors.

use crate::expr::validate_expression;
use crate::types::{Action, Program};

use super::super::{Location, ValidationError, ValidationRule};
use super::walk_actions;

pub struct InvalidExpressionRule;

impl ValidationRule for InvalidExpressionRule {
    fn id(&self) -> &'static str {
        "invalid-expression"
    }

    fn description(&self) -> &'static str {
        "Conditions and computed values must use the expression language"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for flow in program.flows.values() {
            for state in flow.states.values() {
                walk_actions(&state.actions, &mut |action| {
                    let sources: Vec<&str> = match action {
                        Action::SetExpr { expr, .. } => vec![expr.as_str()],
                        Action::IfChain { branches, .. } => {
                            branches.iter().map(|b| b.condition.as_str()).collect()
                        }
                        _ => return,
                    };

                    for source in sources {
                        if let Err(e) = validate_expression(source) {
                            errors.push(ValidationError::error(
                                Location::state(&flow.name, state),
                                e.to_string(),
                                self.id(),
                            ));
                        }
                    }
                });
            }
        }

        errors
    }
}
