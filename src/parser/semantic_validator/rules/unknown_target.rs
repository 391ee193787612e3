//! Rule: Unknown Target
//!
//! Reports an error for a `goto` (or legacy `if ... goto`) naming a state
//! the flow does not define. Taking such a jump stops the run.
//!
//! ```text
//! flow main
//! state a
//!   goto b        # error: no state 'b' in flow 'main'
//! ```

use crate::types::Program;

use super::super::{Location, ValidationError, ValidationRule};
use super::{jump_target, walk_actions};

pub struct UnknownTargetRule;

impl ValidationRule for UnknownTargetRule {
    fn id(&self) -> &'static str {
        "unknown-target"
    }

    fn description(&self) -> &'static str {
        "Jump targets must be states of the same flow"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for flow in program.flows.values() {
            for state in flow.states.values() {
                walk_actions(&state.actions, &mut |action| {
                    let Some(target) = jump_target(action) else {
                        return;
                    };
                    if !flow.has_state(target) {
                        errors.push(ValidationError::error(
                            Location::state(&flow.name, state),
                            format!("no state '{}' in flow '{}'", target, flow.name),
                            self.id(),
                        ));
                    }
                });
            }
        }

        errors
    }
}
