//! Rule: Unreachable State
//!
//! Reports a warning for a state that no jump leads to. The entry state and
//! the conventional fallback states are always reachable. Flows that `ask`
//! are skipped, since an intent classifier may route to any state.

use std::collections::HashSet;

use crate::executor::DEFAULT_FALLBACK_STATES;
use crate::types::{Action, Program};

use super::super::{Location, ValidationError, ValidationRule};
use super::{jump_target, walk_actions};

pub struct UnreachableStateRule;

impl ValidationRule for UnreachableStateRule {
    fn id(&self) -> &'static str {
        "unreachable-state"
    }

    fn description(&self) -> &'static str {
        "Every state should be reachable from the entry state"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for flow in program.flows.values() {
            let Some(entry) = flow.entry_state() else {
                continue;
            };

            let mut targets: HashSet<&str> = HashSet::new();
            let mut asks = false;
            for state in flow.states.values() {
                walk_actions(&state.actions, &mut |action| {
                    if matches!(action, Action::Ask { .. }) {
                        asks = true;
                    }
                    if let Some(target) = jump_target(action) {
                        targets.insert(target);
                    }
                });
            }
            if asks {
                continue;
            }

            for state in flow.states.values() {
                let reachable = state.name == entry.name
                    || targets.contains(state.name.as_str())
                    || DEFAULT_FALLBACK_STATES.contains(&state.name.as_str());
                if !reachable {
                    errors.push(ValidationError::warning(
                        Location::state(&flow.name, state),
                        format!("state '{}' is never entered", state.name),
                        self.id(),
                    ));
                }
            }
        }

        errors
    }
}
