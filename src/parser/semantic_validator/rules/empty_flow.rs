//! Rule: Empty Flow
//!
//! Reports a warning for a flow without states. It parses, but an engine
//! can't be built for it.

use crate::types::Program;

use super::super::{Location, ValidationError, ValidationRule};

pub struct EmptyFlowRule;

impl ValidationRule for EmptyFlowRule {
    fn id(&self) -> &'static str {
        "empty-flow"
    }

    fn description(&self) -> &'static str {
        "Flows need at least one state to run"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        program
            .flows
            .values()
            .filter(|flow| flow.states.is_empty())
            .map(|flow| {
                ValidationError::warning(
                    Location::flow(&flow.name),
                    format!("flow '{}' has no states", flow.name),
                    self.id(),
                )
            })
            .collect()
    }
}
