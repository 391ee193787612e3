//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `unknown_target.rs` - Jumps to states the flow doesn't define
//! - `invalid_expression.rs` - Conditions and `set` expressions outside the grammar
//! - `unreachable_action.rs` - Actions after an unconditional `goto`
//! - `unreachable_state.rs` - States nothing can transition to
//! - `empty_flow.rs` - Flows without states

mod empty_flow;
mod invalid_expression;
mod unknown_target;
mod unreachable_action;
mod unreachable_state;

pub use empty_flow::EmptyFlowRule;
pub use invalid_expression::InvalidExpressionRule;
pub use unknown_target::UnknownTargetRule;
pub use unreachable_action::UnreachableActionRule;
pub use unreachable_state::UnreachableStateRule;

use crate::types::Action;

/// Visit every action, descending into branch and else bodies.
fn walk_actions<'a>(actions: &'a [Action], visit: &mut impl FnMut(&'a Action)) {
    for action in actions {
        visit(action);
        if let Action::IfChain {
            branches,
            else_actions,
        } = action
        {
            for branch in branches {
                walk_actions(&branch.actions, visit);
            }
            if let Some(actions) = else_actions {
                walk_actions(actions, visit);
            }
        }
    }
}

/// Target of a `goto` or legacy `if ... goto`.
fn jump_target(action: &Action) -> Option<&str> {
    match action {
        Action::Goto { target } | Action::IfGoto { target, .. } => Some(target.as_str()),
        _ => None,
    }
}
