//! Control flow and execution frame types

use serde::{Deserialize, Serialize};

use crate::types::Action;

/* ===================== Control Flow ===================== */

/// Pending control flow for the current state visit.
///
/// A `Goto` abandons every frame of the visit, including enclosing
/// `if` bodies, and is consumed when the next state is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Control {
    #[default]
    None,
    Goto(String),
}

/* ===================== Frames ===================== */

/// One action list being executed: a state body or a branch body.
///
/// The frame stack replaces recursion so a visit can stop at an `ask`
/// and continue later from exactly the same action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub body: Vec<Action>,
    /// Index of the next action to run
    pub idx: usize,
}

impl Frame {
    pub fn new(body: Vec<Action>) -> Self {
        Self { body, idx: 0 }
    }

    pub fn current(&self) -> Option<&Action> {
        self.body.get(self.idx)
    }
}
