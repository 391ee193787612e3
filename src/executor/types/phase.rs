//! Visit phases and run status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the engine is within one state visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VisitPhase {
    /// Count the visit and load the state's actions
    Enter = 0,
    /// Run actions from the frame stack
    Execute = 1,
    /// Flush output and pick the next state
    Resolve = 2,
}

/// Externally visible run status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Status {
    /// Built, nothing pulled yet
    Ready,
    Running,
    /// Suspended inside `ask`: the answer was not available yet
    Awaiting { var: String, prompt: String },
    /// No next state could be resolved
    Halted,
    /// A fatal error stopped the run
    Failed { error: String },
}

/// Why a transition was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    Explicit,
    Classifier,
    Fallback,
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransitionReason::Explicit => "explicit",
            TransitionReason::Classifier => "classifier",
            TransitionReason::Fallback => "fallback",
        })
    }
}
