//! Type definitions for the executor
//!
//! - Control flow and frames (Control, Frame)
//! - Visit phases and run status (VisitPhase, Status)

pub mod control;
pub mod phase;

pub use control::{Control, Frame};
pub use phase::{Status, TransitionReason, VisitPhase};
