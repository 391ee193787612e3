//! Virtual Machine state
//!
//! The VM holds all run state of one engine:
//! - position: flow, current state, visit phase and frame stack
//! - control: pending transition for the current visit
//! - data: context, visit counters, transition count
//! - output: lines buffered for this visit and lines ready to be pulled
//!
//! Everything here serializes, so a VM doubles as the snapshot format for
//! hosts that persist a conversation between requests.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use super::types::{Control, Frame, Status, VisitPhase};
use crate::types::Context;

/* ===================== VM ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VM {
    /// Flow being run
    pub flow: String,

    /// State currently being visited (or about to be entered)
    pub state: String,

    pub phase: VisitPhase,

    /// Stack of action lists for the current visit
    pub frames: Vec<Frame>,

    /// Pending control flow for the current visit
    pub control: Control,

    pub context: Context,

    /// Visits per state, never reset
    pub visits: HashMap<String, u32>,

    /// Transitions taken over the whole run
    pub transitions: usize,

    /// Variable answered by the latest `ask` of this visit
    pub last_asked: Option<String>,

    /// Replies of the current visit that have not been flushed yet
    pub buffer: Vec<String>,

    /// Flushed lines waiting to be pulled
    pub outbox: VecDeque<String>,

    pub status: Status,
}

impl VM {
    /// Create a VM positioned before the first visit of `entry`.
    pub fn new(flow: &str, entry: &str, context: Context) -> Self {
        VM {
            flow: flow.to_string(),
            state: entry.to_string(),
            phase: VisitPhase::Enter,
            frames: vec![],
            control: Control::None,
            context,
            visits: HashMap::new(),
            transitions: 0,
            last_asked: None,
            buffer: vec![],
            outbox: VecDeque::new(),
            status: Status::Ready,
        }
    }

    /// Move buffered replies to the outbox, preserving order.
    pub fn flush(&mut self) {
        self.outbox.extend(self.buffer.drain(..));
    }

    pub fn visit_count(&self, state: &str) -> u32 {
        self.visits.get(state).copied().unwrap_or(0)
    }

    /// Advance the top frame past its current action.
    pub fn advance(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.idx += 1;
        }
    }
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Waiting for an answer the ask handler could not give yet
    Suspended,
    /// Run is over (halted or failed)
    Done,
}
