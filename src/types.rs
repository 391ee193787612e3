//! Program model produced by the parser and interpreted by the executor

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variable store for one engine run. Values are always strings.
pub type Context = HashMap<String, String>;

/// A parsed source file: every flow it declares, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub flows: IndexMap<String, Flow>,
}

impl Program {
    pub fn flow(&self, name: &str) -> Option<&Flow> {
        self.flows.get(name)
    }
}

/// A named state machine. The first inserted state is the entry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub states: IndexMap<String, State>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: IndexMap::new(),
        }
    }

    pub fn entry_state(&self) -> Option<&State> {
        self.states.values().next()
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn state_names(&self) -> Vec<String> {
        self.states.keys().cloned().collect()
    }
}

/// A node of a flow holding its actions in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    /// 1-based source line of the `state` header
    pub line: usize,
    pub actions: Vec<Action>,
}

/// One instruction inside a state.
///
/// Conditions and expressions are kept as source text; the executor hands
/// them to the expression evaluator when they run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Reply {
        text: String,
    },
    Set {
        var: String,
        value: String,
    },
    SetExpr {
        var: String,
        expr: String,
    },
    Ask {
        var: String,
        prompt: String,
    },
    Goto {
        target: String,
    },
    /// Legacy single-line `if <var> == "<value>" goto <target>`
    IfGoto {
        left: String,
        right: String,
        target: String,
    },
    IfChain {
        branches: Vec<Branch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_actions: Option<Vec<Action>>,
    },
    Save {
        var: String,
        path: String,
    },
    Load {
        var: String,
        path: String,
    },
}

/// One `if`/`elif` arm of an [`Action::IfChain`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: String,
    pub actions: Vec<Action>,
}

impl Action {
    /// Short keyword used in logs and diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Reply { .. } => "reply",
            Action::Set { .. } | Action::SetExpr { .. } => "set",
            Action::Ask { .. } => "ask",
            Action::Goto { .. } => "goto",
            Action::IfGoto { .. } | Action::IfChain { .. } => "if",
            Action::Save { .. } => "save",
            Action::Load { .. } => "load",
        }
    }
}
