//! Execution engine
//!
//! Runs one flow of a [`Program`] as a resumable state machine. Output is
//! pulled through [`Run`], an iterator of lines: the engine only advances as
//! far as the consumer pulls, and an `ask` whose answer is not available
//! yet suspends the run until the next pull.
//!
//! ## Module Organization
//! - `vm` - serializable run state, also used as the snapshot format
//! - `exec_loop` - step() and the three visit phases
//! - `statements` - per-action handlers
//! - `collaborators` - ask handlers and intent classifiers
//! - `store` - JSON files behind `save` and `load`

pub mod collaborators;
pub mod exec_loop;
pub mod statements;
pub mod store;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

pub use collaborators::{
    AskHandler, IntentClassifier, KeywordClassifier, NoInput, NoopClassifier, ScriptedAnswers, TerminalAsk,
};
pub use types::Status;
pub use vm::VM;

/// Serialized form of a suspended or finished run
pub type Snapshot = VM;

use crate::expr::ExprError;
use crate::types::{Context, Flow, Program};
use vm::Step;

/// Default ceiling on transitions over a whole run
pub const DEFAULT_MAX_TRANSITIONS: usize = 2000;

/// Conventional fallback state names, in preference order
pub const DEFAULT_FALLBACK_STATES: [&str; 3] = ["fallback", "unknown", "end"];

/* ===================== Error Types ===================== */

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("flow '{flow}' not found")]
    FlowNotFound { flow: String },

    #[error("flow '{flow}' has no states")]
    EmptyFlow { flow: String },

    #[error("state '{state}' does not exist in this flow")]
    UnknownState { state: String, from: Option<String> },

    #[error("in state '{state}': {source}")]
    Expression {
        state: String,
        #[source]
        source: ExprError,
    },

    #[error("too many transitions (limit {limit}), the flow probably loops forever")]
    RunawayTransitions { limit: usize },
}

/* ===================== Options ===================== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Flow to run
    pub flow: String,
    pub max_transitions: usize,
    /// Candidate fallback states; the first one the flow defines wins
    pub fallback_states: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            flow: "main".to_string(),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
            fallback_states: DEFAULT_FALLBACK_STATES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/* ===================== Engine ===================== */

pub struct Engine {
    pub(crate) program: Arc<Program>,
    pub(crate) vm: VM,
    pub(crate) options: EngineOptions,
    pub(crate) fallback: Option<String>,
    pub(crate) ask: Box<dyn AskHandler>,
    pub(crate) classifier: Box<dyn IntentClassifier>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("vm", &self.vm)
            .field("options", &self.options)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn builder(program: Arc<Program>) -> EngineBuilder {
        EngineBuilder::new(program)
    }

    /// Engine for `flow` with an empty context and no ask handler.
    pub fn new(program: Arc<Program>, flow: &str) -> Result<Self, EngineError> {
        Self::builder(program).flow(flow).build()
    }

    /// Builder that continues from `snapshot`. Collaborators still have to
    /// be supplied again.
    pub fn restore(program: Arc<Program>, snapshot: Snapshot) -> EngineBuilder {
        Self::builder(program).resume(snapshot)
    }

    /// Pull output lines. See [`Run`].
    pub fn run(&mut self) -> Run<'_> {
        Run { engine: self }
    }

    /// Pull everything available until the run halts or suspends.
    pub fn run_to_end(&mut self) -> Result<Vec<String>, EngineError> {
        exec_loop::run_until_done(self)
    }

    pub fn status(&self) -> &Status {
        &self.vm.status
    }

    /// True once the engine decided there is no next state.
    pub fn is_ended(&self) -> bool {
        self.vm.status == Status::Halted
    }

    /// `(var, prompt)` of the ask the run is suspended on.
    pub fn awaiting(&self) -> Option<(&str, &str)> {
        match &self.vm.status {
            Status::Awaiting { var, prompt } => Some((var.as_str(), prompt.as_str())),
            _ => None,
        }
    }

    pub fn flow_name(&self) -> &str {
        &self.vm.flow
    }

    pub fn current_state(&self) -> &str {
        &self.vm.state
    }

    pub fn context(&self) -> &Context {
        &self.vm.context
    }

    pub fn visit_count(&self, state: &str) -> u32 {
        self.vm.visit_count(state)
    }

    pub fn transitions(&self) -> usize {
        self.vm.transitions
    }

    pub fn fallback_state(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    pub fn set_ask_handler(&mut self, ask: impl AskHandler + 'static) {
        self.ask = Box::new(ask);
    }

    pub fn set_classifier(&mut self, classifier: impl IntentClassifier + 'static) {
        self.classifier = Box::new(classifier);
    }

    /// Copy of the full run state, resumable with [`Engine::restore`].
    pub fn snapshot(&self) -> Snapshot {
        self.vm.clone()
    }
}

/* ===================== Run ===================== */

/// Lazy output of an engine.
///
/// Yields lines in emission order. Ends (`None`) when the run halts or
/// suspends on an `ask`; pulling again after a suspension retries the ask.
/// A fatal error is yielded once, after which the engine stays failed.
pub struct Run<'e> {
    engine: &'e mut Engine,
}

impl Iterator for Run<'_> {
    type Item = Result<String, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.engine.vm.outbox.pop_front() {
                return Some(Ok(line));
            }

            match exec_loop::step(self.engine) {
                Ok(Step::Continue) => continue,
                Ok(Step::Suspended) | Ok(Step::Done) => return None,
                Err(e) => {
                    tracing::debug!(state = %self.engine.vm.state, error = %e, "run failed");
                    self.engine.vm.status = Status::Failed { error: e.to_string() };
                    return Some(Err(e));
                }
            }
        }
    }
}

/* ===================== Builder ===================== */

pub struct EngineBuilder {
    program: Arc<Program>,
    flow: Option<String>,
    context: Context,
    seed_path: Option<PathBuf>,
    snapshot: Option<VM>,
    ask: Box<dyn AskHandler>,
    classifier: Box<dyn IntentClassifier>,
    options: EngineOptions,
}

impl EngineBuilder {
    pub fn new(program: Arc<Program>) -> Self {
        Self {
            program,
            flow: None,
            context: Context::new(),
            seed_path: None,
            snapshot: None,
            ask: Box::new(NoInput),
            classifier: Box::new(NoopClassifier),
            options: EngineOptions::default(),
        }
    }

    /// Overrides the flow named in the options.
    pub fn flow(mut self, flow: impl Into<String>) -> Self {
        self.flow = Some(flow.into());
        self
    }

    /// Initial variables. They win over values seeded from a store file.
    pub fn context<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.context
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(name.into(), value.into());
        self
    }

    /// Seed the context from a store file written by `save`.
    pub fn seed_from_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_path = Some(path.into());
        self
    }

    pub fn ask(mut self, ask: impl AskHandler + 'static) -> Self {
        self.ask = Box::new(ask);
        self
    }

    pub fn classifier(mut self, classifier: impl IntentClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn boxed_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn max_transitions(mut self, limit: usize) -> Self {
        self.options.max_transitions = limit;
        self
    }

    pub fn fallback_states<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.fallback_states = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Continue from a snapshot instead of starting fresh. Flow, context and
    /// seed settings are ignored; the snapshot already carries them.
    pub fn resume(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let EngineBuilder {
            program,
            flow,
            mut context,
            seed_path,
            snapshot,
            ask,
            classifier,
            mut options,
        } = self;

        if let Some(flow) = flow {
            options.flow = flow;
        }

        let vm = match snapshot {
            Some(vm) => {
                let flow = program.flow(&vm.flow).ok_or_else(|| EngineError::FlowNotFound {
                    flow: vm.flow.clone(),
                })?;
                if !flow.has_state(&vm.state) {
                    return Err(EngineError::UnknownState {
                        state: vm.state.clone(),
                        from: None,
                    });
                }
                options.flow = vm.flow.clone();
                vm
            }
            None => {
                let flow = program.flow(&options.flow).ok_or_else(|| EngineError::FlowNotFound {
                    flow: options.flow.clone(),
                })?;
                let entry = flow.entry_state().ok_or_else(|| EngineError::EmptyFlow {
                    flow: options.flow.clone(),
                })?;

                let mut seeded = seed_path.map(|path| store::load_all(&path)).unwrap_or_default();
                seeded.extend(context.drain());
                VM::new(&options.flow, &entry.name, seeded)
            }
        };

        let fallback = program
            .flow(&vm.flow)
            .and_then(|flow| resolve_fallback(flow, &options.fallback_states));

        tracing::debug!(flow = %vm.flow, entry = %vm.state, fallback = ?fallback, "engine ready");

        Ok(Engine {
            program,
            vm,
            options,
            fallback,
            ask,
            classifier,
        })
    }
}

fn resolve_fallback(flow: &Flow, candidates: &[String]) -> Option<String> {
    candidates.iter().find(|name| flow.has_state(name)).cloned()
}
