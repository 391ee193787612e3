//! Test helpers for engine tests
//!
//! Common utilities for parsing flows and building engines

use std::sync::Arc;

use crate::executor::{Engine, EngineBuilder, ScriptedAnswers};
use crate::parser::parse;
use crate::types::Program;

/// Parse source, check it serializes and deserializes, and share it.
pub fn program(source: &str) -> Arc<Program> {
    let program = parse(source).expect("Parse failed");
    let json = serde_json::to_string(&program).expect("Program serialization failed");
    let program: Program = serde_json::from_str(&json).expect("Program deserialization failed");
    Arc::new(program)
}

pub fn builder(source: &str) -> EngineBuilder {
    Engine::builder(program(source))
}

/// Engine on flow `main` that answers asks from `answers`, in order.
pub fn engine_with_answers(source: &str, answers: &[&str]) -> Engine {
    builder(source)
        .ask(ScriptedAnswers::new(answers.iter().copied()))
        .build()
        .expect("Engine construction failed")
}

pub fn engine(source: &str) -> Engine {
    engine_with_answers(source, &[])
}

/// Pull until halt or suspension, panicking on a run error.
pub fn output(engine: &mut Engine) -> Vec<String> {
    engine.run_to_end().expect("Run failed")
}
