//! Tests for suspending a run and resuming it from a serialized snapshot

use super::helpers::{builder, engine, program};
use crate::executor::{Engine, EngineError, ScriptedAnswers, VM};

const GREETING: &str = r#"
flow main
state greet
  reply "Hello {{name|default:"there"}}"
  ask name "What is your name?"
  goto done
state done
  reply "Nice to meet you, {{name}}"
"#;

#[test]
fn test_resume_from_json_snapshot() {
    let mut engine = engine(GREETING);
    assert_eq!(engine.run_to_end().unwrap(), vec!["Hello there"]);

    let json = serde_json::to_string(&engine.snapshot()).unwrap();
    drop(engine);

    let snapshot: VM = serde_json::from_str(&json).unwrap();
    let mut resumed = Engine::restore(program(GREETING), snapshot)
        .ask(ScriptedAnswers::new(["Ann"]))
        .build()
        .unwrap();

    assert_eq!(resumed.awaiting(), Some(("name", "What is your name?")));
    assert_eq!(resumed.run_to_end().unwrap(), vec!["Nice to meet you, Ann"]);
    assert!(resumed.is_ended());
    assert_eq!(resumed.visit_count("greet"), 1);
    assert_eq!(resumed.visit_count("done"), 1);
}

#[test]
fn test_snapshot_keeps_unpulled_output() {
    let source = r#"
flow main
state a
  reply "one"
  reply "two"
  ask name "Name?"
"#;

    let mut engine = engine(source);
    assert_eq!(engine.run().next().unwrap().unwrap(), "one");

    let mut resumed = builder(source).resume(engine.snapshot()).build().unwrap();
    assert_eq!(resumed.run_to_end().unwrap(), vec!["two"]);
    assert_eq!(resumed.awaiting(), Some(("name", "Name?")));
}

#[test]
fn test_resume_against_mismatched_program_fails() {
    let mut engine = engine(GREETING);
    engine.run_to_end().unwrap();
    let snapshot = engine.snapshot();

    let other = "flow main\nstate elsewhere\n  reply \"x\"";
    match builder(other).resume(snapshot).build() {
        Err(EngineError::UnknownState { state, .. }) => assert_eq!(state, "greet"),
        other => panic!("Expected UnknownState, got {:?}", other),
    }
}
