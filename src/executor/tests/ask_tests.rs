//! Tests for ask: skipping, ordering and suspension

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::helpers::{builder, engine, output};
use crate::executor::{ScriptedAnswers, Status};

#[test]
fn test_bound_variable_skips_ask() {
    let source = r#"
flow main
state start
  ask name "Name?"
  reply "Hi {{name}}"
"#;

    let mut engine = builder(source)
        .var("name", "Bo")
        .ask(|_: &str, _: &str| -> Option<String> { panic!("should not ask") })
        .build()
        .unwrap();
    assert_eq!(output(&mut engine), vec!["Hi Bo"]);
}

#[test]
fn test_replies_before_ask_are_pulled_first() {
    let source = r#"
flow main
state start
  reply "Before"
  ask name "Name?"
  reply "After {{name}}"
"#;

    let asked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&asked);
    let mut engine = builder(source)
        .ask(move |var: &str, prompt: &str| {
            assert_eq!((var, prompt), ("name", "Name?"));
            counter.fetch_add(1, Ordering::SeqCst);
            Some("Ann".to_string())
        })
        .build()
        .unwrap();

    let mut run = engine.run();
    assert_eq!(run.next().unwrap().unwrap(), "Before");
    assert_eq!(asked.load(Ordering::SeqCst), 0);
    assert_eq!(run.next().unwrap().unwrap(), "After Ann");
    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert!(run.next().is_none());

    assert!(engine.is_ended());
}

#[test]
fn test_missing_answer_suspends_and_retries() {
    let source = r#"
flow main
state start
  reply "Welcome"
  ask name "Name?"
  ask city "City?"
  reply "{{name}} from {{city}}"
"#;

    let mut engine = engine(source);
    assert_eq!(output(&mut engine), vec!["Welcome"]);
    assert_eq!(
        engine.status(),
        &Status::Awaiting {
            var: "name".to_string(),
            prompt: "Name?".to_string()
        }
    );

    // Still no answer: nothing new happens
    assert_eq!(output(&mut engine), Vec::<String>::new());
    assert_eq!(engine.awaiting(), Some(("name", "Name?")));

    engine.set_ask_handler(ScriptedAnswers::new(["Ann"]));
    assert_eq!(output(&mut engine), Vec::<String>::new());
    assert_eq!(engine.awaiting(), Some(("city", "City?")));

    engine.set_ask_handler(ScriptedAnswers::new(["Oslo"]));
    assert_eq!(output(&mut engine), vec!["Ann from Oslo"]);
    assert!(engine.is_ended());
    assert_eq!(engine.visit_count("start"), 1);
}

#[test]
fn test_answer_is_stored_verbatim() {
    let source = r#"
flow main
state start
  ask note "Note?"
"#;

    let mut engine = builder(source)
        .ask(ScriptedAnswers::new(["  spaced {{out}}  "]))
        .build()
        .unwrap();
    output(&mut engine);
    assert_eq!(engine.context()["note"], "  spaced {{out}}  ");
}
