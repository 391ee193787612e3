//! Tests for replies, assignments and explicit transitions

use super::helpers::{engine, engine_with_answers, output};
use crate::executor::Status;

#[test]
fn test_reply_interpolates_context() {
    let source = r#"
flow main
state start
  set name = "al"
  reply "Hi {{name|upper}}"
  reply "Bye {{name}}"
"#;

    let mut engine = engine(source);
    assert_eq!(engine.status(), &Status::Ready);
    assert_eq!(output(&mut engine), vec!["Hi AL", "Bye al"]);
    assert!(engine.is_ended());
}

#[test]
fn test_set_expr_stores_string_form() {
    let source = r#"
flow main
state start
  set count = 1 + 2
  set total = count * 2
  set half = total / 4
  set shout = upper("hey") + "!"
  set adult = count >= 3
"#;

    let mut engine = engine(source);
    output(&mut engine);

    let ctx = engine.context();
    assert_eq!(ctx["count"], "3");
    assert_eq!(ctx["total"], "6");
    assert_eq!(ctx["half"], "1.5");
    assert_eq!(ctx["shout"], "HEY!");
    assert_eq!(ctx["adult"], "true");
}

#[test]
fn test_goto_skips_remaining_actions() {
    let source = r#"
flow main
state a
  reply "in a"
  goto b
  reply "never"
state b
  reply "in b"
"#;

    let mut engine = engine(source);
    assert_eq!(output(&mut engine), vec!["in a", "in b"]);
    assert_eq!(engine.current_state(), "b");
    assert_eq!(engine.transitions(), 1);
}

#[test]
fn test_legacy_if_goto() {
    let source = r#"
flow main
state ask
  ask answer "Continue?"
  if answer == "yes" goto yes
  reply "stopping"
state yes
  reply "going on"
"#;

    let mut engine = engine_with_answers(source, &["yes"]);
    assert_eq!(output(&mut engine), vec!["going on"]);

    let mut engine = engine_with_answers(source, &["no"]);
    assert_eq!(output(&mut engine), vec!["stopping"]);
}

#[test]
fn test_halt_without_transition() {
    let source = r#"
flow main
state only
  reply "done"
"#;

    let mut engine = engine(source);
    assert_eq!(output(&mut engine), vec!["done"]);
    assert_eq!(engine.status(), &Status::Halted);

    // Pulling again after a halt yields nothing
    assert_eq!(output(&mut engine), Vec::<String>::new());
    assert_eq!(engine.visit_count("only"), 1);
}

#[test]
fn test_selects_named_flow() {
    let source = r#"
flow main
state a
  reply "main flow"
flow other
state b
  reply "other flow"
"#;

    let mut engine = super::helpers::builder(source)
        .flow("other")
        .build()
        .unwrap();
    assert_eq!(engine.flow_name(), "other");
    assert_eq!(output(&mut engine), vec!["other flow"]);
}

#[test]
fn test_end_to_end_greeting() {
    let source = r#"
flow main
state greet
  reply "Hello {{name|default:"there"}}"
  ask name "What is your name?"
  goto done
state done
  reply "Nice to meet you, {{name}}"
"#;

    let mut engine = engine(source);
    assert_eq!(output(&mut engine), vec!["Hello there"]);
    assert_eq!(engine.awaiting(), Some(("name", "What is your name?")));
    assert!(!engine.is_ended());

    engine.set_ask_handler(crate::executor::ScriptedAnswers::new(["Ann"]));
    assert_eq!(output(&mut engine), vec!["Nice to meet you, Ann"]);
    assert!(engine.is_ended());
}
