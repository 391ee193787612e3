//! Tests for next-state resolution: classifier, fallback and runaway guard

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::helpers::{builder, engine, output};
use crate::executor::{EngineError, IntentClassifier, KeywordClassifier, ScriptedAnswers, Status};

/// Always suggests the same state and counts how often it was asked.
struct FixedClassifier {
    answer: Option<&'static str>,
    calls: Arc<AtomicUsize>,
}

impl FixedClassifier {
    fn new(answer: Option<&'static str>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let classifier = Self {
            answer,
            calls: Arc::clone(&calls),
        };
        (classifier, calls)
    }
}

impl IntentClassifier for FixedClassifier {
    fn classify(&self, _utterance: &str, _candidates: &[String], _excluded: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.map(str::to_string)
    }
}

const HELPDESK: &str = r#"
flow main
state menu
  reply "How can I help?"
  ask topic "Topic?"
state billing
  reply "Billing here"
state support
  reply "Support here"
"#;

/* ===================== Classifier ===================== */

#[test]
fn test_classifier_routes_after_ask() {
    let mut engine = builder(HELPDESK)
        .ask(ScriptedAnswers::new(["I have a billing question"]))
        .classifier(KeywordClassifier)
        .build()
        .unwrap();

    assert_eq!(
        output(&mut engine),
        vec!["How can I help?", "[intent] routed to billing", "Billing here"]
    );
    assert_eq!(engine.current_state(), "billing");
}

#[test]
fn test_classifier_suggestion_must_be_another_known_state() {
    for suggestion in ["menu", "nowhere"] {
        let (classifier, calls) = FixedClassifier::new(Some(suggestion));
        let mut engine = builder(HELPDESK)
            .ask(ScriptedAnswers::new(["anything"]))
            .classifier(classifier)
            .build()
            .unwrap();

        assert_eq!(output(&mut engine), vec!["How can I help?"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(engine.is_ended());
    }
}

#[test]
fn test_classifier_not_consulted_without_ask() {
    let (classifier, calls) = FixedClassifier::new(Some("support"));
    let mut engine = builder(HELPDESK)
        .var("topic", "already known")
        .classifier(classifier)
        .build()
        .unwrap();

    assert_eq!(output(&mut engine), vec!["How can I help?"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_explicit_goto_beats_classifier() {
    let source = r#"
flow main
state menu
  ask topic "Topic?"
  goto support
state billing
  reply "Billing here"
state support
  reply "Support here"
"#;

    let (classifier, calls) = FixedClassifier::new(Some("billing"));
    let mut engine = builder(source)
        .ask(ScriptedAnswers::new(["billing"]))
        .classifier(classifier)
        .build()
        .unwrap();

    assert_eq!(output(&mut engine), vec!["Support here"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/* ===================== Fallback ===================== */

const REVISIT: &str = r#"
flow main
state menu
  reply "Menu"
  if again == "" {
    set again = "yes"
    goto menu
  }
state unknown
  reply "Sorry, lost you"
state fallback
  reply "Falling back"
"#;

#[test]
fn test_fallback_after_second_visit() {
    let mut engine = engine(REVISIT);
    assert_eq!(engine.fallback_state(), Some("fallback"));

    assert_eq!(output(&mut engine), vec!["Menu", "Menu", "Falling back"]);
    assert_eq!(engine.visit_count("menu"), 2);
    assert_eq!(engine.transitions(), 2);
    assert!(engine.is_ended());
}

#[test]
fn test_fallback_preference_order() {
    let source = REVISIT.replace("state fallback", "state end");
    let engine = engine(&source);
    assert_eq!(engine.fallback_state(), Some("unknown"));

    let engine = builder(REVISIT).fallback_states(["end", "fallback"]).build().unwrap();
    assert_eq!(engine.fallback_state(), Some("fallback"));
}

#[test]
fn test_single_visit_halts_without_fallback() {
    let source = r#"
flow main
state menu
  reply "Menu"
state fallback
  reply "Falling back"
"#;

    let mut engine = engine(source);
    assert_eq!(output(&mut engine), vec!["Menu"]);
    assert_eq!(engine.status(), &Status::Halted);
}

#[test]
fn test_fallback_never_targets_itself() {
    let source = r#"
flow main
state fallback
  reply "again"
  if n == "" {
    set n = "1"
    goto fallback
  }
"#;

    let mut engine = engine(source);
    assert_eq!(output(&mut engine), vec!["again", "again"]);
    assert!(engine.is_ended());
}

const SECOND_VISIT_ASK: &str = r#"
flow main
state menu
  if loops == "" {
    set loops = "1"
    goto menu
  }
  ask topic "Topic?"
state support
  reply "Support here"
state fallback
  reply "Falling back"
"#;

#[test]
fn test_classifier_beats_fallback() {
    let (classifier, calls) = FixedClassifier::new(Some("support"));
    let mut engine = builder(SECOND_VISIT_ASK)
        .ask(ScriptedAnswers::new(["help"]))
        .classifier(classifier)
        .build()
        .unwrap();

    assert_eq!(output(&mut engine), vec!["[intent] routed to support", "Support here"]);
    assert_eq!(engine.visit_count("menu"), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fallback_when_classifier_has_nothing() {
    let (classifier, calls) = FixedClassifier::new(None);
    let mut engine = builder(SECOND_VISIT_ASK)
        .ask(ScriptedAnswers::new(["help"]))
        .classifier(classifier)
        .build()
        .unwrap();

    assert_eq!(output(&mut engine), vec!["Falling back"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/* ===================== Runaway Guard ===================== */

const PING_PONG: &str = r#"
flow main
state ping
  goto pong
state pong
  goto ping
"#;

#[test]
fn test_runaway_transitions_fail() {
    let mut engine = builder(PING_PONG).max_transitions(10).build().unwrap();

    match engine.run_to_end() {
        Err(EngineError::RunawayTransitions { limit }) => assert_eq!(limit, 10),
        other => panic!("Expected runaway error, got {:?}", other),
    }
    assert_eq!(engine.transitions(), 10);
    assert!(matches!(engine.status(), Status::Failed { .. }));

    // A failed run stays failed
    assert!(engine.run().next().is_none());
}

#[test]
fn test_runaway_default_limit() {
    let mut engine = engine(PING_PONG);
    match engine.run_to_end() {
        Err(EngineError::RunawayTransitions { limit }) => assert_eq!(limit, 2000),
        other => panic!("Expected runaway error, got {:?}", other),
    }
}
