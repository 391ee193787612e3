//! Core execution loop
//!
//! This module contains the step() function - the heart of the engine.
//! A state visit moves through three phases:
//! 1. Enter - count the visit and load the state's actions
//! 2. Execute - run actions from the frame stack, one per step
//! 3. Resolve - flush output and pick the next state (or halt)

use std::sync::Arc;

use super::statements::execute_action;
use super::types::{Control, Frame, Status, TransitionReason, VisitPhase};
use super::vm::Step;
use super::{Engine, EngineError};

/* ===================== Public API ===================== */

/// Execute one step of the engine.
pub fn step(engine: &mut Engine) -> Result<Step, EngineError> {
    match engine.vm.status {
        Status::Halted | Status::Failed { .. } => return Ok(Step::Done),
        // A pull after suspension retries the pending ask
        Status::Ready | Status::Awaiting { .. } => engine.vm.status = Status::Running,
        Status::Running => {}
    }

    // A goto abandons the rest of the visit, nested bodies included
    if engine.vm.control != Control::None && engine.vm.phase == VisitPhase::Execute {
        engine.vm.frames.clear();
        engine.vm.phase = VisitPhase::Resolve;
    }

    match engine.vm.phase {
        VisitPhase::Enter => enter_state(engine),
        VisitPhase::Execute => execute_frame(engine),
        VisitPhase::Resolve => resolve_transition(engine),
    }
}

/// Run until the engine halts, fails or suspends, collecting output.
pub fn run_until_done(engine: &mut Engine) -> Result<Vec<String>, EngineError> {
    engine.run().collect()
}

/* ===================== Phases ===================== */

fn enter_state(engine: &mut Engine) -> Result<Step, EngineError> {
    let program = Arc::clone(&engine.program);
    let vm = &mut engine.vm;

    let state = program
        .flow(&vm.flow)
        .and_then(|flow| flow.state(&vm.state))
        .ok_or_else(|| EngineError::UnknownState {
            state: vm.state.clone(),
            from: None,
        })?;

    let visits = vm.visits.entry(vm.state.clone()).or_insert(0);
    *visits += 1;
    tracing::debug!(flow = %vm.flow, state = %vm.state, visit = *visits, "entering state");

    vm.last_asked = None;
    vm.frames = vec![Frame::new(state.actions.clone())];
    vm.phase = VisitPhase::Execute;
    Ok(Step::Continue)
}

fn execute_frame(engine: &mut Engine) -> Result<Step, EngineError> {
    let vm = &mut engine.vm;

    let Some(frame) = vm.frames.last() else {
        vm.phase = VisitPhase::Resolve;
        return Ok(Step::Continue);
    };

    let Some(action) = frame.current().cloned() else {
        // Body finished: resume the enclosing list
        vm.frames.pop();
        if vm.frames.is_empty() {
            vm.phase = VisitPhase::Resolve;
        }
        return Ok(Step::Continue);
    };

    execute_action(engine, &action)
}

/// Pick the next state: explicit target, then classifier suggestion, then
/// the repeat-visit fallback. With none of them the run halts.
fn resolve_transition(engine: &mut Engine) -> Result<Step, EngineError> {
    // The visit's replies are pulled before anything else happens
    if !engine.vm.buffer.is_empty() {
        engine.vm.flush();
        return Ok(Step::Continue);
    }

    let current = engine.vm.state.clone();
    let next = match std::mem::take(&mut engine.vm.control) {
        Control::Goto(target) => Some((target, TransitionReason::Explicit)),
        Control::None => classifier_target(engine, &current)
            .map(|target| (target, TransitionReason::Classifier))
            .or_else(|| fallback_target(engine, &current).map(|target| (target, TransitionReason::Fallback))),
    };

    let Some((target, reason)) = next else {
        tracing::info!(flow = %engine.vm.flow, state = %current, "no transition, halting");
        engine.vm.status = Status::Halted;
        return Ok(Step::Continue);
    };

    let known = engine
        .program
        .flow(&engine.vm.flow)
        .is_some_and(|flow| flow.has_state(&target));
    if !known {
        return Err(EngineError::UnknownState {
            state: target,
            from: Some(current),
        });
    }

    if engine.vm.transitions >= engine.options.max_transitions {
        return Err(EngineError::RunawayTransitions {
            limit: engine.options.max_transitions,
        });
    }
    engine.vm.transitions += 1;

    tracing::debug!(from = %current, to = %target, %reason, "transition");
    if reason == TransitionReason::Classifier {
        engine.vm.outbox.push_back(format!("[intent] routed to {}", target));
    }

    engine.vm.state = target;
    engine.vm.phase = VisitPhase::Enter;
    Ok(Step::Continue)
}

/// Only after an `ask` answered during this visit.
fn classifier_target(engine: &Engine, current: &str) -> Option<String> {
    let var = engine.vm.last_asked.as_ref()?;
    let utterance = engine.vm.context.get(var).map(String::as_str).unwrap_or("");
    let flow = engine.program.flow(&engine.vm.flow)?;

    let candidates = flow.state_names();
    let suggestion = engine.classifier.classify(utterance, &candidates, current)?;

    if suggestion != current && flow.has_state(&suggestion) {
        Some(suggestion)
    } else {
        tracing::debug!(state = %current, %suggestion, "ignoring classifier suggestion");
        None
    }
}

/// Once a state has been visited twice, move to the fallback state.
/// A fallback state never falls back to itself: revisiting it without a
/// transition halts the run instead of cycling into the runaway guard.
fn fallback_target(engine: &Engine, current: &str) -> Option<String> {
    let fallback = engine.fallback.as_deref()?;
    if fallback == current || engine.vm.visit_count(current) < 2 {
        return None;
    }
    Some(fallback.to_string())
}
