//! Tests for the execution engine
//!
//! Organized by feature area

mod ask_tests;
mod basic_tests;
mod helpers;
mod snapshot_tests;
mod transition_tests;
