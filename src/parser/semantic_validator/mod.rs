//! Semantic Validation for Flow Programs
//!
//! This module provides an extensible rule-based validation system that runs
//! after parsing to catch problems the line grammar can't see: jumps to
//! states that don't exist, conditions outside the expression language,
//! dead actions and states.
//!
//! # Usage
//!
//! ```
//! use flowtalk_core::parser::{parse, semantic_validator::validate_program};
//!
//! let program = parse("flow main\nstate a\n  goto b").unwrap();
//! let errors = validate_program(&program);
//! assert_eq!(errors[0].rule_id, "unknown-target");
//! ```
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - Each rule implements this trait
//! 2. **Validator** - Collects and runs all rules
//! 3. **ValidationError** - The output of validation (errors and warnings)
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `semantic_validator/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to the `Validator::new()` constructor

pub mod rules;

use crate::types::{Program, State};

// ============================================================================
// Validation Error Types
// ============================================================================

/// Where a validation finding points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub flow: String,
    /// Offending state, if the finding is about one
    pub state: Option<String>,
    /// 1-based line of the state header
    pub line: Option<usize>,
}

impl Location {
    pub fn flow(flow: &str) -> Self {
        Self {
            flow: flow.to_string(),
            state: None,
            line: None,
        }
    }

    pub fn state(flow: &str, state: &State) -> Self {
        Self {
            flow: flow.to_string(),
            state: Some(state.name.clone()),
            line: Some(state.line),
        }
    }
}

/// A validation finding produced by semantic analysis.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: Location,
    /// Human-readable message
    pub message: String,
    pub severity: Severity,
    /// Which rule produced this error
    pub rule_id: &'static str,
}

/// Severity levels for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Must be fixed - the flow fails at runtime
    Error,
    /// Should probably be fixed - potential bug
    Warning,
}

impl ValidationError {
    pub fn error(location: Location, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            location,
            message: message.into(),
            severity: Severity::Error,
            rule_id,
        }
    }

    pub fn warning(location: Location, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            location,
            message: message.into(),
            severity: Severity::Warning,
            rule_id,
        }
    }

    /// Check if this is an error (not a warning)
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}", severity)?;
        if let Some(line) = self.location.line {
            write!(f, " at line {}", line)?;
        }
        write!(f, " in flow '{}'", self.location.flow)?;
        if let Some(state) = &self.location.state {
            write!(f, ", state '{}'", state)?;
        }
        write!(f, ": {} [{}]", self.message, self.rule_id)
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all validation rules must implement.
///
/// Each rule checks one aspect of a program and does not depend on the
/// results of other rules.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "unknown-target")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Run the validation. An empty vector means no issues found.
    fn validate(&self, program: &Program) -> Vec<ValidationError>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

/// The main validator that orchestrates all validation rules.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a new validator with all built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                // Error rules - these fail at runtime
                Box::new(rules::UnknownTargetRule),
                Box::new(rules::InvalidExpressionRule),
                // Warning rules - likely mistakes
                Box::new(rules::UnreachableActionRule),
                Box::new(rules::UnreachableStateRule),
                Box::new(rules::EmptyFlowRule),
            ],
        }
    }

    /// Run all validation rules and collect errors.
    pub fn validate(&self, program: &Program) -> Vec<ValidationError> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(program))
            .collect()
    }

    /// Registered rules as `(id, description)`
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a program and return all findings.
pub fn validate_program(program: &Program) -> Vec<ValidationError> {
    Validator::new().validate(program)
}

/// Check if a program has any validation errors (not just warnings).
pub fn has_errors(program: &Program) -> bool {
    validate_program(program).iter().any(|e| e.is_error())
}
