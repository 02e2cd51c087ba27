// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use crate::operators::OperatorKind;
use crate::validation::{StaticValidationError, StaticValidationErrorKind};

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
    /// Whether `pipeworks validate --heal` can apply the fix
    pub auto_fixable: bool,
}

impl RecoverySuggestion {
    /// Suggest a fix for a static wiring error
    pub fn fix_static_error(error: &StaticValidationError) -> Self {
        let pipe = &error.pipe_code;
        let variables = error.variable_names.join(", ");

        match error.kind {
            StaticValidationErrorKind::MissingInputVariable => Self {
                action: format!("Declare input(s) {} on pipe '{}'", variables, pipe),
                steps: vec![
                    "A sub-pipe needs a variable that no earlier step produces".into(),
                    match &error.required_concept {
                        Some(concept) => format!("Add `{} = \"{}\"` to its inputs", variables, concept),
                        None => "Add the variable to the pipe's inputs".into(),
                    },
                ],
                commands: vec![
                    "# Patch controller inputs automatically:".into(),
                    "pipeworks validate --heal".into(),
                ],
                auto_fixable: true,
            },
            StaticValidationErrorKind::ExtraneousInputVariable => Self {
                action: format!("Remove unused input(s) {} from pipe '{}'", variables, pipe),
                steps: vec!["No sub-pipe consumes these variables".into()],
                commands: vec![],
                auto_fixable: false,
            },
            StaticValidationErrorKind::InadequateInputConcept => Self {
                action: format!("Fix the concept of input(s) {} on pipe '{}'", variables, pipe),
                steps: vec![
                    format!(
                        "Required: {}",
                        error.required_concept.as_deref().unwrap_or("unknown")
                    ),
                    format!("Provided: {}", error.provided_concepts.join(", ")),
                    "Make one concept refine the other, or give them the same structure".into(),
                ],
                commands: vec![],
                auto_fixable: false,
            },
            StaticValidationErrorKind::TooManyCandidateInputs => Self {
                action: format!("Disambiguate input(s) {} of pipe '{}'", variables, pipe),
                steps: vec![
                    format!(
                        "Several stuffs could be bound: {}",
                        error.provided_concepts.join(", ")
                    ),
                    "Name the step result after the input it should feed".into(),
                ],
                commands: vec![],
                auto_fixable: false,
            },
        }
    }

    /// Suggest breaking a recursive pipe graph
    pub fn break_recursion(stack: &[String], limit: usize) -> Self {
        Self {
            action: "Break the recursive pipe reference".into(),
            steps: vec![
                format!("Call stack reached {} frames: {}", limit, stack.join(" → ")),
                "Pipe references are resolved by name at run time, so cycles are not rejected at load".into(),
            ],
            commands: vec![
                "# Show the pipe reference graph:".into(),
                "pipeworks graph --format mermaid".into(),
            ],
            auto_fixable: false,
        }
    }

    /// Suggest registering an operator backend
    pub fn register_backend(kind: OperatorKind) -> Self {
        Self {
            action: format!("Register a {} backend", kind),
            steps: vec![
                format!("{} pipes call an external service in live mode", kind),
                "Register an implementation on the OperatorRegistry, or run with --dry-run".into(),
            ],
            commands: vec![
                "# Validate wiring without calling backends:".into(),
                "pipeworks run <pipe> --dry-run".into(),
            ],
            auto_fixable: false,
        }
    }

    /// Suggest declaring a missing pipe
    pub fn declare_pipe(pipe: &str) -> Self {
        Self {
            action: format!("Declare pipe '{}'", pipe),
            steps: vec![
                format!("Add a [pipe.{}] table to one of the library files", pipe),
                "Or fix the reference if it is a typo".into(),
            ],
            commands: vec![
                "# List loaded pipes:".into(),
                "pipeworks list pipes".into(),
            ],
            auto_fixable: false,
        }
    }

    /// Suggest creating a library directory
    pub fn create_library() -> Self {
        Self {
            action: "Create a pipe library".into(),
            steps: vec![
                "No .toml library files were found".into(),
                "Each file declares one domain, its concepts and its pipes".into(),
            ],
            commands: vec![
                "# Point at an existing directory:".into(),
                "pipeworks --library ./pipelines validate".into(),
            ],
            auto_fixable: false,
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
