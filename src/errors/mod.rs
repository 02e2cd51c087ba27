// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Error types for loading and running pipe libraries
//!
//! Every error carries enough context (file, pipe code, concept, variable
//! names) to locate the offending definition without a debugger.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::operators::OperatorKind;
use crate::validation::StaticValidationError;

/// Result type for pipeworks operations
pub type PipeworksResult<T> = Result<T, PipeworksError>;

/// Main error type for pipeworks
#[derive(Error, Debug, Diagnostic)]
pub enum PipeworksError {
    // ─────────────────────────────────────────────────────────────────────────
    // Load Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(pipeworks::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Invalid library blueprint '{origin}': {reason}")]
    #[diagnostic(
        code(pipeworks::blueprint_invalid),
        help("A library file needs a top-level `domain` plus optional [concept] and [pipe] tables")
    )]
    BlueprintInvalid { origin: String, reason: String },

    #[error("Error loading concept '{concept}' from '{origin}': {reason}")]
    #[diagnostic(code(pipeworks::concept_blueprint))]
    ConceptBlueprint {
        origin: String,
        concept: String,
        reason: String,
    },

    #[error("Error loading pipe '{pipe}' from '{origin}': {reason}")]
    #[diagnostic(code(pipeworks::pipe_blueprint))]
    PipeBlueprint {
        origin: String,
        pipe: String,
        reason: String,
    },

    #[error("Pipe '{pipe}' in '{origin}' has an empty blueprint")]
    #[diagnostic(
        code(pipeworks::empty_pipe_blueprint),
        help("Declare at least `type` and `definition` for the pipe")
    )]
    EmptyPipeBlueprint { origin: String, pipe: String },

    #[error("No factory '{factory}' for pipe '{pipe}' in '{origin}'")]
    #[diagnostic(
        code(pipeworks::factory_not_found),
        help("Known pipe types: PipeSequence, PipeCondition, PipeParallel, PipeBatch, PipeLLM, PipeOcr, PipeImgGen, PipeJinja2, PipeFunc")
    )]
    FactoryNotFound {
        origin: String,
        pipe: String,
        factory: String,
    },

    #[error("Concept '{concept}' is already registered")]
    #[diagnostic(
        code(pipeworks::duplicate_concept),
        help("Rename one of the definitions, or load the library with update mode enabled")
    )]
    DuplicateConcept { concept: String },

    #[error("Pipe '{pipe}' is already registered")]
    #[diagnostic(
        code(pipeworks::duplicate_pipe),
        help("Pipe codes are addressable without their domain, so they must be unique across the library")
    )]
    DuplicatePipe { pipe: String },

    #[error("Invalid concept code '{code}': {reason}")]
    #[diagnostic(code(pipeworks::concept_code))]
    ConceptCode { code: String, reason: String },

    #[error("Invalid concept string '{concept}': {reason}")]
    #[diagnostic(code(pipeworks::concept_string))]
    ConceptString { concept: String, reason: String },

    #[error("Invalid domain '{domain}': {reason}")]
    #[diagnostic(code(pipeworks::concept_domain))]
    ConceptDomain { domain: String, reason: String },

    #[error("Library validation failed: {}", .errors.join("; "))]
    #[diagnostic(
        code(pipeworks::library_invalid),
        help("Run 'pipeworks validate' for the full report")
    )]
    LibraryInvalid { errors: Vec<String> },

    #[error("No library files matched pattern: {pattern}")]
    #[diagnostic(
        code(pipeworks::no_library_files),
        help("Point --library at a directory containing .toml pipe definitions")
    )]
    NoLibraryFiles { pattern: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipe '{pipe}' not found")]
    #[diagnostic(
        code(pipeworks::pipe_not_found),
        help("List the loaded pipes with 'pipeworks list pipes'")
    )]
    PipeNotFound { pipe: String },

    #[error("Concept '{concept}' not found")]
    #[diagnostic(code(pipeworks::concept_not_found))]
    ConceptNotFound { concept: String },

    #[error("No stuff named '{name}' in working memory")]
    #[diagnostic(code(pipeworks::stuff_not_found))]
    StuffNotFound { name: String },

    #[error("Alias '{alias}' points to missing stuff '{target}'")]
    #[diagnostic(code(pipeworks::alias_target_missing))]
    AliasTargetMissing { alias: String, target: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Static Validation Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(
        code(pipeworks::static_validation),
        help("Run 'pipeworks validate --heal' to patch missing controller inputs")
    )]
    StaticValidation(#[from] StaticValidationError),

    // ─────────────────────────────────────────────────────────────────────────
    // Runtime Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipe call stack exceeded {limit} frames while entering '{pipe}'")]
    #[diagnostic(
        code(pipeworks::pipe_stack_overflow),
        help("Check for recursive pipe references, or raise router.max_call_depth")
    )]
    PipeStackOverflow {
        pipe: String,
        limit: usize,
        stack: Vec<String>,
    },

    #[error("Condition pipe '{pipe}' has no branch for '{discriminator}' and no default")]
    #[diagnostic(
        code(pipeworks::no_condition_match),
        help("Add the value to pipe_map or declare default_pipe_code")
    )]
    NoConditionMatch { pipe: String, discriminator: String },

    #[error("Expression of pipe '{pipe}' failed: {message}")]
    #[diagnostic(code(pipeworks::expression_error))]
    ExpressionError { pipe: String, message: String },

    #[error("Batch input '{input}' of pipe '{pipe}' is not a list")]
    #[diagnostic(code(pipeworks::batch_input_not_list))]
    BatchInputNotList { pipe: String, input: String },

    #[error("Operator pipe '{pipe}' failed: {source}")]
    #[diagnostic(code(pipeworks::operator_failed))]
    OperatorFailed {
        pipe: String,
        #[source]
        source: OperatorError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Config/IO Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration '{path}': {message}")]
    #[diagnostic(code(pipeworks::config_error))]
    Config { path: PathBuf, message: String },

    #[error("Invalid input data: {message}")]
    #[diagnostic(code(pipeworks::invalid_inputs))]
    InvalidInputs { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(pipeworks::io_error))]
    Io { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(pipeworks::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(pipeworks::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(pipeworks::glob_error))]
    GlobPattern { message: String },
}

/// Failure reported by an operator backend
///
/// Kept apart from [`PipeworksError`] so the router can tell "operator
/// failed" from "wiring is invalid".
#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("no backend registered for {kind} operators")]
    BackendMissing { kind: OperatorKind },

    #[error("template error: {message}")]
    Template { message: String },

    #[error("function '{name}' is not registered")]
    FunctionNotFound { name: String },

    #[error("input '{name}' is missing from the job")]
    MissingInput { name: String },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<std::io::Error> for PipeworksError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipeworksError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PipeworksError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for PipeworksError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl PipeworksError {
    /// Wrap an operator failure with the pipe that raised it
    pub fn operator_failed(pipe: &str, source: OperatorError) -> Self {
        Self::OperatorFailed {
            pipe: pipe.to_string(),
            source,
        }
    }

    /// Create a pipe blueprint error with file and pipe context
    pub fn pipe_blueprint(origin: &str, pipe: &str, reason: impl Into<String>) -> Self {
        Self::PipeBlueprint {
            origin: origin.to_string(),
            pipe: pipe.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a concept blueprint error with file and concept context
    pub fn concept_blueprint(origin: &str, concept: &str, reason: impl Into<String>) -> Self {
        Self::ConceptBlueprint {
            origin: origin.to_string(),
            concept: concept.to_string(),
            reason: reason.into(),
        }
    }

    /// The static validation error carried by this error, if any
    pub fn as_static_validation(&self) -> Option<&StaticValidationError> {
        match self {
            Self::StaticValidation(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the error comes from an operator backend rather than wiring
    pub fn is_operator_failure(&self) -> bool {
        matches!(self, Self::OperatorFailed { .. })
    }

    /// Suggest a way out of this error, when one is known
    pub fn suggestion(&self) -> Option<RecoverySuggestion> {
        match self {
            Self::StaticValidation(e) => Some(RecoverySuggestion::fix_static_error(e)),
            Self::PipeStackOverflow { stack, limit, .. } => {
                Some(RecoverySuggestion::break_recursion(stack, *limit))
            }
            Self::OperatorFailed {
                source: OperatorError::BackendMissing { kind },
                ..
            } => Some(RecoverySuggestion::register_backend(*kind)),
            Self::PipeNotFound { pipe } => Some(RecoverySuggestion::declare_pipe(pipe)),
            Self::NoLibraryFiles { .. } => Some(RecoverySuggestion::create_library()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::StaticValidationErrorKind;

    #[test]
    fn test_pipe_blueprint_message_names_file_and_pipe() {
        let err = PipeworksError::pipe_blueprint("lib/a.toml", "summarize", "missing field");
        assert_eq!(
            err.to_string(),
            "Error loading pipe 'summarize' from 'lib/a.toml': missing field"
        );
    }

    #[test]
    fn test_static_validation_is_exposed() {
        let err: PipeworksError = StaticValidationError::new(
            StaticValidationErrorKind::MissingInputVariable,
            "summarize",
            "docs",
        )
        .with_variables(vec!["text".into()])
        .into();

        let inner = err.as_static_validation().unwrap();
        assert_eq!(inner.variable_names, vec!["text".to_string()]);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_operator_failure_is_distinguished() {
        let err = PipeworksError::operator_failed(
            "draw",
            OperatorError::BackendMissing {
                kind: OperatorKind::ImgGen,
            },
        );
        assert!(err.is_operator_failure());
        assert!(err.to_string().contains("draw"));
    }
}
