// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Static wiring checks and run-time input binding
//!
//! Two views of the same question, "can this pipe find its inputs?":
//!
//! - [`validate_pipe_inputs`] compares what a controller's sub-pipes need
//!   with what the controller declares, without running anything.
//! - [`bind_inputs`] resolves a pipe's declared inputs against the working
//!   memory it is about to run on, adding aliases (and mocks in dry runs).

use minijinja::Environment;
use std::collections::HashSet;

use crate::concept::{ConceptLibrary, NativeConcept};
use crate::dry_run::mock_stuff;
use crate::errors::{PipeworksError, PipeworksResult};
use crate::library::Library;
use crate::memory::{WorkingMemory, MAIN_STUFF_NAME};
use crate::pipe::{InputRequirement, Pipe, PipeInputSpec, PipeRunParams, PipeSpec, SubPipe};

/// Kinds of static wiring error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticValidationErrorKind {
    MissingInputVariable,
    ExtraneousInputVariable,
    InadequateInputConcept,
    TooManyCandidateInputs,
}

impl std::fmt::Display for StaticValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MissingInputVariable => "Missing input variable",
            Self::ExtraneousInputVariable => "Extraneous input variable",
            Self::InadequateInputConcept => "Inadequate input concept",
            Self::TooManyCandidateInputs => "Too many candidate inputs",
        };
        f.write_str(name)
    }
}

/// A wiring error found by static analysis or input binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticValidationError {
    pub kind: StaticValidationErrorKind,
    pub pipe_code: String,
    pub domain: String,
    pub variable_names: Vec<String>,
    pub required_concept: Option<String>,
    pub provided_concepts: Vec<String>,
    pub explanation: Option<String>,
    /// Library file the pipe was loaded from
    pub file: Option<String>,
}

impl StaticValidationError {
    pub fn new(kind: StaticValidationErrorKind, pipe_code: &str, domain: &str) -> Self {
        Self {
            kind,
            pipe_code: pipe_code.to_string(),
            domain: domain.to_string(),
            variable_names: Vec::new(),
            required_concept: None,
            provided_concepts: Vec::new(),
            explanation: None,
            file: None,
        }
    }

    /// Error about `pipe`, carrying its code, domain and origin
    pub fn for_pipe(kind: StaticValidationErrorKind, pipe: &Pipe) -> Self {
        let error = Self::new(kind, pipe.code(), pipe.domain());
        match &pipe.core.origin {
            Some(file) => error.with_file(file),
            None => error,
        }
    }

    pub fn with_variables(mut self, variable_names: Vec<String>) -> Self {
        self.variable_names = variable_names;
        self
    }

    pub fn with_required_concept(mut self, concept: &str) -> Self {
        self.required_concept = Some(concept.to_string());
        self
    }

    pub fn with_provided_concepts(mut self, concepts: Vec<String>) -> Self {
        self.provided_concepts = concepts;
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }
}

impl std::fmt::Display for StaticValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} in pipe '{}.{}': {}",
            self.kind,
            self.domain,
            self.pipe_code,
            self.variable_names.join(", ")
        )?;
        if let Some(required) = &self.required_concept {
            write!(f, " (required: {}", required)?;
            if !self.provided_concepts.is_empty() {
                write!(f, ", provided: {}", self.provided_concepts.join(", "))?;
            }
            write!(f, ")")?;
        } else if !self.provided_concepts.is_empty() {
            write!(f, " (provided: {})", self.provided_concepts.join(", "))?;
        }
        if let Some(explanation) = &self.explanation {
            write!(f, ". {}", explanation)?;
        }
        if let Some(file) = &self.file {
            write!(f, " [{}]", file)?;
        }
        Ok(())
    }
}

impl std::error::Error for StaticValidationError {}

// ─────────────────────────────────────────────────────────────────────────────
// Static analysis
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs a sub-pipe call requires from its caller's memory
///
/// For a batched step the item variable is replaced by the list it is
/// drawn from.
fn sub_pipe_needs(library: &Library, sub_pipe: &SubPipe) -> PipeworksResult<PipeInputSpec> {
    let target = library.get_required_pipe(&sub_pipe.pipe_code)?;
    let Some(batch) = &sub_pipe.batch else {
        return Ok(target.core.inputs.clone());
    };
    Ok(map_item_to_list(
        &target.core.inputs,
        &batch.item_name,
        &batch.list_name,
    ))
}

fn map_item_to_list(inputs: &PipeInputSpec, item_name: &str, list_name: &str) -> PipeInputSpec {
    inputs
        .iter()
        .map(|(name, requirement)| {
            if name == item_name {
                (
                    list_name.to_string(),
                    InputRequirement::many(&requirement.concept),
                )
            } else {
                (name.clone(), requirement.clone())
            }
        })
        .collect()
}

fn merge_needs(needed: &mut PipeInputSpec, more: PipeInputSpec) {
    for (name, requirement) in more.iter() {
        if !needed.contains(name) {
            needed.insert(name, requirement.clone());
        }
    }
}

/// Root variables referenced by a condition expression
pub fn expression_variables(expression_template: &str) -> Result<Vec<String>, minijinja::Error> {
    let env = Environment::new();
    let template = env.template_from_str(expression_template)?;
    let mut names: Vec<String> = template.undeclared_variables(false).into_iter().collect();
    names.sort();
    Ok(names)
}

/// Inputs a pipe needs from the memory it runs on
///
/// Operators need exactly what they declare. Controllers need what their
/// sub-pipes declare, minus what earlier sequence steps produce.
pub fn needed_inputs(library: &Library, pipe: &Pipe) -> PipeworksResult<PipeInputSpec> {
    let mut needed = PipeInputSpec::new();

    match &pipe.spec {
        PipeSpec::Operator(_) => return Ok(pipe.core.inputs.clone()),
        PipeSpec::Sequence(seq) => {
            let mut produced: HashSet<&str> = HashSet::new();
            for step in &seq.steps {
                for (name, requirement) in sub_pipe_needs(library, step)?.iter() {
                    if !produced.contains(name.as_str()) && !needed.contains(name) {
                        needed.insert(name, requirement.clone());
                    }
                }
                produced.insert(step.result_name());
            }
        }
        PipeSpec::Parallel(par) => {
            for branch in &par.branches {
                merge_needs(&mut needed, sub_pipe_needs(library, branch)?);
            }
        }
        PipeSpec::Condition(cond) => {
            let variables = expression_variables(&cond.expression_template).map_err(|e| {
                PipeworksError::ExpressionError {
                    pipe: pipe.code().to_string(),
                    message: e.to_string(),
                }
            })?;
            for name in variables {
                if name != MAIN_STUFF_NAME && !needed.contains(&name) {
                    needed.insert(
                        &name,
                        InputRequirement::new(&NativeConcept::Anything.concept_string()),
                    );
                }
            }
            for code in cond.target_pipe_codes() {
                let target = library.get_required_pipe(code)?;
                merge_needs(&mut needed, target.core.inputs.clone());
            }
        }
        PipeSpec::Batch(batch) => {
            let branch = library.get_required_pipe(&batch.branch_pipe_code)?;
            needed = map_item_to_list(
                &branch.core.inputs,
                &batch.input_item_name,
                &batch.input_list_name,
            );
        }
    }

    Ok(needed)
}

/// Compare a controller's declared inputs with what its sub-pipes need
///
/// Operators are not checked: their declared inputs are their needs.
pub fn validate_pipe_inputs(
    library: &Library,
    pipe: &Pipe,
) -> PipeworksResult<Vec<StaticValidationError>> {
    if !pipe.is_controller() {
        return Ok(Vec::new());
    }

    let concepts = library.concepts();
    let needed = needed_inputs(library, pipe)?;
    let declared = &pipe.core.inputs;
    let mut errors = Vec::new();

    for (name, requirement) in needed.iter() {
        match declared.get(name) {
            None => errors.push(
                StaticValidationError::for_pipe(StaticValidationErrorKind::MissingInputVariable, pipe)
                    .with_variables(vec![name.clone()])
                    .with_required_concept(&requirement.concept)
                    .with_explanation("A sub-pipe needs it and no earlier step produces it"),
            ),
            Some(declared_req) => {
                if !concepts.are_compatible(&declared_req.concept, &requirement.concept, false) {
                    errors.push(
                        StaticValidationError::for_pipe(
                            StaticValidationErrorKind::InadequateInputConcept,
                            pipe,
                        )
                        .with_variables(vec![name.clone()])
                        .with_required_concept(&requirement.concept)
                        .with_provided_concepts(vec![declared_req.concept.clone()]),
                    );
                }
            }
        }
    }

    for (name, declared_req) in declared.iter() {
        if !needed.contains(name) {
            errors.push(
                StaticValidationError::for_pipe(
                    StaticValidationErrorKind::ExtraneousInputVariable,
                    pipe,
                )
                .with_variables(vec![name.clone()])
                .with_provided_concepts(vec![declared_req.concept.clone()])
                .with_explanation("No sub-pipe consumes it"),
            );
        }
    }

    Ok(errors)
}

// ─────────────────────────────────────────────────────────────────────────────
// Run-time binding
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve a pipe's declared inputs against the memory it will run on
///
/// An input present by name must have a compatible concept, and be a list
/// when declared as one. An absent required input is bound through an
/// alias to the single compatible stuff in memory. In dry runs with
/// mocking enabled, absent or ambiguous inputs are synthesized instead of
/// failing.
pub fn bind_inputs(
    concepts: &ConceptLibrary,
    pipe: &Pipe,
    memory: &mut WorkingMemory,
    params: &PipeRunParams,
) -> PipeworksResult<()> {
    for (name, requirement) in pipe.core.inputs.iter() {
        let Some(stuff) = memory.get_optional_stuff(name) else {
            continue;
        };
        if !concepts.are_compatible(&stuff.concept, &requirement.concept, true) {
            return Err(StaticValidationError::for_pipe(
                StaticValidationErrorKind::InadequateInputConcept,
                pipe,
            )
            .with_variables(vec![name.clone()])
            .with_required_concept(&requirement.concept)
            .with_provided_concepts(vec![stuff.concept.clone()])
            .into());
        }
        if requirement.multiplicity.is_many() && stuff.content.as_list().is_none() {
            return Err(StaticValidationError::for_pipe(
                StaticValidationErrorKind::InadequateInputConcept,
                pipe,
            )
            .with_variables(vec![name.clone()])
            .with_required_concept(&requirement.concept)
            .with_provided_concepts(vec![stuff.concept.clone()])
            .with_explanation(format!("Declared as {} but holds a single value", requirement))
            .into());
        }
    }

    for (name, requirement) in pipe.core.inputs.required() {
        if memory.contains(name) {
            continue;
        }

        let candidates: Vec<(String, String)> = memory
            .iter()
            .filter(|(_, stuff)| concepts.are_compatible(&stuff.concept, &requirement.concept, true))
            .map(|(candidate, stuff)| (candidate.clone(), stuff.concept.clone()))
            .collect();

        match candidates.as_slice() {
            [(candidate, _)] => {
                tracing::info!(pipe = %pipe.code(), input = %name, stuff = %candidate, "implicit input binding");
                memory.set_alias(name, candidate)?;
            }
            [] if params.may_mock_inputs() => {
                tracing::debug!(pipe = %pipe.code(), input = %name, "mocking missing input");
                memory.add_new_stuff(name, mock_stuff(concepts, name, requirement, params.nb_list_items));
            }
            [] => {
                return Err(StaticValidationError::for_pipe(
                    StaticValidationErrorKind::MissingInputVariable,
                    pipe,
                )
                .with_variables(vec![name.clone()])
                .with_required_concept(&requirement.concept)
                .into());
            }
            _ if params.may_mock_inputs() => {
                tracing::warn!(
                    pipe = %pipe.code(),
                    input = %name,
                    candidates = candidates.len(),
                    "ambiguous input binding, using a mock"
                );
                memory.add_new_stuff(name, mock_stuff(concepts, name, requirement, params.nb_list_items));
            }
            _ => {
                let names: Vec<&str> = candidates.iter().map(|(n, _)| n.as_str()).collect();
                let provided: Vec<String> = candidates.iter().map(|(_, c)| c.clone()).collect();
                return Err(StaticValidationError::for_pipe(
                    StaticValidationErrorKind::TooManyCandidateInputs,
                    pipe,
                )
                .with_variables(vec![name.clone()])
                .with_required_concept(&requirement.concept)
                .with_provided_concepts(provided)
                .with_explanation(format!("Candidates: {}", names.join(", ")))
                .into());
            }
        }
    }

    Ok(())
}

/// Unwrap a static validation error, passing any other error through
pub fn into_static_error(error: PipeworksError) -> Result<StaticValidationError, PipeworksError> {
    match error {
        PipeworksError::StaticValidation(e) => Ok(e),
        other => Err(other),
    }
}
