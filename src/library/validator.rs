// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Library validation
//!
//! Structural checks run once a library is loaded: references between
//! pipes, concepts named by pipes and concepts, and per-kind rules.
//! Input/output wiring between pipes is checked separately by the
//! static validator and the dry run.

use std::collections::HashSet;

use super::Library;
use crate::pipe::{OperatorSpec, Pipe, PipeSpec};

/// Library validator
pub struct LibraryValidator;

impl LibraryValidator {
    /// Validate a loaded library
    pub fn validate(library: &Library) -> ValidationResult {
        let mut result = ValidationResult::new();

        for pipe in library.pipes() {
            Self::validate_pipe(pipe, library, &mut result);
        }

        Self::validate_concepts(library, &mut result);

        for cycle in library.graph().cycles() {
            result.add_warning(&format!(
                "Recursive pipes: {} (bounded by the call depth limit at run time)",
                cycle.join(" → ")
            ));
        }

        result
    }

    fn validate_pipe(pipe: &Pipe, library: &Library, result: &mut ValidationResult) {
        let code = pipe.code();
        let concepts = library.concepts();

        for sub in pipe.sub_pipe_codes() {
            if library.get_pipe(sub).is_none() {
                result.add_error(&format!(
                    "Pipe '{}': references unknown pipe '{}'",
                    code, sub
                ));
            }
        }

        if !concepts.contains(&pipe.core.output) {
            result.add_error(&format!(
                "Pipe '{}': output concept '{}' is not declared",
                code, pipe.core.output
            ));
        }
        for (name, requirement) in pipe.core.inputs.iter() {
            if !concepts.contains(&requirement.concept) {
                result.add_error(&format!(
                    "Pipe '{}': input '{}' uses undeclared concept '{}'",
                    code, name, requirement.concept
                ));
            }
        }

        match &pipe.spec {
            PipeSpec::Sequence(seq) => {
                if seq.steps.is_empty() {
                    result.add_error(&format!("Pipe '{}': sequence has no steps", code));
                }
            }
            PipeSpec::Condition(cond) => {
                if cond.pipe_map.is_empty() && cond.default_pipe_code.is_none() {
                    result.add_error(&format!(
                        "Pipe '{}': condition needs a pipe_map or a default_pipe_code",
                        code
                    ));
                }
            }
            PipeSpec::Parallel(par) => {
                if par.branches.is_empty() {
                    result.add_error(&format!("Pipe '{}': parallel has no branches", code));
                }

                let mut seen = HashSet::new();
                for branch in &par.branches {
                    if !seen.insert(branch.result_name()) {
                        result.add_error(&format!(
                            "Pipe '{}': duplicate branch result '{}'",
                            code,
                            branch.result_name()
                        ));
                    }
                }

                if let Some(combined) = &par.combined_output {
                    if !seen.contains(combined.as_str()) && !concepts.contains(combined) {
                        result.add_error(&format!(
                            "Pipe '{}': combined_output '{}' is neither a branch result nor a concept",
                            code, combined
                        ));
                    }
                } else if !par.add_each_output {
                    result.add_warning(&format!(
                        "Pipe '{}': branch results are discarded (set add_each_output or combined_output)",
                        code
                    ));
                }
            }
            PipeSpec::Batch(batch) => {
                if batch.input_list_name == batch.input_item_name {
                    result.add_error(&format!(
                        "Pipe '{}': input_list_name and input_item_name must differ",
                        code
                    ));
                }
            }
            PipeSpec::Operator(OperatorSpec::Ocr(_)) => {
                let documents = pipe
                    .core
                    .inputs
                    .iter()
                    .filter(|(_, r)| {
                        concepts.is_image_concept(&r.concept) || concepts.is_pdf_concept(&r.concept)
                    })
                    .count();
                if pipe.core.inputs.len() != 1 || documents != 1 {
                    result.add_error(&format!(
                        "Pipe '{}': OCR takes exactly one image or PDF input",
                        code
                    ));
                }
            }
            PipeSpec::Operator(OperatorSpec::Llm(llm)) => {
                if llm.prompt_template.is_none() && pipe.core.inputs.is_empty() {
                    result.add_warning(&format!(
                        "Pipe '{}': LLM pipe has neither a prompt template nor inputs",
                        code
                    ));
                }
            }
            PipeSpec::Operator(_) => {}
        }
    }

    fn validate_concepts(library: &Library, result: &mut ValidationResult) {
        let concepts = library.concepts();

        for concept in concepts.declared() {
            if let Some(parent) = &concept.refines {
                if !concepts.contains(parent) {
                    result.add_error(&format!(
                        "Concept '{}': refines unknown concept '{}'",
                        concept.concept_string(),
                        parent
                    ));
                }
            }
            if let Some(class) = &concept.structure_class_name {
                if !concepts.structures().is_known(class) {
                    result.add_error(&format!(
                        "Concept '{}': unknown structure '{}'",
                        concept.concept_string(),
                        class
                    ));
                }
            }
        }
    }
}

/// Result of library validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
