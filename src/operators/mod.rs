// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Operator backends
//!
//! This module provides the operator trait, the registry the router
//! dispatches leaf pipes through, and the in-process implementations
//! (template rendering and registered functions). Model inference, OCR and
//! image generation are external collaborators: register a backend for
//! them, or run in dry mode.

mod func;
mod jinja2;
mod prompt;

pub use func::{FuncOperator, FuncRegistry, PipeFunction};
pub use jinja2::Jinja2Operator;
pub use prompt::{check_prompt, check_template, prompt_variables, render_prompt, render_template};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::concept::StructureShape;
use crate::errors::OperatorError;
use crate::pipe::{OperatorSpec, ResolvedMultiplicity};
use crate::stuff::{Stuff, StuffContent};

/// Kind of external capability an operator pipe needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperatorKind {
    Llm,
    Ocr,
    ImgGen,
    Jinja2,
    Func,
}

impl std::fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Llm => "LLM",
            Self::Ocr => "OCR",
            Self::ImgGen => "image generation",
            Self::Jinja2 => "Jinja2",
            Self::Func => "function",
        };
        f.write_str(name)
    }
}

/// Everything an operator needs to produce a pipe's output
#[derive(Debug, Clone)]
pub struct OperatorJob {
    pub pipe_code: String,
    pub domain: String,
    pub spec: OperatorSpec,

    /// Declared inputs, resolved from working memory
    pub inputs: IndexMap<String, Arc<Stuff>>,

    /// Output concept string
    pub output_concept: String,

    /// Shape the output must have, for structured concepts
    pub output_structure: Option<StructureShape>,

    pub multiplicity: ResolvedMultiplicity,

    /// Rendered user prompt (LLM and image generation)
    pub prompt: Option<String>,

    /// System prompt, inherited from the domain when the pipe sets none
    pub system_prompt: Option<String>,
}

impl OperatorJob {
    pub fn input(&self, name: &str) -> Result<&Arc<Stuff>, OperatorError> {
        self.inputs
            .get(name)
            .ok_or_else(|| OperatorError::MissingInput {
                name: name.to_string(),
            })
    }

    /// Inputs as a template context
    pub fn template_context(&self) -> serde_json::Map<String, serde_json::Value> {
        self.inputs
            .iter()
            .map(|(name, stuff)| (name.clone(), stuff.content.to_template_value()))
            .collect()
    }
}

/// Trait for operator backends
#[async_trait]
pub trait Operator: Send + Sync {
    /// Kind of operator pipe this backend serves
    fn kind(&self) -> OperatorKind;

    /// Produce the output content for a job
    async fn execute(&self, job: &OperatorJob) -> Result<StuffContent, OperatorError>;
}

/// Operator backends by kind
#[derive(Default)]
pub struct OperatorRegistry {
    operators: HashMap<OperatorKind, Box<dyn Operator>>,
}

impl OperatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator, replacing any backend of the same kind
    pub fn register(&mut self, operator: Box<dyn Operator>) {
        self.operators.insert(operator.kind(), operator);
    }

    pub fn get(&self, kind: OperatorKind) -> Option<&dyn Operator> {
        self.operators.get(&kind).map(|op| op.as_ref())
    }

    pub fn has(&self, kind: OperatorKind) -> bool {
        self.operators.contains_key(&kind)
    }

    /// Registered kinds
    pub fn kinds(&self) -> impl Iterator<Item = &OperatorKind> {
        self.operators.keys()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("kinds", &self.operators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Create a registry with all in-process operators
pub fn create_default_operators(functions: FuncRegistry) -> OperatorRegistry {
    let mut registry = OperatorRegistry::new();
    registry.register(Box::new(Jinja2Operator::new()));
    registry.register(Box::new(FuncOperator::new(functions)));
    registry
}
