// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Function operator
//!
//! Runs Rust functions registered by name.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Operator, OperatorJob, OperatorKind};
use crate::errors::OperatorError;
use crate::pipe::OperatorSpec;
use crate::stuff::{Stuff, StuffContent};

/// A function a `PipeFunc` pipe can call
pub type PipeFunction =
    Arc<dyn Fn(&IndexMap<String, Arc<Stuff>>) -> anyhow::Result<StuffContent> + Send + Sync>;

/// Functions by name
#[derive(Clone, Default)]
pub struct FuncRegistry {
    functions: HashMap<String, PipeFunction>,
}

impl FuncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any with the same name
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&IndexMap<String, Arc<Stuff>>) -> anyhow::Result<StuffContent> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&PipeFunction> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.functions.keys()
    }
}

impl std::fmt::Debug for FuncRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Function operator
pub struct FuncOperator {
    functions: FuncRegistry,
}

impl FuncOperator {
    /// Create a function operator over a registry
    pub fn new(functions: FuncRegistry) -> Self {
        Self { functions }
    }
}

#[async_trait]
impl Operator for FuncOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Func
    }

    async fn execute(&self, job: &OperatorJob) -> Result<StuffContent, OperatorError> {
        let OperatorSpec::Func(spec) = &job.spec else {
            return Err(OperatorError::Failed(anyhow::anyhow!(
                "pipe '{}' is not a function pipe",
                job.pipe_code
            )));
        };

        let function = self.functions.get(&spec.function_name).ok_or_else(|| {
            OperatorError::FunctionNotFound {
                name: spec.function_name.clone(),
            }
        })?;

        tracing::debug!(pipe = %job.pipe_code, function = %spec.function_name, "calling function");
        Ok(function(&job.inputs)?)
    }
}
