// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Template operator
//!
//! Renders a minijinja template against the job inputs.

use async_trait::async_trait;

use super::{render_template, Operator, OperatorJob, OperatorKind};
use crate::errors::OperatorError;
use crate::pipe::OperatorSpec;
use crate::stuff::StuffContent;

/// Jinja2 template operator
pub struct Jinja2Operator;

impl Jinja2Operator {
    /// Create a new template operator
    pub fn new() -> Self {
        Self
    }
}

impl Default for Jinja2Operator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for Jinja2Operator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Jinja2
    }

    async fn execute(&self, job: &OperatorJob) -> Result<StuffContent, OperatorError> {
        let OperatorSpec::Jinja2(spec) = &job.spec else {
            return Err(OperatorError::Failed(anyhow::anyhow!(
                "pipe '{}' is not a template pipe",
                job.pipe_code
            )));
        };

        let rendered = render_template(&spec.jinja2, &job.template_context())?;
        Ok(StuffContent::text(rendered))
    }
}
