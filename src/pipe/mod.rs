// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Pipe definitions
//!
//! A [`Pipe`] is a shared [`PipeCore`] (identity, inputs, output) plus the
//! kind-specific [`PipeSpec`]. Controllers compose other pipes through
//! [`SubPipe`] references resolved by name at run time; operators are leaf
//! pipes backed by an [`crate::operators::Operator`].

mod input;
mod run_params;

pub use input::{InputRequirement, Multiplicity, PipeInputSpec};
pub use run_params::{
    make_output_multiplicity, output_multiplicity_to_apply, OutputMultiplicity, PipeRunMode,
    PipeRunParams, ResolvedMultiplicity,
};

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

use crate::memory::WorkingMemory;
use crate::operators::OperatorKind;
use crate::stuff::Stuff;

/// The closed set of pipe kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipeKind {
    Sequence,
    Condition,
    Parallel,
    Batch,
    Llm,
    Ocr,
    ImgGen,
    Jinja2,
    Func,
}

impl PipeKind {
    pub const ALL: [PipeKind; 9] = [
        Self::Sequence,
        Self::Condition,
        Self::Parallel,
        Self::Batch,
        Self::Llm,
        Self::Ocr,
        Self::ImgGen,
        Self::Jinja2,
        Self::Func,
    ];

    /// Name used in the `type` field of a pipe blueprint
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Sequence => "PipeSequence",
            Self::Condition => "PipeCondition",
            Self::Parallel => "PipeParallel",
            Self::Batch => "PipeBatch",
            Self::Llm => "PipeLLM",
            Self::Ocr => "PipeOcr",
            Self::ImgGen => "PipeImgGen",
            Self::Jinja2 => "PipeJinja2",
            Self::Func => "PipeFunc",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// Key of this kind's factory in the factory registry
    pub fn factory_name(&self) -> String {
        format!("{}Factory", self.type_name())
    }

    pub fn is_controller(&self) -> bool {
        matches!(
            self,
            Self::Sequence | Self::Condition | Self::Parallel | Self::Batch
        )
    }
}

impl std::fmt::Display for PipeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Fields shared by every pipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeCore {
    pub domain: String,
    pub code: String,
    pub definition: String,
    pub inputs: PipeInputSpec,
    /// Output concept string
    pub output: String,
    pub output_multiplicity: Option<OutputMultiplicity>,
    /// File the pipe was loaded from
    pub origin: Option<String>,
}

impl PipeCore {
    pub fn new(domain: &str, code: &str, output: &str) -> Self {
        Self {
            domain: domain.to_string(),
            code: code.to_string(),
            definition: String::new(),
            inputs: PipeInputSpec::new(),
            output: output.to_string(),
            output_multiplicity: None,
            origin: None,
        }
    }

    pub fn with_input(mut self, name: &str, requirement: InputRequirement) -> Self {
        self.inputs.insert(name, requirement);
        self
    }

    pub fn with_output_multiplicity(mut self, multiplicity: Option<OutputMultiplicity>) -> Self {
        self.output_multiplicity = multiplicity;
        self
    }
}

/// Per-step batching: run the step once per item of `list_name`,
/// binding each item as `item_name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSpec {
    pub list_name: String,
    pub item_name: String,
}

/// A reference to another pipe inside a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubPipe {
    pub pipe_code: String,
    /// Name the result is stored under; defaults to the pipe code
    pub result: Option<String>,
    pub output_multiplicity: Option<OutputMultiplicity>,
    pub batch: Option<BatchSpec>,
}

impl SubPipe {
    pub fn new(pipe_code: &str, result: &str) -> Self {
        Self {
            pipe_code: pipe_code.to_string(),
            result: Some(result.to_string()),
            output_multiplicity: None,
            batch: None,
        }
    }

    pub fn with_output_multiplicity(mut self, multiplicity: Option<OutputMultiplicity>) -> Self {
        self.output_multiplicity = multiplicity;
        self
    }

    pub fn with_batch(mut self, list_name: &str, item_name: &str) -> Self {
        self.batch = Some(BatchSpec {
            list_name: list_name.to_string(),
            item_name: item_name.to_string(),
        });
        self
    }

    pub fn result_name(&self) -> &str {
        self.result.as_deref().unwrap_or(&self.pipe_code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceSpec {
    pub steps: Vec<SubPipe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionSpec {
    /// Template rendered to the discriminator
    pub expression_template: String,
    /// Discriminator → pipe code
    pub pipe_map: IndexMap<String, String>,
    pub default_pipe_code: Option<String>,
}

impl ConditionSpec {
    /// Distinct target pipes: mapped ones in order, then the default
    pub fn target_pipe_codes(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for code in self
            .pipe_map
            .values()
            .map(String::as_str)
            .chain(self.default_pipe_code.as_deref())
        {
            if !targets.contains(&code) {
                targets.push(code);
            }
        }
        targets
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelSpec {
    pub branches: Vec<SubPipe>,
    pub add_each_output: bool,
    /// Branch result that becomes the main output, or a concept whose
    /// structured value combines every branch result
    pub combined_output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPipeSpec {
    pub branch_pipe_code: String,
    pub input_list_name: String,
    pub input_item_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmSpec {
    pub prompt_template: Option<String>,
    pub system_prompt: Option<String>,
    /// Model handle passed through to the backend
    pub llm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrSpec {
    pub page_images: bool,
    pub page_views: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImgGenSpec {
    pub img_gen_prompt: Option<String>,
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Jinja2Spec {
    pub jinja2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncSpec {
    pub function_name: String,
}

/// Configuration of an operator pipe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum OperatorSpec {
    Llm(LlmSpec),
    Ocr(OcrSpec),
    ImgGen(ImgGenSpec),
    Jinja2(Jinja2Spec),
    Func(FuncSpec),
}

impl OperatorSpec {
    pub fn kind(&self) -> OperatorKind {
        match self {
            Self::Llm(_) => OperatorKind::Llm,
            Self::Ocr(_) => OperatorKind::Ocr,
            Self::ImgGen(_) => OperatorKind::ImgGen,
            Self::Jinja2(_) => OperatorKind::Jinja2,
            Self::Func(_) => OperatorKind::Func,
        }
    }
}

/// Kind-specific part of a pipe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipeSpec {
    Sequence(SequenceSpec),
    Condition(ConditionSpec),
    Parallel(ParallelSpec),
    Batch(BatchPipeSpec),
    Operator(OperatorSpec),
}

/// An executable pipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipe {
    pub core: PipeCore,
    pub spec: PipeSpec,
}

impl Pipe {
    pub fn new(core: PipeCore, spec: PipeSpec) -> Self {
        Self { core, spec }
    }

    pub fn code(&self) -> &str {
        &self.core.code
    }

    pub fn domain(&self) -> &str {
        &self.core.domain
    }

    pub fn kind(&self) -> PipeKind {
        match &self.spec {
            PipeSpec::Sequence(_) => PipeKind::Sequence,
            PipeSpec::Condition(_) => PipeKind::Condition,
            PipeSpec::Parallel(_) => PipeKind::Parallel,
            PipeSpec::Batch(_) => PipeKind::Batch,
            PipeSpec::Operator(op) => match op.kind() {
                OperatorKind::Llm => PipeKind::Llm,
                OperatorKind::Ocr => PipeKind::Ocr,
                OperatorKind::ImgGen => PipeKind::ImgGen,
                OperatorKind::Jinja2 => PipeKind::Jinja2,
                OperatorKind::Func => PipeKind::Func,
            },
        }
    }

    pub fn is_controller(&self) -> bool {
        self.kind().is_controller()
    }

    /// Codes of every pipe this one may call, in declaration order
    pub fn sub_pipe_codes(&self) -> Vec<&str> {
        match &self.spec {
            PipeSpec::Sequence(seq) => seq.steps.iter().map(|s| s.pipe_code.as_str()).collect(),
            PipeSpec::Condition(cond) => cond.target_pipe_codes(),
            PipeSpec::Parallel(par) => par.branches.iter().map(|s| s.pipe_code.as_str()).collect(),
            PipeSpec::Batch(batch) => vec![batch.branch_pipe_code.as_str()],
            PipeSpec::Operator(_) => vec![],
        }
    }
}

/// Result of running a pipe: the updated memory and its new main stuff
#[derive(Debug, Clone)]
pub struct PipeOutput {
    pub working_memory: WorkingMemory,
    pub main_stuff: Arc<Stuff>,
}

impl PipeOutput {
    /// Build from a memory whose main stuff is set
    pub fn from_memory(working_memory: WorkingMemory) -> crate::PipeworksResult<Self> {
        let main_stuff = Arc::clone(working_memory.main_stuff()?);
        Ok(Self {
            working_memory,
            main_stuff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in PipeKind::ALL {
            assert_eq!(PipeKind::from_type_name(kind.type_name()), Some(kind));
        }
        assert_eq!(PipeKind::Llm.factory_name(), "PipeLLMFactory");
        assert!(PipeKind::Batch.is_controller());
        assert!(!PipeKind::Jinja2.is_controller());
    }

    #[test]
    fn test_condition_targets_are_distinct() {
        let mut pipe_map = IndexMap::new();
        pipe_map.insert("small".to_string(), "p1".to_string());
        pipe_map.insert("tiny".to_string(), "p1".to_string());
        pipe_map.insert("large".to_string(), "p2".to_string());
        let spec = ConditionSpec {
            expression_template: "{{ size }}".into(),
            pipe_map,
            default_pipe_code: Some("p3".into()),
        };
        assert_eq!(spec.target_pipe_codes(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_sub_pipe_result_defaults_to_code() {
        let mut sub = SubPipe::new("summarize", "summary");
        assert_eq!(sub.result_name(), "summary");
        sub.result = None;
        assert_eq!(sub.result_name(), "summarize");
    }
}
