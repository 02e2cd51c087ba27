// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Pipe router
//!
//! Resolves a pipe by code, guards the call depth, binds the pipe's inputs
//! against working memory and dispatches to the controller or operator
//! that runs it. Controllers call back into [`PipeRouter::run`] for their
//! sub-pipes, carrying the call stack down by value.

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use std::sync::Arc;

use crate::controllers;
use crate::dry_run::mock_output;
use crate::errors::{OperatorError, PipeworksError, PipeworksResult};
use crate::library::Library;
use crate::memory::WorkingMemory;
use crate::operators::{render_prompt, render_template, OperatorJob, OperatorRegistry};
use crate::pipe::{
    output_multiplicity_to_apply, OperatorSpec, Pipe, PipeOutput, PipeRunParams, PipeSpec,
    ResolvedMultiplicity,
};
use crate::stuff::Stuff;
use crate::validation::bind_inputs;

/// Default call depth limit
pub const DEFAULT_MAX_CALL_DEPTH: usize = 20;

/// Pipes currently being run, outermost first
///
/// Entering a pipe returns a new stack; the caller's stack is unchanged,
/// so a frame lasts exactly as long as the call that pushed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<String>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Push a frame, failing once `limit` frames are already on the stack
    pub fn enter(&self, pipe_code: &str, limit: usize) -> PipeworksResult<CallStack> {
        if self.frames.len() >= limit {
            let mut stack = self.frames.clone();
            stack.push(pipe_code.to_string());
            return Err(PipeworksError::PipeStackOverflow {
                pipe: pipe_code.to_string(),
                limit,
                stack,
            });
        }

        let mut frames = self.frames.clone();
        frames.push(pipe_code.to_string());
        Ok(CallStack { frames })
    }
}

/// Runs pipes of a library
pub struct PipeRouter {
    library: Arc<Library>,
    operators: Arc<OperatorRegistry>,
    max_call_depth: usize,
}

impl PipeRouter {
    pub fn new(library: Arc<Library>, operators: Arc<OperatorRegistry>) -> Self {
        Self {
            library,
            operators,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Run a pipe on a fresh call stack
    pub async fn run_pipe(
        &self,
        pipe_code: &str,
        memory: WorkingMemory,
        params: PipeRunParams,
    ) -> PipeworksResult<PipeOutput> {
        tracing::info!(pipe = %pipe_code, mode = ?params.run_mode, "run started");
        let stack = CallStack::new();
        let output = self.run(pipe_code, memory, params, &stack).await?;
        tracing::info!(
            pipe = %pipe_code,
            main_stuff = %output.main_stuff.name,
            entries = output.working_memory.len(),
            "run finished"
        );
        Ok(output)
    }

    /// Run a pipe below the given stack
    pub fn run<'a>(
        &'a self,
        pipe_code: &'a str,
        memory: WorkingMemory,
        params: PipeRunParams,
        stack: &'a CallStack,
    ) -> BoxFuture<'a, PipeworksResult<PipeOutput>> {
        async move {
            let pipe = Arc::clone(self.library.get_required_pipe(pipe_code)?);
            let stack = stack.enter(pipe.code(), self.max_call_depth)?;

            let mut memory = memory;
            bind_inputs(self.library.concepts(), &pipe, &mut memory, &params)?;

            tracing::debug!(
                pipe = %pipe.code(),
                kind = %pipe.kind(),
                depth = stack.depth(),
                "dispatching"
            );

            let output = match &pipe.spec {
                PipeSpec::Sequence(spec) => {
                    controllers::sequence::run(self, &pipe, spec, memory, &params, &stack).await?
                }
                PipeSpec::Condition(spec) => {
                    controllers::condition::run(self, &pipe, spec, memory, &params, &stack).await?
                }
                PipeSpec::Parallel(spec) => {
                    controllers::parallel::run(self, &pipe, spec, memory, &params, &stack).await?
                }
                PipeSpec::Batch(spec) => {
                    controllers::batch::run(self, &pipe, spec, memory, &params, &stack).await?
                }
                PipeSpec::Operator(spec) => {
                    return self.run_operator(&pipe, spec, memory, &params).await;
                }
            };

            publish_controller_output(output, &params)
        }
        .boxed()
    }

    async fn run_operator(
        &self,
        pipe: &Pipe,
        spec: &OperatorSpec,
        mut memory: WorkingMemory,
        params: &PipeRunParams,
    ) -> PipeworksResult<PipeOutput> {
        let concepts = self.library.concepts();
        let multiplicity =
            output_multiplicity_to_apply(pipe.core.output_multiplicity, params.output_multiplicity);
        let output_name = params
            .output_name
            .clone()
            .unwrap_or_else(|| pipe.code().to_string());

        let job = self
            .make_job(pipe, spec, &memory, multiplicity)
            .map_err(|e| PipeworksError::operator_failed(pipe.code(), e))?;

        let content = if params.is_dry() {
            if let OperatorSpec::Jinja2(jinja) = spec {
                // the output is mocked but the template must still render
                render_template(&jinja.jinja2, &job.template_context())
                    .map_err(|e| PipeworksError::operator_failed(pipe.code(), e))?;
            }
            mock_output(
                concepts,
                &pipe.core.output,
                &output_name,
                &multiplicity,
                params.nb_list_items,
            )
        } else {
            let kind = spec.kind();
            let operator = self.operators.get(kind).ok_or_else(|| {
                PipeworksError::operator_failed(pipe.code(), OperatorError::BackendMissing { kind })
            })?;
            operator
                .execute(&job)
                .await
                .map_err(|e| PipeworksError::operator_failed(pipe.code(), e))?
        };

        memory.set_new_main_stuff(
            Stuff::new(output_name.as_str(), pipe.core.output.as_str(), content),
            &output_name,
        );
        PipeOutput::from_memory(memory)
    }

    fn make_job(
        &self,
        pipe: &Pipe,
        spec: &OperatorSpec,
        memory: &WorkingMemory,
        multiplicity: ResolvedMultiplicity,
    ) -> Result<OperatorJob, OperatorError> {
        let concepts = self.library.concepts();

        // optional inputs may be absent
        let inputs: IndexMap<String, Arc<Stuff>> = pipe
            .core
            .inputs
            .names()
            .filter_map(|name| {
                memory
                    .get_optional_stuff(name)
                    .map(|stuff| (name.clone(), Arc::clone(stuff)))
            })
            .collect();

        let output_structure = concepts
            .structures()
            .get(&concepts.structure_class_of(&pipe.core.output))
            .cloned();

        let mut job = OperatorJob {
            pipe_code: pipe.code().to_string(),
            domain: pipe.domain().to_string(),
            spec: spec.clone(),
            inputs,
            output_concept: pipe.core.output.clone(),
            output_structure,
            multiplicity,
            prompt: None,
            system_prompt: None,
        };

        let template = match spec {
            OperatorSpec::Llm(llm) => {
                job.system_prompt = llm.system_prompt.clone();
                Some(llm.prompt_template.as_deref())
            }
            OperatorSpec::ImgGen(img_gen) => Some(img_gen.img_gen_prompt.as_deref()),
            _ => None,
        };

        job.prompt = match template {
            Some(Some(template)) => Some(render_prompt(template, &job.template_context())?),
            Some(None) => Some(
                job.inputs
                    .values()
                    .map(|stuff| stuff.content.rendered_text())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            None => None,
        };

        Ok(job)
    }
}

impl std::fmt::Debug for PipeRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeRouter")
            .field("pipes", &self.library.pipe_count())
            .field("operators", &self.operators)
            .field("max_call_depth", &self.max_call_depth)
            .finish()
    }
}

/// Store a controller's main output under the name its caller asked for
fn publish_controller_output(
    output: PipeOutput,
    params: &PipeRunParams,
) -> PipeworksResult<PipeOutput> {
    let Some(name) = params.output_name.as_deref() else {
        return Ok(output);
    };
    if output.main_stuff.name == name {
        return Ok(output);
    }

    let mut memory = output.working_memory;
    memory.set_new_main_stuff(Stuff::clone(&output.main_stuff), name);
    PipeOutput::from_memory(memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryLoader;
    use crate::operators::{create_default_operators, FuncRegistry};
    use crate::stuff::StuffContent;

    const LIBRARY: &str = r#"
domain = "demo"

[pipe.greet]
type = "PipeJinja2"
definition = "Greet someone"
inputs = { name = "Text" }
jinja2 = "Hello {{ name }}!"

[pipe.ask]
type = "PipeLLM"
definition = "Ask a model"
inputs = { question = "Text" }
prompt_template = "Answer briefly: $question"

[pipe.deep]
type = "PipeSequence"
definition = "Call a pipe two levels down"
inputs = { name = "Text" }
steps = [{ pipe = "middle", result = "greeting" }]

[pipe.middle]
type = "PipeSequence"
definition = "Middle level"
inputs = { name = "Text" }
steps = [{ pipe = "greet", result = "inner" }]
"#;

    fn router(max_call_depth: usize) -> PipeRouter {
        let library = LibraryLoader::new().load_str(LIBRARY, "demo.toml").unwrap();
        PipeRouter::new(
            Arc::new(library),
            Arc::new(create_default_operators(FuncRegistry::new())),
        )
        .with_max_call_depth(max_call_depth)
    }

    #[test]
    fn test_call_stack_enter() {
        let stack = CallStack::new();
        let one = stack.enter("a", 2).unwrap();
        let two = one.enter("b", 2).unwrap();
        assert_eq!(two.frames(), ["a", "b"]);
        // the caller's stack is untouched
        assert_eq!(one.depth(), 1);

        let err = two.enter("c", 2).unwrap_err();
        assert!(matches!(
            err,
            PipeworksError::PipeStackOverflow { pipe, limit: 2, stack } if pipe == "c" && stack.len() == 3
        ));
    }

    #[tokio::test]
    async fn test_live_operator_run() {
        let output = router(DEFAULT_MAX_CALL_DEPTH)
            .run_pipe("greet", WorkingMemory::from_text("name", "Ada"), PipeRunParams::live())
            .await
            .unwrap();

        assert_eq!(output.main_stuff.name, "greet");
        assert_eq!(output.main_stuff.concept, "native.Text");
        assert_eq!(output.main_stuff.content.as_text(), Some("Hello Ada!"));
        assert_eq!(output.working_memory.len(), 2);
    }

    #[tokio::test]
    async fn test_output_name_from_params() {
        let output = router(DEFAULT_MAX_CALL_DEPTH)
            .run_pipe(
                "greet",
                WorkingMemory::from_text("name", "Ada"),
                PipeRunParams::live().with_output_name("welcome"),
            )
            .await
            .unwrap();
        assert!(output.working_memory.contains("welcome"));
        assert_eq!(output.main_stuff.name, "welcome");
    }

    #[tokio::test]
    async fn test_missing_backend() {
        let err = router(DEFAULT_MAX_CALL_DEPTH)
            .run_pipe("ask", WorkingMemory::from_text("question", "Why?"), PipeRunParams::live())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipeworksError::OperatorFailed {
                source: OperatorError::BackendMissing { .. },
                ..
            }
        ));
        assert!(err.is_operator_failure());
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_backend() {
        let output = router(DEFAULT_MAX_CALL_DEPTH)
            .run_pipe("ask", WorkingMemory::from_text("question", "Why?"), PipeRunParams::dry())
            .await
            .unwrap();
        let StuffContent::Text { text } = &output.main_stuff.content else {
            panic!("expected a text mock");
        };
        assert!(text.starts_with("DRY RUN"));
    }

    #[tokio::test]
    async fn test_implicit_binding_by_concept() {
        let output = router(DEFAULT_MAX_CALL_DEPTH)
            .run_pipe("greet", WorkingMemory::from_text("person", "Grace"), PipeRunParams::live())
            .await
            .unwrap();
        assert_eq!(output.main_stuff.content.as_text(), Some("Hello Grace!"));
    }

    #[tokio::test]
    async fn test_missing_input_in_live_mode() {
        let err = router(DEFAULT_MAX_CALL_DEPTH)
            .run_pipe("greet", WorkingMemory::new(), PipeRunParams::live())
            .await
            .unwrap_err();
        let static_error = err.as_static_validation().unwrap();
        assert_eq!(static_error.variable_names, vec!["name".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_pipe() {
        let err = router(DEFAULT_MAX_CALL_DEPTH)
            .run_pipe("nowhere", WorkingMemory::new(), PipeRunParams::live())
            .await
            .unwrap_err();
        assert!(matches!(err, PipeworksError::PipeNotFound { .. }));
    }

    #[tokio::test]
    async fn test_depth_limit_is_exact() {
        let memory = WorkingMemory::from_text("name", "Ada");

        // deep -> middle -> greet is three frames
        let output = router(3)
            .run_pipe("deep", memory.clone(), PipeRunParams::live())
            .await
            .unwrap();
        assert_eq!(output.main_stuff.name, "greeting");
        assert_eq!(output.main_stuff.content.as_text(), Some("Hello Ada!"));

        let err = router(2)
            .run_pipe("deep", memory, PipeRunParams::live())
            .await
            .unwrap_err();
        assert!(matches!(err, PipeworksError::PipeStackOverflow { limit: 2, .. }));
    }
}
