// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Sequence controller

use super::batch::{self, BatchJob};
use crate::errors::PipeworksResult;
use crate::memory::WorkingMemory;
use crate::pipe::{Pipe, PipeOutput, PipeRunParams, SequenceSpec};
use crate::router::{CallStack, PipeRouter};

/// Run the steps in order, threading memory through them
///
/// Every step stores its result under its result name; the last one is the
/// sequence's main output.
pub async fn run(
    router: &PipeRouter,
    pipe: &Pipe,
    spec: &SequenceSpec,
    memory: WorkingMemory,
    params: &PipeRunParams,
    stack: &CallStack,
) -> PipeworksResult<PipeOutput> {
    let mut memory = memory;

    for (index, step) in spec.steps.iter().enumerate() {
        tracing::debug!(
            pipe = %pipe.code(),
            step = index,
            sub_pipe = %step.pipe_code,
            result = %step.result_name(),
            "sequence step"
        );

        let output = match &step.batch {
            Some(spec) => {
                let job = BatchJob {
                    caller: pipe.code(),
                    branch_pipe_code: &step.pipe_code,
                    input_list_name: &spec.list_name,
                    input_item_name: &spec.item_name,
                    result_name: step.result_name(),
                    output_concept: None,
                };
                batch::run_items(router, &job, memory, params, stack).await?
            }
            None => {
                router
                    .run(&step.pipe_code, memory, params.for_sub_pipe(step), stack)
                    .await?
            }
        };
        memory = output.working_memory;
    }

    PipeOutput::from_memory(memory)
}

#[cfg(test)]
mod tests {
    use crate::library::LibraryLoader;
    use crate::memory::WorkingMemory;
    use crate::operators::{create_default_operators, FuncRegistry};
    use crate::pipe::PipeRunParams;
    use crate::router::PipeRouter;
    use crate::stuff::{Stuff, StuffContent};
    use std::sync::Arc;

    const LIBRARY: &str = r#"
domain = "demo"

[concept]
Draft = "A first draft"
Article = "A finished article"

[pipe.draft]
type = "PipeLLM"
definition = "Draft an article"
inputs = { topic = "Text" }
output = "Draft"
prompt_template = "Draft an article about $topic"

[pipe.polish]
type = "PipeLLM"
definition = "Polish a draft"
inputs = { draft = "Draft" }
output = "Article"
prompt_template = "Polish: @draft"

[pipe.write]
type = "PipeSequence"
definition = "Draft then polish"
inputs = { topic = "Text" }
output = "Article"
steps = [
    { pipe = "draft", result = "draft" },
    { pipe = "polish", result = "article" },
]

[pipe.wrap]
type = "PipeJinja2"
definition = "Wrap a word"
inputs = { word = "Text" }
jinja2 = "<{{ word }}>"

[pipe.wrap_all]
type = "PipeSequence"
definition = "Wrap every word"
inputs = { words = "Text[]" }
steps = [{ pipe = "wrap", result = "wrapped", batch_over = "words", batch_as = "word" }]
"#;

    fn router() -> PipeRouter {
        let library = LibraryLoader::new().load_str(LIBRARY, "demo.toml").unwrap();
        PipeRouter::new(
            Arc::new(library),
            Arc::new(create_default_operators(FuncRegistry::new())),
        )
    }

    #[tokio::test]
    async fn test_steps_see_earlier_results() {
        let output = router()
            .run_pipe("write", WorkingMemory::from_text("topic", "tides"), PipeRunParams::dry())
            .await
            .unwrap();

        let names: Vec<&String> = output.working_memory.names().collect();
        assert_eq!(names, vec!["topic", "draft", "article"]);
        assert_eq!(output.main_stuff.name, "article");
        assert_eq!(output.main_stuff.concept, "demo.Article");
    }

    #[tokio::test]
    async fn test_dry_runs_are_deterministic() {
        let router = router();
        let first = router
            .run_pipe("write", WorkingMemory::from_text("topic", "tides"), PipeRunParams::dry())
            .await
            .unwrap();
        let second = router
            .run_pipe("write", WorkingMemory::from_text("topic", "tides"), PipeRunParams::dry())
            .await
            .unwrap();

        let entries = |output: &crate::pipe::PipeOutput| -> Vec<Stuff> {
            output
                .working_memory
                .iter()
                .map(|(_, stuff)| Stuff::clone(stuff))
                .collect()
        };
        assert_eq!(entries(&first), entries(&second));
        assert_eq!(first.main_stuff, second.main_stuff);
    }

    #[tokio::test]
    async fn test_batched_step() {
        let memory = WorkingMemory::from_stuff(Stuff::new(
            "words",
            "native.Text",
            StuffContent::list(vec![StuffContent::text("a"), StuffContent::text("b")]),
        ));
        let output = router()
            .run_pipe("wrap_all", memory, PipeRunParams::live())
            .await
            .unwrap();

        assert_eq!(output.main_stuff.name, "wrapped");
        assert_eq!(
            output.main_stuff.content,
            StuffContent::list(vec![StuffContent::text("<a>"), StuffContent::text("<b>")])
        );
    }
}
