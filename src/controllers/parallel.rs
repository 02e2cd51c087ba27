// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Parallel controller

use futures::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::errors::PipeworksResult;
use crate::memory::WorkingMemory;
use crate::pipe::{ParallelSpec, Pipe, PipeOutput, PipeRunParams};
use crate::router::{CallStack, PipeRouter};
use crate::stuff::{Stuff, StuffContent};

/// Run every branch on the same snapshot, then merge in declared order
///
/// Branches write only their own result name, into their own copy of
/// memory; the merge back into `memory` happens after the join.
pub async fn run(
    router: &PipeRouter,
    pipe: &Pipe,
    spec: &ParallelSpec,
    memory: WorkingMemory,
    params: &PipeRunParams,
    stack: &CallStack,
) -> PipeworksResult<PipeOutput> {
    let mut memory = memory;

    tracing::debug!(pipe = %pipe.code(), branches = spec.branches.len(), "parallel fan-out");
    let runs = spec.branches.iter().map(|branch| {
        router.run(
            &branch.pipe_code,
            memory.clone(),
            params.for_sub_pipe(branch),
            stack,
        )
    });
    let results = join_all(runs).await;

    let mut outputs: IndexMap<&str, Arc<Stuff>> = IndexMap::with_capacity(results.len());
    for (branch, result) in spec.branches.iter().zip(results) {
        outputs.insert(branch.result_name(), result?.main_stuff);
    }

    if spec.add_each_output {
        for (name, stuff) in &outputs {
            memory.add_new_stuff(name, Stuff::clone(stuff));
        }
    }

    match &spec.combined_output {
        Some(name) if outputs.contains_key(name.as_str()) => {
            memory.set_new_main_stuff(Stuff::clone(&outputs[name.as_str()]), name);
        }
        Some(concept) => {
            let concepts = router.library().concepts();
            let fields = outputs
                .iter()
                .map(|(name, stuff)| (name.to_string(), stuff.content.to_template_value()))
                .collect();
            let content = StuffContent::Structured {
                class_name: concepts.structure_class_of(concept),
                fields,
            };
            let name = params.output_name.as_deref().unwrap_or(pipe.code());
            memory.set_new_main_stuff(Stuff::new(name, concept.as_str(), content), name);
        }
        None if memory.main_stuff().is_err() => {
            // nothing to pass through
            if let Some((name, stuff)) = outputs.first() {
                memory.set_new_main_stuff(Stuff::clone(stuff), name);
            }
        }
        None => {}
    }

    PipeOutput::from_memory(memory)
}

#[cfg(test)]
mod tests {
    use crate::controllers::testing::DelayedLlm;
    use crate::errors::PipeworksError;
    use crate::library::LibraryLoader;
    use crate::memory::WorkingMemory;
    use crate::operators::{create_default_operators, FuncRegistry};
    use crate::pipe::PipeRunParams;
    use crate::router::PipeRouter;
    use crate::stuff::StuffContent;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const LIBRARY: &str = r#"
domain = "demo"

[concept]
Review = { definition = "Three takes on a text", structure = { upper = "Uppercased", lower = "Lowercased", length = "Length" } }

[pipe.upper]
type = "PipeJinja2"
definition = "Uppercase"
inputs = { text = "Text" }
jinja2 = "{{ text | upper }}"

[pipe.lower]
type = "PipeJinja2"
definition = "Lowercase"
inputs = { text = "Text" }
jinja2 = "{{ text | lower }}"

[pipe.length]
type = "PipeJinja2"
definition = "Count characters"
inputs = { text = "Text" }
jinja2 = "{{ text | length }}"

[pipe.all_three]
type = "PipeParallel"
definition = "Every take, kept separately"
inputs = { text = "Text" }
parallels = [
    { pipe = "upper", result = "upper" },
    { pipe = "lower", result = "lower" },
    { pipe = "length", result = "length" },
]
add_each_output = true

[pipe.pick_lower]
type = "PipeParallel"
definition = "Every take, lowercase wins"
inputs = { text = "Text" }
parallels = [{ pipe = "upper", result = "upper" }, { pipe = "lower", result = "lower" }]
combined_output = "lower"

[pipe.review]
type = "PipeParallel"
definition = "Every take, combined"
inputs = { text = "Text" }
output = "Review"
parallels = [
    { pipe = "upper", result = "upper" },
    { pipe = "lower", result = "lower" },
    { pipe = "length", result = "length" },
]
combined_output = "Review"
"#;

    fn router() -> PipeRouter {
        let library = LibraryLoader::new().load_str(LIBRARY, "demo.toml").unwrap();
        PipeRouter::new(
            Arc::new(library),
            Arc::new(create_default_operators(FuncRegistry::new())),
        )
    }

    fn input() -> WorkingMemory {
        WorkingMemory::from_text("input_text", "Hello world")
    }

    #[tokio::test]
    async fn test_each_result_lands_under_its_name() {
        let output = router()
            .run_pipe("all_three", input(), PipeRunParams::live())
            .await
            .unwrap();

        let memory = &output.working_memory;
        assert_eq!(memory.len(), 4);
        assert_eq!(memory.get_stuff("upper").unwrap().content.as_text(), Some("HELLO WORLD"));
        assert_eq!(memory.get_stuff("lower").unwrap().content.as_text(), Some("hello world"));
        assert_eq!(memory.get_stuff("length").unwrap().content.as_text(), Some("11"));
        // the input stays the main stuff
        assert_eq!(output.main_stuff.name, "input_text");
    }

    #[tokio::test]
    async fn test_combined_output_selects_a_branch() {
        let output = router()
            .run_pipe("pick_lower", input(), PipeRunParams::live())
            .await
            .unwrap();
        assert_eq!(output.main_stuff.name, "lower");
        assert!(!output.working_memory.contains("upper"));
    }

    #[tokio::test]
    async fn test_combined_output_builds_a_concept() {
        let output = router()
            .run_pipe("review", input(), PipeRunParams::live())
            .await
            .unwrap();

        assert_eq!(output.main_stuff.name, "review");
        assert_eq!(output.main_stuff.concept, "demo.Review");
        let StuffContent::Structured { class_name, fields } = &output.main_stuff.content else {
            panic!("expected structured content");
        };
        assert_eq!(class_name, "Review");
        assert_eq!(fields["upper"], serde_json::json!("HELLO WORLD"));
        assert_eq!(fields.len(), 3);
    }

    const RACES: &str = r#"
domain = "demo"

[pipe.slow]
type = "PipeLLM"
definition = "Answer late"
prompt_template = "300 slow answer"

[pipe.quick]
type = "PipeLLM"
definition = "Answer early"
prompt_template = "150 quick answer"

[pipe.slow_failure]
type = "PipeLLM"
definition = "Fail late"
prompt_template = "150 fail late"

[pipe.quick_failure]
type = "PipeLLM"
definition = "Fail early"
prompt_template = "10 fail early"

[pipe.race]
type = "PipeParallel"
definition = "Slow branch declared first"
parallels = [{ pipe = "slow", result = "first" }, { pipe = "quick", result = "second" }]
add_each_output = true

[pipe.race_to_fail]
type = "PipeParallel"
definition = "The early failure is declared last"
parallels = [
    { pipe = "slow", result = "first" },
    { pipe = "slow_failure", result = "second" },
    { pipe = "quick_failure", result = "third" },
]
add_each_output = true
"#;

    fn race_router() -> PipeRouter {
        let library = LibraryLoader::new().load_str(RACES, "races.toml").unwrap();
        let mut operators = create_default_operators(FuncRegistry::new());
        operators.register(Box::new(DelayedLlm));
        PipeRouter::new(Arc::new(library), Arc::new(operators))
    }

    #[tokio::test]
    async fn test_results_follow_declared_order_not_completion() {
        let started = Instant::now();
        let output = race_router()
            .run_pipe("race", WorkingMemory::from_text("text", "go"), PipeRunParams::live())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        let names: Vec<&String> = output.working_memory.names().collect();
        assert_eq!(names, vec!["text", "first", "second"]);
        let memory = &output.working_memory;
        assert_eq!(memory.get_stuff("first").unwrap().content.as_text(), Some("slow answer"));
        assert_eq!(memory.get_stuff("second").unwrap().content.as_text(), Some("quick answer"));
        // branches overlapped
        assert!(elapsed < Duration::from_millis(420), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_first_declared_failure_wins() {
        let started = Instant::now();
        let err = race_router()
            .run_pipe("race_to_fail", WorkingMemory::from_text("text", "go"), PipeRunParams::live())
            .await
            .unwrap_err();

        // every branch ran to completion before the error surfaced
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(
            matches!(&err, PipeworksError::OperatorFailed { pipe, .. } if pipe == "slow_failure"),
            "{:?}",
            err
        );
        assert!(err.to_string().contains("fail late"));
    }
}
