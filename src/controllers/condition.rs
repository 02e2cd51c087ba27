// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Condition controller
//!
//! The expression template is rendered against working memory; the trimmed
//! result is the discriminator looked up in `pipe_map`.

use minijinja::{Environment, Value};

use crate::errors::{PipeworksError, PipeworksResult};
use crate::memory::WorkingMemory;
use crate::pipe::{ConditionSpec, Pipe, PipeOutput, PipeRunParams};
use crate::router::{CallStack, PipeRouter};

/// Render the discriminator of a condition
pub fn evaluate_expression(spec: &ConditionSpec, memory: &WorkingMemory) -> Result<String, String> {
    let env = Environment::new();
    env.render_str(
        &spec.expression_template,
        Value::from_serialize(memory.template_context()),
    )
    .map(|rendered| rendered.trim().to_string())
    .map_err(|e| e.to_string())
}

pub async fn run(
    router: &PipeRouter,
    pipe: &Pipe,
    spec: &ConditionSpec,
    memory: WorkingMemory,
    params: &PipeRunParams,
    stack: &CallStack,
) -> PipeworksResult<PipeOutput> {
    let discriminator =
        evaluate_expression(spec, &memory).map_err(|message| PipeworksError::ExpressionError {
            pipe: pipe.code().to_string(),
            message,
        })?;
    tracing::debug!(pipe = %pipe.code(), discriminator = %discriminator, "condition evaluated");

    let target = match spec.pipe_map.get(&discriminator) {
        Some(code) => Some(code),
        // synthetic data rarely hits a mapped value
        None if params.is_dry() => None,
        None => spec.default_pipe_code.as_ref(),
    };

    if let Some(code) = target {
        return router
            .run(code, memory, params.for_inner_call(), stack)
            .await;
    }

    if params.is_dry() {
        return run_every_target(router, pipe, spec, memory, params, stack).await;
    }

    Err(PipeworksError::NoConditionMatch {
        pipe: pipe.code().to_string(),
        discriminator,
    })
}

/// Dry-run every branch on its own copy of memory, returning the first
async fn run_every_target(
    router: &PipeRouter,
    pipe: &Pipe,
    spec: &ConditionSpec,
    memory: WorkingMemory,
    params: &PipeRunParams,
    stack: &CallStack,
) -> PipeworksResult<PipeOutput> {
    let mut first: Option<PipeOutput> = None;

    for code in spec.target_pipe_codes() {
        tracing::debug!(pipe = %pipe.code(), branch = %code, "dry-running condition branch");
        let output = router
            .run(code, memory.clone(), params.for_inner_call(), stack)
            .await?;
        first.get_or_insert(output);
    }

    first.ok_or_else(|| PipeworksError::NoConditionMatch {
        pipe: pipe.code().to_string(),
        discriminator: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryLoader;
    use crate::operators::{create_default_operators, FuncRegistry};
    use crate::stuff::{Stuff, StuffContent};
    use std::sync::Arc;

    const LIBRARY: &str = r#"
domain = "demo"

[pipe.small_reply]
type = "PipeJinja2"
definition = "Reply to a small order"
inputs = { size = "Text" }
jinja2 = "small order"

[pipe.large_reply]
type = "PipeJinja2"
definition = "Reply to a large order"
inputs = { size = "Text" }
jinja2 = "large order"

[pipe.route]
type = "PipeCondition"
definition = "Route by size"
inputs = { size = "Text" }
expression = "size"
pipe_map = { small = "small_reply", large = "large_reply" }

[pipe.route_with_default]
type = "PipeCondition"
definition = "Route by size, large by default"
inputs = { size = "Text" }
expression_template = "{% if size == 'tiny' %}small{% else %}other{% endif %}"
pipe_map = { small = "small_reply" }
default_pipe_code = "large_reply"
"#;

    fn router() -> PipeRouter {
        let library = LibraryLoader::new().load_str(LIBRARY, "demo.toml").unwrap();
        PipeRouter::new(
            Arc::new(library),
            Arc::new(create_default_operators(FuncRegistry::new())),
        )
    }

    async fn route(pipe: &str, size: &str, params: PipeRunParams) -> PipeworksResult<PipeOutput> {
        router()
            .run_pipe(pipe, WorkingMemory::from_text("size", size), params)
            .await
    }

    #[tokio::test]
    async fn test_routes_to_mapped_pipe() {
        let output = route("route", "small", PipeRunParams::live()).await.unwrap();
        assert_eq!(output.main_stuff.name, "small_reply");
        assert_eq!(output.main_stuff.content.as_text(), Some("small order"));
        // only the matched branch ran
        assert!(!output.working_memory.contains("large_reply"));
    }

    #[tokio::test]
    async fn test_unmapped_value_fails() {
        let err = route("route", "medium", PipeRunParams::live()).await.unwrap_err();
        assert!(matches!(
            err,
            PipeworksError::NoConditionMatch { pipe, discriminator } if pipe == "route" && discriminator == "medium"
        ));
    }

    #[tokio::test]
    async fn test_default_pipe() {
        let output = route("route_with_default", "huge", PipeRunParams::live())
            .await
            .unwrap();
        assert_eq!(output.main_stuff.content.as_text(), Some("large order"));

        let output = route("route_with_default", "tiny", PipeRunParams::live())
            .await
            .unwrap();
        assert_eq!(output.main_stuff.content.as_text(), Some("small order"));
    }

    #[tokio::test]
    async fn test_dry_run_explores_every_branch() {
        let output = route("route", "DRY RUN: size (native.Text)", PipeRunParams::dry())
            .await
            .unwrap();
        // first declared branch wins
        assert_eq!(output.main_stuff.name, "small_reply");
    }

    #[tokio::test]
    async fn test_dry_run_reports_expression_errors() {
        let library = LibraryLoader::new()
            .load_str(
                r#"
domain = "demo"

[pipe.reply]
type = "PipeJinja2"
definition = "Reply"
inputs = { size = "Text" }
jinja2 = "ok"

[pipe.route]
type = "PipeCondition"
definition = "Route through a missing filter"
inputs = { size = "Text" }
expression_template = "{{ size | nosuchfilter }}"
pipe_map = { small = "reply" }
"#,
                "demo.toml",
            )
            .unwrap();
        let router = PipeRouter::new(
            Arc::new(library),
            Arc::new(create_default_operators(FuncRegistry::new())),
        );

        for params in [PipeRunParams::dry(), PipeRunParams::live()] {
            let err = router
                .run_pipe("route", WorkingMemory::from_text("size", "small"), params)
                .await
                .unwrap_err();
            assert!(
                matches!(&err, PipeworksError::ExpressionError { pipe, .. } if pipe == "route"),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn test_evaluate_expression() {
        let spec = ConditionSpec {
            expression_template: "{{ order.size }}".into(),
            pipe_map: Default::default(),
            default_pipe_code: None,
        };
        let memory = WorkingMemory::from_stuff(Stuff::new(
            "order",
            "native.Dynamic",
            StuffContent::Dynamic {
                value: serde_json::json!({ "size": " large " }),
            },
        ));
        assert_eq!(evaluate_expression(&spec, &memory), Ok("large".to_string()));

        let broken = ConditionSpec {
            expression_template: "{{ order.size ".into(),
            ..spec
        };
        assert!(evaluate_expression(&broken, &memory).is_err());
    }
}
