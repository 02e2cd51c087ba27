// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Pipe factories
//!
//! A pipe table names its kind in `type`; the factory registered under
//! `<type>Factory` builds the pipe. The registry is filled once from the
//! closed set of [`PipeKind`]s.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use super::{normalize_legacy_pipe, InputBlueprint};
use crate::concept::{is_snake_case, ConceptLibrary, NativeConcept};
use crate::domain::Domain;
use crate::errors::{OperatorError, PipeworksError, PipeworksResult};
use crate::operators::{check_prompt, check_template, prompt_variables};
use crate::pipe::{
    make_output_multiplicity, BatchPipeSpec, BatchSpec, ConditionSpec, FuncSpec, ImgGenSpec,
    InputRequirement, Jinja2Spec, LlmSpec, OcrSpec, OperatorSpec, ParallelSpec, Pipe, PipeCore,
    PipeKind, PipeSpec, SequenceSpec, SubPipe,
};

/// What a factory needs besides the pipe table
pub struct FactoryContext<'a> {
    pub domain: &'a Domain,
    /// File (or label) the pipe comes from
    pub origin: &'a str,
    pub concepts: &'a ConceptLibrary,
    /// Concept codes declared for the domain anywhere in the load set
    pub sibling_codes: &'a [String],
}

impl FactoryContext<'_> {
    fn resolve_concept(&self, concept: &str) -> PipeworksResult<String> {
        self.concepts
            .resolve(concept, &self.domain.code, self.sibling_codes)
    }
}

/// Builds a pipe from its core and the kind-specific part of its table
pub type PipeFactoryFn = fn(&FactoryContext<'_>, PipeCore, toml::Table) -> PipeworksResult<Pipe>;

/// Factories by name
pub struct FactoryRegistry {
    factories: HashMap<String, PipeFactoryFn>,
}

impl FactoryRegistry {
    /// Create a registry with a factory for every pipe kind
    pub fn new() -> Self {
        let factories = PipeKind::ALL
            .into_iter()
            .map(|kind| (kind.factory_name(), factory_for(kind)))
            .collect();
        Self { factories }
    }

    pub fn get(&self, name: &str) -> Option<&PipeFactoryFn> {
        self.factories.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.factories.keys()
    }

    /// Build a pipe from its blueprint table
    pub fn make_pipe(
        &self,
        ctx: &FactoryContext<'_>,
        code: &str,
        table: toml::Table,
    ) -> PipeworksResult<Pipe> {
        if table.is_empty() {
            return Err(PipeworksError::EmptyPipeBlueprint {
                origin: ctx.origin.to_string(),
                pipe: code.to_string(),
            });
        }
        if !is_snake_case(code) {
            return Err(PipeworksError::pipe_blueprint(
                ctx.origin,
                code,
                "pipe codes must be snake_case",
            ));
        }

        let mut table = normalize_legacy_pipe(ctx.origin, code, table);
        let type_name = match table.remove("type") {
            Some(toml::Value::String(t)) => t,
            Some(other) => {
                return Err(PipeworksError::pipe_blueprint(
                    ctx.origin,
                    code,
                    format!("`type` must be a string, found {}", other.type_str()),
                ))
            }
            None => {
                return Err(PipeworksError::pipe_blueprint(
                    ctx.origin,
                    code,
                    "missing field `type`",
                ))
            }
        };

        let factory_name = format!("{}Factory", type_name);
        let factory = self
            .factories
            .get(&factory_name)
            .ok_or_else(|| PipeworksError::FactoryNotFound {
                origin: ctx.origin.to_string(),
                pipe: code.to_string(),
                factory: factory_name.clone(),
            })?;

        let core = make_core(ctx, code, &mut table)?;
        tracing::debug!(pipe = %code, factory = %factory_name, "building pipe");
        factory(ctx, core, table)
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn factory_for(kind: PipeKind) -> PipeFactoryFn {
    match kind {
        PipeKind::Sequence => make_sequence,
        PipeKind::Condition => make_condition,
        PipeKind::Parallel => make_parallel,
        PipeKind::Batch => make_batch,
        PipeKind::Llm => make_llm,
        PipeKind::Ocr => make_ocr,
        PipeKind::ImgGen => make_img_gen,
        PipeKind::Jinja2 => make_jinja2,
        PipeKind::Func => make_func,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared fields
// ─────────────────────────────────────────────────────────────────────────────

const CORE_FIELDS: [&str; 5] = ["definition", "inputs", "output", "nb_output", "multiple_output"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CoreBlueprint {
    #[serde(default)]
    definition: String,

    #[serde(default)]
    inputs: IndexMap<String, InputBlueprint>,

    #[serde(default = "default_output")]
    output: String,

    #[serde(default)]
    nb_output: Option<i64>,

    #[serde(default)]
    multiple_output: Option<bool>,
}

fn default_output() -> String {
    NativeConcept::Text.code().to_string()
}

fn parse_table<T: DeserializeOwned>(
    ctx: &FactoryContext<'_>,
    code: &str,
    table: toml::Table,
) -> PipeworksResult<T> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| PipeworksError::pipe_blueprint(ctx.origin, code, e.to_string()))
}

fn nb_output(ctx: &FactoryContext<'_>, code: &str, value: Option<i64>) -> PipeworksResult<Option<usize>> {
    match value {
        None => Ok(None),
        Some(n) if n >= 0 => Ok(Some(n as usize)),
        Some(n) => Err(PipeworksError::pipe_blueprint(
            ctx.origin,
            code,
            format!("nb_output must not be negative, got {}", n),
        )),
    }
}

/// Split the shared fields off the table and build the pipe core
fn make_core(ctx: &FactoryContext<'_>, code: &str, table: &mut toml::Table) -> PipeworksResult<PipeCore> {
    let mut core_table = toml::Table::new();
    for field in CORE_FIELDS {
        if let Some(value) = table.remove(field) {
            core_table.insert(field.to_string(), value);
        }
    }
    let blueprint: CoreBlueprint = parse_table(ctx, code, core_table)?;

    let output = ctx
        .resolve_concept(&blueprint.output)
        .map_err(|e| PipeworksError::pipe_blueprint(ctx.origin, code, format!("output: {}", e)))?;

    let mut core = PipeCore::new(&ctx.domain.code, code, &output).with_output_multiplicity(
        make_output_multiplicity(
            nb_output(ctx, code, blueprint.nb_output)?,
            blueprint.multiple_output,
        ),
    );
    core.definition = blueprint.definition;
    core.origin = Some(ctx.origin.to_string());

    for (name, input) in &blueprint.inputs {
        let requirement = input
            .to_requirement(|concept| ctx.resolve_concept(concept))
            .map_err(|reason| {
                PipeworksError::pipe_blueprint(ctx.origin, code, format!("input '{}': {}", name, reason))
            })?;
        core.inputs.insert(name, requirement);
    }

    Ok(core)
}

// ─────────────────────────────────────────────────────────────────────────────
// Controllers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubPipeBlueprint {
    pipe: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    nb_output: Option<i64>,
    #[serde(default)]
    multiple_output: Option<bool>,
    #[serde(default)]
    batch_over: Option<String>,
    #[serde(default)]
    batch_as: Option<String>,
}

impl SubPipeBlueprint {
    fn into_sub_pipe(self, ctx: &FactoryContext<'_>, code: &str) -> PipeworksResult<SubPipe> {
        let batch = match (self.batch_over, self.batch_as) {
            (Some(list_name), Some(item_name)) => Some(BatchSpec {
                list_name,
                item_name,
            }),
            (None, None) => None,
            _ => {
                return Err(PipeworksError::pipe_blueprint(
                    ctx.origin,
                    code,
                    format!(
                        "step '{}' must set both batch_over and batch_as, or neither",
                        self.pipe
                    ),
                ))
            }
        };

        Ok(SubPipe {
            output_multiplicity: make_output_multiplicity(
                nb_output(ctx, code, self.nb_output)?,
                self.multiple_output,
            ),
            pipe_code: self.pipe,
            result: self.result,
            batch,
        })
    }
}

fn sub_pipes(
    ctx: &FactoryContext<'_>,
    code: &str,
    blueprints: Vec<SubPipeBlueprint>,
) -> PipeworksResult<Vec<SubPipe>> {
    blueprints
        .into_iter()
        .map(|b| b.into_sub_pipe(ctx, code))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SequenceBlueprint {
    steps: Vec<SubPipeBlueprint>,
}

fn make_sequence(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: SequenceBlueprint = parse_table(ctx, &core.code, table)?;
    let steps = sub_pipes(ctx, &core.code, blueprint.steps)?;
    Ok(Pipe::new(core, PipeSpec::Sequence(SequenceSpec { steps })))
}

/// Turn a template parse failure into a blueprint error naming the field
fn checked(
    ctx: &FactoryContext<'_>,
    code: &str,
    field: &str,
    result: Result<(), OperatorError>,
) -> PipeworksResult<()> {
    result.map_err(|e| {
        PipeworksError::pipe_blueprint(ctx.origin, code, format!("invalid `{}`: {}", field, e))
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionBlueprint {
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    expression_template: Option<String>,
    #[serde(default)]
    pipe_map: IndexMap<String, String>,
    #[serde(default)]
    default_pipe_code: Option<String>,
}

fn make_condition(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: ConditionBlueprint = parse_table(ctx, &core.code, table)?;
    let expression_template = match (blueprint.expression, blueprint.expression_template) {
        (Some(expression), None) => format!("{{{{ {} }}}}", expression.trim()),
        (None, Some(template)) => template,
        _ => {
            return Err(PipeworksError::pipe_blueprint(
                ctx.origin,
                &core.code,
                "exactly one of `expression` or `expression_template` is required",
            ))
        }
    };
    checked(ctx, &core.code, "expression", check_template(&expression_template))?;

    Ok(Pipe::new(
        core,
        PipeSpec::Condition(ConditionSpec {
            expression_template,
            pipe_map: blueprint.pipe_map,
            default_pipe_code: blueprint.default_pipe_code,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParallelBlueprint {
    parallels: Vec<SubPipeBlueprint>,
    #[serde(default)]
    add_each_output: bool,
    #[serde(default)]
    combined_output: Option<String>,
}

fn make_parallel(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: ParallelBlueprint = parse_table(ctx, &core.code, table)?;
    let branches = sub_pipes(ctx, &core.code, blueprint.parallels)?;

    // a result name selects that branch, anything else names a concept
    let combined_output = match blueprint.combined_output {
        Some(name) if branches.iter().any(|b| b.result_name() == name) => Some(name),
        Some(concept) => Some(ctx.resolve_concept(&concept).map_err(|e| {
            PipeworksError::pipe_blueprint(ctx.origin, &core.code, format!("combined_output: {}", e))
        })?),
        None => None,
    };

    Ok(Pipe::new(
        core,
        PipeSpec::Parallel(ParallelSpec {
            branches,
            add_each_output: blueprint.add_each_output,
            combined_output,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchBlueprint {
    branch_pipe_code: String,
    input_list_name: String,
    input_item_name: String,
}

fn make_batch(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: BatchBlueprint = parse_table(ctx, &core.code, table)?;
    Ok(Pipe::new(
        core,
        PipeSpec::Batch(BatchPipeSpec {
            branch_pipe_code: blueprint.branch_pipe_code,
            input_list_name: blueprint.input_list_name,
            input_item_name: blueprint.input_item_name,
        }),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LlmBlueprint {
    #[serde(default)]
    prompt_template: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    llm: Option<String>,
}

fn make_llm(ctx: &FactoryContext<'_>, mut core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: LlmBlueprint = parse_table(ctx, &core.code, table)?;
    if let Some(template) = &blueprint.prompt_template {
        checked(ctx, &core.code, "prompt_template", check_prompt(template))?;
    }

    if core.inputs.is_empty() {
        if let Some(template) = &blueprint.prompt_template {
            for name in prompt_variables(template) {
                core.inputs
                    .insert(&name, InputRequirement::new(&NativeConcept::Text.concept_string()));
            }
        }
    }

    let spec = LlmSpec {
        prompt_template: blueprint.prompt_template,
        system_prompt: blueprint
            .system_prompt
            .or_else(|| ctx.domain.system_prompt.clone()),
        llm: blueprint.llm,
    };
    Ok(Pipe::new(core, PipeSpec::Operator(OperatorSpec::Llm(spec))))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OcrBlueprint {
    #[serde(default)]
    page_images: bool,
    #[serde(default)]
    page_views: bool,
}

fn make_ocr(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: OcrBlueprint = parse_table(ctx, &core.code, table)?;
    Ok(Pipe::new(
        core,
        PipeSpec::Operator(OperatorSpec::Ocr(OcrSpec {
            page_images: blueprint.page_images,
            page_views: blueprint.page_views,
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImgGenBlueprint {
    #[serde(default)]
    img_gen_prompt: Option<String>,
    #[serde(default)]
    aspect_ratio: Option<String>,
}

fn make_img_gen(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: ImgGenBlueprint = parse_table(ctx, &core.code, table)?;
    if let Some(template) = &blueprint.img_gen_prompt {
        checked(ctx, &core.code, "img_gen_prompt", check_prompt(template))?;
    }
    Ok(Pipe::new(
        core,
        PipeSpec::Operator(OperatorSpec::ImgGen(ImgGenSpec {
            img_gen_prompt: blueprint.img_gen_prompt,
            aspect_ratio: blueprint.aspect_ratio,
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Jinja2Blueprint {
    jinja2: String,
}

fn make_jinja2(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: Jinja2Blueprint = parse_table(ctx, &core.code, table)?;
    checked(ctx, &core.code, "jinja2", check_template(&blueprint.jinja2))?;
    Ok(Pipe::new(
        core,
        PipeSpec::Operator(OperatorSpec::Jinja2(Jinja2Spec {
            jinja2: blueprint.jinja2,
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FuncBlueprint {
    function_name: String,
}

fn make_func(ctx: &FactoryContext<'_>, core: PipeCore, table: toml::Table) -> PipeworksResult<Pipe> {
    let blueprint: FuncBlueprint = parse_table(ctx, &core.code, table)?;
    Ok(Pipe::new(
        core,
        PipeSpec::Operator(OperatorSpec::Func(FuncSpec {
            function_name: blueprint.function_name,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;
    use crate::pipe::{Multiplicity, OutputMultiplicity};

    fn build(table: &str) -> PipeworksResult<Pipe> {
        build_as("test_pipe", table)
    }

    fn build_as(code: &str, table: &str) -> PipeworksResult<Pipe> {
        let mut domain = Domain::new("demo");
        domain.system_prompt = Some("Be brief".into());
        let mut concepts = ConceptLibrary::new();
        concepts
            .register(Concept::new("demo", "Summary", "A summary"), false)
            .unwrap();
        let siblings = vec!["Invoice".to_string()];
        let ctx = FactoryContext {
            domain: &domain,
            origin: "demo.toml",
            concepts: &concepts,
            sibling_codes: &siblings,
        };
        let table: toml::Table = toml::from_str(table).unwrap();
        FactoryRegistry::new().make_pipe(&ctx, code, table)
    }

    #[test]
    fn test_factory_names() {
        let registry = FactoryRegistry::new();
        assert!(registry.get("PipeSequenceFactory").is_some());
        assert!(registry.get("PipeLLMFactory").is_some());
        assert_eq!(registry.names().count(), PipeKind::ALL.len());
    }

    #[test]
    fn test_llm_pipe() {
        let pipe = build(
            r#"
type = "PipeLLM"
definition = "Summarize"
inputs = { text = "Text", invoices = "Invoice[]" }
output = "Summary"
nb_output = 2
prompt_template = "Summarize $text"
"#,
        )
        .unwrap();

        assert_eq!(pipe.kind(), PipeKind::Llm);
        assert_eq!(pipe.core.output, "demo.Summary");
        assert_eq!(pipe.core.output_multiplicity, Some(OutputMultiplicity::Count(2)));
        assert_eq!(pipe.core.inputs.get("text").unwrap().concept, "native.Text");
        let invoices = pipe.core.inputs.get("invoices").unwrap();
        assert_eq!(invoices.concept, "demo.Invoice");
        assert_eq!(invoices.multiplicity, Multiplicity::Many);
        assert_eq!(pipe.core.origin.as_deref(), Some("demo.toml"));

        let PipeSpec::Operator(OperatorSpec::Llm(spec)) = &pipe.spec else {
            panic!("expected an LLM pipe");
        };
        assert_eq!(spec.system_prompt.as_deref(), Some("Be brief"));
    }

    #[test]
    fn test_llm_inputs_inferred_from_prompt() {
        let pipe = build(
            r#"
type = "PipeLLM"
definition = "Answer"
prompt_template = "Answer $question using @context"
"#,
        )
        .unwrap();
        let names: Vec<_> = pipe.core.inputs.names().cloned().collect();
        assert_eq!(names, vec!["question", "context"]);
        assert_eq!(pipe.core.output, "native.Text");
    }

    #[test]
    fn test_unknown_field_names_pipe_and_file() {
        let err = build("type = \"PipeJinja2\"\ndefinition = \"R\"\njinja2 = \"x\"\nbogus = 1\n")
            .unwrap_err();
        let PipeworksError::PipeBlueprint { origin, pipe, reason } = err else {
            panic!("expected a pipe blueprint error");
        };
        assert_eq!(origin, "demo.toml");
        assert_eq!(pipe, "test_pipe");
        assert!(reason.contains("bogus"));
    }

    #[test]
    fn test_ill_typed_field() {
        let err = build("type = \"PipeOcr\"\ndefinition = \"R\"\npage_images = \"yes\"\n").unwrap_err();
        assert!(matches!(err, PipeworksError::PipeBlueprint { .. }));
    }

    #[test]
    fn test_unknown_type() {
        let err = build("type = \"PipeTeleport\"\ndefinition = \"?\"\n").unwrap_err();
        assert!(
            matches!(err, PipeworksError::FactoryNotFound { factory, .. } if factory == "PipeTeleportFactory")
        );
    }

    #[test]
    fn test_empty_table() {
        let err = build("").unwrap_err();
        assert!(matches!(err, PipeworksError::EmptyPipeBlueprint { .. }));
    }

    #[test]
    fn test_code_must_be_snake_case() {
        let err = build_as("TestPipe", "type = \"PipeFunc\"\nfunction_name = \"f\"\n").unwrap_err();
        assert!(matches!(err, PipeworksError::PipeBlueprint { .. }));
    }

    #[test]
    fn test_broken_templates_fail_to_load() {
        let cases = [
            ("jinja2", "type = \"PipeJinja2\"\ndefinition = \"R\"\njinja2 = \"Hello {{ name \"\n"),
            (
                "expression",
                "type = \"PipeCondition\"\ndefinition = \"R\"\nexpression_template = \"{{ size | lower \"\npipe_map = { a = \"b\" }\n",
            ),
            (
                "prompt_template",
                "type = \"PipeLLM\"\ndefinition = \"R\"\nprompt_template = \"Summarize {% if $text %}\"\n",
            ),
        ];
        for (field, table) in cases {
            let err = build(table).unwrap_err();
            let PipeworksError::PipeBlueprint { origin, pipe, reason } = err else {
                panic!("expected a pipe blueprint error for `{}`", field);
            };
            assert_eq!(origin, "demo.toml");
            assert_eq!(pipe, "test_pipe");
            assert!(reason.contains(field), "{}", reason);
        }
    }

    #[test]
    fn test_legacy_syntax() {
        let pipe = build("PipeJinja2 = \"Render\"\njinja2 = \"{{ text }}\"\n").unwrap();
        assert_eq!(pipe.kind(), PipeKind::Jinja2);
        assert_eq!(pipe.core.definition, "Render");
    }

    #[test]
    fn test_sequence_steps() {
        let pipe = build(
            r#"
type = "PipeSequence"
definition = "Flow"
steps = [
    { pipe = "extract", result = "pages" },
    { pipe = "summarize", result = "summaries", batch_over = "pages", batch_as = "page", multiple_output = true },
]
"#,
        )
        .unwrap();
        let PipeSpec::Sequence(seq) = &pipe.spec else {
            panic!("expected a sequence");
        };
        assert_eq!(seq.steps.len(), 2);
        let batched = &seq.steps[1];
        assert_eq!(batched.batch.as_ref().unwrap().item_name, "page");
        assert_eq!(batched.output_multiplicity, Some(OutputMultiplicity::Flag(true)));
    }

    #[test]
    fn test_half_batch_step_is_rejected() {
        let err = build(
            "type = \"PipeSequence\"\ndefinition = \"F\"\nsteps = [{ pipe = \"a\", batch_over = \"xs\" }]\n",
        )
        .unwrap_err();
        assert!(matches!(err, PipeworksError::PipeBlueprint { .. }));
    }

    #[test]
    fn test_condition_expression_is_wrapped() {
        let pipe = build(
            r#"
type = "PipeCondition"
definition = "Route"
expression = "input_data.category"
pipe_map = { small = "p1", large = "p2" }
"#,
        )
        .unwrap();
        let PipeSpec::Condition(cond) = &pipe.spec else {
            panic!("expected a condition");
        };
        assert_eq!(cond.expression_template, "{{ input_data.category }}");
        assert_eq!(cond.pipe_map["small"], "p1");
    }

    #[test]
    fn test_condition_needs_one_expression() {
        let err = build("type = \"PipeCondition\"\ndefinition = \"R\"\n").unwrap_err();
        assert!(matches!(err, PipeworksError::PipeBlueprint { .. }));
    }

    #[test]
    fn test_parallel_combined_output() {
        let pipe = build(
            r#"
type = "PipeParallel"
definition = "Fan out"
parallels = [{ pipe = "a", result = "first" }, { pipe = "b", result = "second" }]
combined_output = "first"
"#,
        )
        .unwrap();
        let PipeSpec::Parallel(par) = &pipe.spec else {
            panic!("expected a parallel");
        };
        assert_eq!(par.combined_output.as_deref(), Some("first"));

        let pipe = build(
            "type = \"PipeParallel\"\ndefinition = \"F\"\nparallels = [{ pipe = \"a\" }]\ncombined_output = \"Summary\"\n",
        )
        .unwrap();
        let PipeSpec::Parallel(par) = &pipe.spec else {
            panic!("expected a parallel");
        };
        assert_eq!(par.combined_output.as_deref(), Some("demo.Summary"));
    }

    #[test]
    fn test_unknown_output_concept() {
        let err = build("type = \"PipeFunc\"\nfunction_name = \"f\"\noutput = \"Nowhere\"\n").unwrap_err();
        let PipeworksError::PipeBlueprint { reason, .. } = err else {
            panic!("expected a pipe blueprint error");
        };
        assert!(reason.contains("demo.Nowhere"));
    }
}
