// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Prompt templates
//!
//! Prompts reference inputs as `$name` (inline) or `@name` (as a block).
//! Both are rewritten to minijinja expressions before rendering, so plain
//! Jinja syntax keeps working alongside them.

use minijinja::{Environment, Value};
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::errors::OperatorError;

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|[^\w])([$@])([a-z_][a-z0-9_]*(?:\.[a-z_][a-z0-9_]*)*)")
            .expect("valid prompt variable regex")
    })
}

/// Root names of the variables a prompt references, in order of appearance
pub fn prompt_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in variable_regex().captures_iter(template) {
        let path = &caps[3];
        let root = path.split('.').next().unwrap_or(path).to_string();
        if !names.contains(&root) {
            names.push(root);
        }
    }
    names
}

fn to_jinja(template: &str) -> String {
    variable_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            let prefix = &caps[1];
            let path = &caps[3];
            match &caps[2] {
                "@" => format!("{}\n{{{{ {} }}}}\n", prefix, path),
                _ => format!("{}{{{{ {} }}}}", prefix, path),
            }
        })
        .into_owned()
}

fn template_error(error: minijinja::Error) -> OperatorError {
    OperatorError::Template {
        message: error.to_string(),
    }
}

/// Parse a minijinja template without rendering it
pub fn check_template(template: &str) -> Result<(), OperatorError> {
    let env = Environment::new();
    env.template_from_str(template)
        .map(|_| ())
        .map_err(template_error)
}

/// Parse a prompt without rendering it
pub fn check_prompt(template: &str) -> Result<(), OperatorError> {
    check_template(&to_jinja(template))
}

/// Render a minijinja template against a context of input values
pub fn render_template(
    template: &str,
    context: &serde_json::Map<String, serde_json::Value>,
) -> Result<String, OperatorError> {
    let env = Environment::new();
    env.render_str(template, Value::from_serialize(context))
        .map_err(template_error)
}

/// Render a prompt against a context of input values
pub fn render_prompt(
    template: &str,
    context: &serde_json::Map<String, serde_json::Value>,
) -> Result<String, OperatorError> {
    render_template(&to_jinja(template), context).map(|rendered| rendered.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_prompt_variables() {
        let vars = prompt_variables("Analyze this document:\n@context\n@document and $context.title");
        assert_eq!(vars, vec!["context", "document"]);
    }

    #[test]
    fn test_email_is_not_a_variable() {
        assert!(prompt_variables("Write to team@example.com").is_empty());
    }

    #[test]
    fn test_render_inline_and_block() {
        let ctx = context(&[
            ("topic", serde_json::json!("rust")),
            ("doc", serde_json::json!({ "title": "Ownership" })),
        ]);
        let rendered = render_prompt("Write about $topic.\n@doc.title", &ctx).unwrap();
        assert_eq!(rendered, "Write about rust.\n\nOwnership");
    }

    #[test]
    fn test_check_prompt() {
        assert!(check_prompt("Summarize $text\n@doc").is_ok());
        let err = check_prompt("Summarize {{ text ").unwrap_err();
        assert!(matches!(err, OperatorError::Template { .. }));
    }

    #[test]
    fn test_check_template() {
        assert!(check_template("Hello {{ name }}").is_ok());
        assert!(check_template("Hello {{ name ").is_err());
        assert!(render_template("{{ name | nosuchfilter }}", &context(&[])).is_err());
    }

    #[test]
    fn test_render_error_is_reported() {
        let err = render_prompt("{{ broken", &context(&[])).unwrap_err();
        assert!(matches!(err, OperatorError::Template { .. }));
    }
}
