// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Library blueprints
//!
//! The declarative form of a library unit, as parsed from TOML:
//!
//! ```toml
//! domain = "summaries"
//! definition = "Summarizing documents"
//!
//! [concept]
//! Summary = "A short summary of a text"
//!
//! [pipe.summarize]
//! type = "PipeLLM"
//! definition = "Summarize a text"
//! inputs = { text = "Text" }
//! output = "Summary"
//! prompt_template = "Summarize this: $text"
//! ```
//!
//! Pipe tables are kept as raw TOML here; [`factory`] turns them into
//! [`crate::pipe::Pipe`] values with strict, kind-specific field checks.

mod factory;

pub use factory::{FactoryContext, FactoryRegistry, PipeFactoryFn};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::concept::{validate_domain_code, FieldSpec};
use crate::domain::Domain;
use crate::errors::{PipeworksError, PipeworksResult};
use crate::pipe::{InputRequirement, Multiplicity, PipeKind};

/// One library unit: a domain, its concepts and its pipes
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryBlueprint {
    pub domain: String,

    #[serde(default)]
    pub definition: Option<String>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub system_prompt_to_structure: Option<String>,

    #[serde(default)]
    pub prompt_template_to_structure: Option<String>,

    #[serde(default)]
    pub concept: IndexMap<String, ConceptBlueprint>,

    #[serde(default)]
    pub pipe: IndexMap<String, toml::Table>,
}

impl LibraryBlueprint {
    /// Parse a unit from TOML; `origin` labels errors
    pub fn from_toml(content: &str, origin: &str) -> PipeworksResult<Self> {
        let blueprint: Self =
            toml::from_str(content).map_err(|e| PipeworksError::BlueprintInvalid {
                origin: origin.to_string(),
                reason: e.to_string(),
            })?;
        validate_domain_code(&blueprint.domain)?;
        Ok(blueprint)
    }

    /// Domain declared by this unit
    pub fn to_domain(&self) -> Domain {
        Domain {
            code: self.domain.clone(),
            definition: self.definition.clone(),
            system_prompt: self.system_prompt.clone(),
            system_prompt_to_structure: self.system_prompt_to_structure.clone(),
            prompt_template_to_structure: self.prompt_template_to_structure.clone(),
        }
    }
}

/// A concept: a bare definition or a detailed table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConceptBlueprint {
    Definition(String),
    Detailed(ConceptDetails),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConceptDetails {
    pub definition: String,

    /// Parent concept, bare or qualified
    #[serde(default)]
    pub refines: Option<String>,

    #[serde(default)]
    pub structure: Option<StructureBlueprint>,
}

impl ConceptBlueprint {
    pub fn definition(&self) -> &str {
        match self {
            Self::Definition(d) => d,
            Self::Detailed(details) => &details.definition,
        }
    }

    pub fn refines(&self) -> Option<&str> {
        match self {
            Self::Definition(_) => None,
            Self::Detailed(details) => details.refines.as_deref(),
        }
    }

    pub fn structure(&self) -> Option<&StructureBlueprint> {
        match self {
            Self::Definition(_) => None,
            Self::Detailed(details) => details.structure.as_ref(),
        }
    }
}

/// A concept's structure: the name of a known shape, or inline fields
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StructureBlueprint {
    ClassName(String),
    Fields(IndexMap<String, FieldBlueprint>),
}

/// A field: a bare definition (text) or a full spec
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldBlueprint {
    Definition(String),
    Detailed(FieldSpec),
}

impl FieldBlueprint {
    pub fn to_spec(&self) -> FieldSpec {
        match self {
            Self::Definition(d) => FieldSpec::text(d),
            Self::Detailed(spec) => spec.clone(),
        }
    }
}

/// A declared input: `"Concept"` or `{ concept = "...", multiplicity = ... }`
///
/// The short form accepts `Concept[]` (any number) and `Concept[N]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputBlueprint {
    Concept(String),
    Detailed {
        concept: String,
        #[serde(default)]
        multiplicity: Option<MultiplicityBlueprint>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MultiplicityBlueprint {
    Flag(bool),
    Count(i64),
    Named(String),
}

impl MultiplicityBlueprint {
    pub fn to_multiplicity(&self) -> Result<Multiplicity, String> {
        match self {
            Self::Flag(true) => Ok(Multiplicity::Many),
            Self::Flag(false) => Ok(Multiplicity::One),
            Self::Count(1) => Ok(Multiplicity::One),
            Self::Count(n) if *n > 1 => Ok(Multiplicity::Exactly(*n as usize)),
            Self::Count(n) => Err(format!("multiplicity must be positive, got {}", n)),
            Self::Named(name) => match name.as_str() {
                "one" => Ok(Multiplicity::One),
                "optional" => Ok(Multiplicity::Optional),
                "many" => Ok(Multiplicity::Many),
                other => Err(format!(
                    "unknown multiplicity '{}', expected one, optional or many",
                    other
                )),
            },
        }
    }
}

impl InputBlueprint {
    /// Concept as written (unresolved) and its multiplicity
    pub fn split(&self) -> Result<(&str, Multiplicity), String> {
        match self {
            Self::Concept(s) => parse_concept_with_brackets(s),
            Self::Detailed {
                concept,
                multiplicity,
            } => {
                let multiplicity = match multiplicity {
                    Some(m) => m.to_multiplicity()?,
                    None => Multiplicity::One,
                };
                Ok((concept.as_str(), multiplicity))
            }
        }
    }

    /// Build the requirement once the concept string is resolved
    pub fn to_requirement(
        &self,
        resolve: impl FnOnce(&str) -> PipeworksResult<String>,
    ) -> Result<InputRequirement, String> {
        let (concept, multiplicity) = self.split()?;
        let concept = resolve(concept).map_err(|e| e.to_string())?;
        Ok(InputRequirement::new(&concept).with_multiplicity(multiplicity))
    }
}

fn parse_concept_with_brackets(s: &str) -> Result<(&str, Multiplicity), String> {
    let Some(open) = s.find('[') else {
        return Ok((s, Multiplicity::One));
    };
    let Some(inner) = s[open + 1..].strip_suffix(']') else {
        return Err(format!("unbalanced brackets in input concept '{}'", s));
    };
    let base = &s[..open];
    if inner.is_empty() {
        return Ok((base, Multiplicity::Many));
    }
    match inner.parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("invalid item count in input concept '{}'", s)),
        Ok(1) => Ok((base, Multiplicity::One)),
        Ok(n) => Ok((base, Multiplicity::Exactly(n))),
    }
}

/// Rewrite the legacy `PipeKind = "definition"` form into `type`/`definition`
pub fn normalize_legacy_pipe(origin: &str, code: &str, mut table: toml::Table) -> toml::Table {
    if table.contains_key("type") {
        return table;
    }

    let legacy = table
        .iter()
        .find(|(key, value)| PipeKind::from_type_name(key).is_some() && value.is_str())
        .map(|(key, _)| key.clone());

    if let Some(kind) = legacy {
        tracing::warn!(
            origin = %origin,
            pipe = %code,
            "legacy pipe syntax `{} = \"...\"` is deprecated, use `type = \"{}\"` and `definition`",
            kind,
            kind
        );
        if let Some(definition) = table.remove(&kind) {
            table.insert("type".into(), toml::Value::String(kind));
            table.entry("definition").or_insert(definition);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit() {
        let blueprint = LibraryBlueprint::from_toml(
            r#"
domain = "legal"
definition = "Contracts"
system_prompt = "You are a lawyer"

[concept]
Clause = "A contract clause"
Party = { definition = "A party", structure = { name = "Legal name", since = { type = "date", definition = "Start" } } }
Tenant = { definition = "A tenant", refines = "Party" }

[pipe.extract]
type = "PipeLLM"
definition = "Extract clauses"
"#,
            "legal.toml",
        )
        .unwrap();

        assert_eq!(blueprint.domain, "legal");
        assert_eq!(blueprint.to_domain().system_prompt.as_deref(), Some("You are a lawyer"));
        let codes: Vec<_> = blueprint.concept.keys().cloned().collect();
        assert_eq!(codes, vec!["Clause", "Party", "Tenant"]);
        assert_eq!(blueprint.concept["Tenant"].refines(), Some("Party"));

        let Some(StructureBlueprint::Fields(fields)) = blueprint.concept["Party"].structure() else {
            panic!("expected inline fields");
        };
        assert_eq!(fields["name"].to_spec().definition, "Legal name");
        assert_eq!(fields["since"].to_spec().kind, crate::concept::FieldKind::Date);
        assert!(blueprint.pipe.contains_key("extract"));
    }

    #[test]
    fn test_unknown_top_level_key() {
        let err = LibraryBlueprint::from_toml("domain = \"legal\"\nbogus = 1\n", "legal.toml")
            .unwrap_err();
        assert!(matches!(err, PipeworksError::BlueprintInvalid { origin, .. } if origin == "legal.toml"));
    }

    #[test]
    fn test_domain_must_be_snake_case() {
        let err = LibraryBlueprint::from_toml("domain = \"Legal\"\n", "legal.toml").unwrap_err();
        assert!(matches!(err, PipeworksError::ConceptDomain { .. }));
    }

    #[test]
    fn test_input_forms() {
        let one = InputBlueprint::Concept("Text".into());
        assert_eq!(one.split().unwrap(), ("Text", Multiplicity::One));

        let many = InputBlueprint::Concept("Page[]".into());
        assert_eq!(many.split().unwrap(), ("Page", Multiplicity::Many));

        let three = InputBlueprint::Concept("Image[3]".into());
        assert_eq!(three.split().unwrap(), ("Image", Multiplicity::Exactly(3)));

        let optional = InputBlueprint::Detailed {
            concept: "Text".into(),
            multiplicity: Some(MultiplicityBlueprint::Named("optional".into())),
        };
        assert_eq!(optional.split().unwrap(), ("Text", Multiplicity::Optional));

        let flag = InputBlueprint::Detailed {
            concept: "Text".into(),
            multiplicity: Some(MultiplicityBlueprint::Flag(true)),
        };
        assert_eq!(flag.split().unwrap().1, Multiplicity::Many);

        assert!(InputBlueprint::Concept("Image[x]".into()).split().is_err());
        assert!(InputBlueprint::Concept("Image[3".into()).split().is_err());
    }

    #[test]
    fn test_legacy_syntax_is_normalized() {
        let table: toml::Table = toml::from_str("PipeLLM = \"Summarize a text\"\noutput = \"Text\"\n").unwrap();
        let table = normalize_legacy_pipe("a.toml", "summarize", table);
        assert_eq!(table["type"].as_str(), Some("PipeLLM"));
        assert_eq!(table["definition"].as_str(), Some("Summarize a text"));
        assert!(!table.contains_key("PipeLLM"));
    }

    #[test]
    fn test_modern_syntax_is_untouched() {
        let table: toml::Table =
            toml::from_str("type = \"PipeJinja2\"\ndefinition = \"Render\"\n").unwrap();
        let normalized = normalize_legacy_pipe("a.toml", "render", table.clone());
        assert_eq!(normalized, table);
    }
}
