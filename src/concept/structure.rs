// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Structure shapes for structured concepts
//!
//! A shape is an ordered set of typed fields, declared inline in a concept
//! blueprint. Native content classes are known by name but carry no fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::NativeConcept;

/// Type of a structure field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Integer,
    Boolean,
    Date,
    List,
    Dict,
}

impl FieldKind {
    /// Dummy value used when synthesizing dry-run data
    pub fn mock_value(&self, field_name: &str) -> serde_json::Value {
        match self {
            Self::Text => serde_json::Value::String(format!("DRY RUN: {}", field_name)),
            Self::Number => serde_json::json!(0.0),
            Self::Integer => serde_json::json!(0),
            Self::Boolean => serde_json::Value::Bool(false),
            Self::Date => serde_json::Value::String("1970-01-01".into()),
            Self::List => serde_json::Value::Array(vec![]),
            Self::Dict => serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// One field of a structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub definition: String,

    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn text(definition: &str) -> Self {
        Self {
            kind: FieldKind::Text,
            definition: definition.to_string(),
            required: true,
            default: None,
        }
    }
}

/// A named structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureShape {
    pub name: String,
    pub fields: IndexMap<String, FieldSpec>,
}

impl StructureShape {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, spec: FieldSpec) -> Self {
        self.fields.insert(name.to_string(), spec);
        self
    }

    /// A value for every field: declared default, else a type-appropriate dummy
    pub fn mock_fields(&self) -> IndexMap<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(name, spec)| {
                let value = spec
                    .default
                    .clone()
                    .unwrap_or_else(|| spec.kind.mock_value(name));
                (name.clone(), value)
            })
            .collect()
    }
}

/// Registry of declared structure shapes
#[derive(Debug, Clone, Default)]
pub struct StructureRegistry {
    shapes: IndexMap<String, StructureShape>,
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape, returning the previous one under the same name
    pub fn register(&mut self, shape: StructureShape) -> Option<StructureShape> {
        self.shapes.insert(shape.name.clone(), shape)
    }

    pub fn get(&self, name: &str) -> Option<&StructureShape> {
        self.shapes.get(name)
    }

    /// Whether `name` is a declared shape or a native content class
    pub fn is_known(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
            || NativeConcept::ALL
                .iter()
                .any(|n| n.structure_class_name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}
