// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Declared pipe inputs

use indexmap::IndexMap;
use serde::Serialize;

/// How many values an input slot holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    #[default]
    One,
    Optional,
    /// A list of any length
    Many,
    /// A list of exactly this many items
    Exactly(usize),
}

impl Multiplicity {
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional)
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many | Self::Exactly(_))
    }
}

/// Concept and multiplicity required for one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputRequirement {
    pub concept: String,
    pub multiplicity: Multiplicity,
}

impl InputRequirement {
    pub fn new(concept: &str) -> Self {
        Self {
            concept: concept.to_string(),
            multiplicity: Multiplicity::One,
        }
    }

    pub fn many(concept: &str) -> Self {
        Self {
            concept: concept.to_string(),
            multiplicity: Multiplicity::Many,
        }
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }
}

impl std::fmt::Display for InputRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.multiplicity {
            Multiplicity::One => write!(f, "{}", self.concept),
            Multiplicity::Optional => write!(f, "{} (optional)", self.concept),
            Multiplicity::Many => write!(f, "{}[]", self.concept),
            Multiplicity::Exactly(n) => write!(f, "{}[{}]", self.concept, n),
        }
    }
}

/// Ordered input declarations of a pipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipeInputSpec(IndexMap<String, InputRequirement>);

impl PipeInputSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, requirement: InputRequirement) -> Self {
        self.insert(name, requirement);
        self
    }

    pub fn insert(&mut self, name: &str, requirement: InputRequirement) {
        self.0.insert(name.to_string(), requirement);
    }

    pub fn get(&self, name: &str) -> Option<&InputRequirement> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InputRequirement)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Inputs that must be present at run time
    pub fn required(&self) -> impl Iterator<Item = (&String, &InputRequirement)> {
        self.0.iter().filter(|(_, r)| !r.multiplicity.is_optional())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, InputRequirement)> for PipeInputSpec {
    fn from_iter<T: IntoIterator<Item = (String, InputRequirement)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
