// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Concept registry, resolution and compatibility

use indexmap::IndexMap;
use std::collections::HashSet;

use super::{
    split_concept_string, validate_concept_code, validate_concept_string, Concept,
    NativeConcept, StructureRegistry, NATIVE_DOMAIN, TEXT_CONTENT_CLASS,
};
use crate::errors::{PipeworksError, PipeworksResult};

/// Registry of concepts, keyed by concept string
#[derive(Debug, Clone)]
pub struct ConceptLibrary {
    concepts: IndexMap<String, Concept>,
    structures: StructureRegistry,
}

impl ConceptLibrary {
    /// Create a library seeded with the native concepts
    pub fn new() -> Self {
        let mut library = Self {
            concepts: IndexMap::new(),
            structures: StructureRegistry::new(),
        };
        library.seed_natives();
        library
    }

    fn seed_natives(&mut self) {
        for native in NativeConcept::ALL {
            let concept = native.concept();
            self.concepts.insert(concept.concept_string(), concept);
        }
    }

    /// Register a concept
    ///
    /// Fails with `DuplicateConcept` when the concept string is taken,
    /// unless `allow_update` is set, in which case it is replaced.
    pub fn register(&mut self, concept: Concept, allow_update: bool) -> PipeworksResult<()> {
        let key = concept.concept_string();
        if concept.is_native() {
            return Err(PipeworksError::ConceptDomain {
                domain: NATIVE_DOMAIN.into(),
                reason: "The native domain is reserved".into(),
            });
        }
        if self.concepts.contains_key(&key) && !allow_update {
            return Err(PipeworksError::DuplicateConcept { concept: key });
        }
        self.concepts.insert(key, concept);
        Ok(())
    }

    pub fn get(&self, concept: &str) -> Option<&Concept> {
        match NativeConcept::from_concept_string(concept) {
            Some(native) => self.concepts.get(&native.concept_string()),
            None => self.concepts.get(concept),
        }
    }

    pub fn get_required(&self, concept: &str) -> PipeworksResult<&Concept> {
        self.get(concept).ok_or_else(|| PipeworksError::ConceptNotFound {
            concept: concept.to_string(),
        })
    }

    pub fn contains(&self, concept: &str) -> bool {
        self.get(concept).is_some()
    }

    /// Turn a bare code or a qualified string into a concept string
    ///
    /// Bare codes resolve to a native concept first, then to a concept
    /// registered in `context_domain`, then to one of `sibling_codes`
    /// (codes declared in the same domain but not registered yet).
    pub fn resolve(
        &self,
        concept: &str,
        context_domain: &str,
        sibling_codes: &[String],
    ) -> PipeworksResult<String> {
        validate_concept_string(concept)?;

        if let (Some(_), _) = split_concept_string(concept) {
            return Ok(concept.to_string());
        }

        validate_concept_code(concept)?;
        if let Some(native) = NativeConcept::from_code(concept) {
            return Ok(native.concept_string());
        }

        let qualified = format!("{}.{}", context_domain, concept);
        if self.concepts.contains_key(&qualified) || sibling_codes.iter().any(|c| c == concept) {
            return Ok(qualified);
        }

        Err(PipeworksError::ConceptNotFound { concept: qualified })
    }

    /// Proper ancestors of a concept through `refines`, nearest first
    pub fn ancestors(&self, concept: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(self.canonical(concept));

        let mut current = self.get(concept).and_then(|c| c.refines.clone());
        while let Some(parent) = current {
            let parent = self.canonical(&parent);
            if !seen.insert(parent.clone()) {
                break;
            }
            current = self.get(&parent).and_then(|c| c.refines.clone());
            ancestors.push(parent);
        }

        ancestors
    }

    /// Whether `concept` refines `ancestor`, directly or transitively
    pub fn refines(&self, concept: &str, ancestor: &str) -> bool {
        let ancestor = self.canonical(ancestor);
        self.ancestors(concept).iter().any(|a| *a == ancestor)
    }

    /// Structure class of a concept
    ///
    /// Explicit structure wins, then the nearest ancestor's, then plain text.
    pub fn structure_class_of(&self, concept: &str) -> String {
        if let Some(class) = self.get(concept).and_then(|c| c.structure_class_name.clone()) {
            return class;
        }
        self.ancestors(concept)
            .iter()
            .find_map(|a| self.get(a).and_then(|c| c.structure_class_name.clone()))
            .unwrap_or_else(|| TEXT_CONTENT_CLASS.to_string())
    }

    /// Whether a value of `tested` may be used where `wanted` is required
    ///
    /// Compatible when equal, when `wanted` is `native.Anything`, when they
    /// share a structure class, when one refines the other, or (non-strict
    /// only) when both refine a common ancestor.
    pub fn are_compatible(&self, tested: &str, wanted: &str, strict: bool) -> bool {
        let tested = self.canonical(tested);
        let wanted = self.canonical(wanted);

        if tested == wanted || wanted == NativeConcept::Anything.concept_string() {
            return true;
        }
        if self.structure_class_of(&tested) == self.structure_class_of(&wanted) {
            return true;
        }
        if self.refines(&tested, &wanted) || self.refines(&wanted, &tested) {
            return true;
        }
        if strict {
            return false;
        }

        let tested_ancestors: HashSet<String> = self.ancestors(&tested).into_iter().collect();
        self.ancestors(&wanted)
            .iter()
            .any(|a| tested_ancestors.contains(a))
    }

    pub fn is_image_concept(&self, concept: &str) -> bool {
        self.are_compatible(concept, &NativeConcept::Image.concept_string(), true)
    }

    pub fn is_pdf_concept(&self, concept: &str) -> bool {
        self.are_compatible(concept, &NativeConcept::Pdf.concept_string(), true)
    }

    /// Concept strings in registration order
    pub fn concept_strings(&self) -> impl Iterator<Item = &String> {
        self.concepts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// Concepts declared by library files, natives excluded
    pub fn declared(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values().filter(|c| !c.is_native())
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn structures(&self) -> &StructureRegistry {
        &self.structures
    }

    pub fn structures_mut(&mut self) -> &mut StructureRegistry {
        &mut self.structures
    }

    /// Drop every declared concept and shape, keeping the natives
    pub fn clear(&mut self) {
        self.concepts.clear();
        self.structures.clear();
        self.seed_natives();
    }

    fn canonical(&self, concept: &str) -> String {
        match NativeConcept::from_concept_string(concept) {
            Some(native) => native.concept_string(),
            None => concept.to_string(),
        }
    }
}

impl Default for ConceptLibrary {
    fn default() -> Self {
        Self::new()
    }
}
