// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! The pipe library
//!
//! A [`Library`] owns the domain, concept and pipe registries of one loaded
//! set of units. It is built by the [`LibraryLoader`] and shared read-only
//! (behind an `Arc`) with the router.

mod graph;
mod loader;
mod validator;

pub use graph::LibraryGraph;
pub use loader::{find_library_files, LibraryLoader, LoadMode};
pub use validator::{LibraryValidator, ValidationResult};

use indexmap::IndexMap;
use std::sync::Arc;

use crate::concept::{split_concept_string, ConceptLibrary};
use crate::domain::DomainLibrary;
use crate::errors::{PipeworksError, PipeworksResult};
use crate::pipe::Pipe;

/// Registries of a loaded library
#[derive(Debug, Clone, Default)]
pub struct Library {
    domains: DomainLibrary,
    concepts: ConceptLibrary,
    /// Pipes by bare code, in load order
    pipes: IndexMap<String, Arc<Pipe>>,
}

impl Library {
    /// Create an empty library holding only the native concepts
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domains(&self) -> &DomainLibrary {
        &self.domains
    }

    pub fn domains_mut(&mut self) -> &mut DomainLibrary {
        &mut self.domains
    }

    pub fn concepts(&self) -> &ConceptLibrary {
        &self.concepts
    }

    pub fn concepts_mut(&mut self) -> &mut ConceptLibrary {
        &mut self.concepts
    }

    /// Register a pipe
    ///
    /// Fails with `DuplicatePipe` when the code is taken, unless
    /// `allow_update` is set.
    pub fn add_pipe(&mut self, pipe: Pipe, allow_update: bool) -> PipeworksResult<()> {
        let code = pipe.code().to_string();
        if self.pipes.contains_key(&code) && !allow_update {
            return Err(PipeworksError::DuplicatePipe { pipe: code });
        }
        self.pipes.insert(code, Arc::new(pipe));
        Ok(())
    }

    /// Replace an existing pipe, keeping its position
    pub fn replace_pipe(&mut self, pipe: Pipe) -> PipeworksResult<()> {
        match self.pipes.get_mut(pipe.code()) {
            Some(slot) => {
                *slot = Arc::new(pipe);
                Ok(())
            }
            None => Err(PipeworksError::PipeNotFound {
                pipe: pipe.code().to_string(),
            }),
        }
    }

    /// Look up a pipe by bare code or `domain.code`
    pub fn get_pipe(&self, code: &str) -> Option<&Arc<Pipe>> {
        match split_concept_string(code) {
            (Some(domain), bare) => self.pipes.get(bare).filter(|p| p.domain() == domain),
            (None, bare) => self.pipes.get(bare),
        }
    }

    pub fn get_required_pipe(&self, code: &str) -> PipeworksResult<&Arc<Pipe>> {
        self.get_pipe(code).ok_or_else(|| PipeworksError::PipeNotFound {
            pipe: code.to_string(),
        })
    }

    pub fn pipes(&self) -> impl Iterator<Item = &Arc<Pipe>> {
        self.pipes.values()
    }

    /// Pipe codes in load order
    pub fn pipe_codes(&self) -> Vec<String> {
        self.pipes.keys().cloned().collect()
    }

    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    /// Clear every registry and re-seed the native concepts
    pub fn teardown(&mut self) {
        self.domains.clear();
        self.concepts.clear();
        self.pipes.clear();
    }

    /// Check references, concepts and pipe-kind rules
    pub fn validate(&self) -> ValidationResult {
        LibraryValidator::validate(self)
    }

    /// Pipe reference graph
    pub fn graph(&self) -> LibraryGraph {
        LibraryGraph::build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;
    use crate::domain::Domain;
    use crate::pipe::{FuncSpec, OperatorSpec, PipeCore, PipeSpec};

    fn func(domain: &str, code: &str) -> Pipe {
        Pipe::new(
            PipeCore::new(domain, code, "native.Text"),
            PipeSpec::Operator(OperatorSpec::Func(FuncSpec {
                function_name: "f".into(),
            })),
        )
    }

    #[test]
    fn test_duplicate_pipe() {
        let mut library = Library::new();
        library.add_pipe(func("demo", "shout"), false).unwrap();

        let err = library.add_pipe(func("demo", "shout"), false).unwrap_err();
        assert!(matches!(err, PipeworksError::DuplicatePipe { pipe } if pipe == "shout"));

        library.add_pipe(func("demo", "shout"), true).unwrap();
        assert_eq!(library.pipe_count(), 1);
    }

    #[test]
    fn test_lookup_by_qualified_code() {
        let mut library = Library::new();
        library.add_pipe(func("demo", "shout"), false).unwrap();

        assert!(library.get_pipe("shout").is_some());
        assert!(library.get_pipe("demo.shout").is_some());
        assert!(library.get_pipe("other.shout").is_none());
        assert!(matches!(
            library.get_required_pipe("whisper"),
            Err(PipeworksError::PipeNotFound { .. })
        ));
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut library = Library::new();
        library.add_pipe(func("demo", "a"), false).unwrap();
        library.add_pipe(func("demo", "b"), false).unwrap();

        let mut replacement = func("demo", "a");
        replacement.core.definition = "patched".into();
        library.replace_pipe(replacement).unwrap();

        assert_eq!(library.pipe_codes(), vec!["a", "b"]);
        assert_eq!(library.get_required_pipe("a").unwrap().core.definition, "patched");
        assert!(library.replace_pipe(func("demo", "c")).is_err());
    }

    #[test]
    fn test_teardown_resets_everything() {
        let mut library = Library::new();
        library.domains_mut().add(Domain::new("demo"));
        library
            .concepts_mut()
            .register(Concept::new("demo", "Note", "A note"), false)
            .unwrap();
        library.add_pipe(func("demo", "a"), false).unwrap();

        library.teardown();
        assert!(library.domains().is_empty());
        assert_eq!(library.pipe_count(), 0);
        assert!(!library.concepts().contains("demo.Note"));
        assert!(library.concepts().contains("native.Text"));
    }
}
