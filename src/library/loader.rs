// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Library loading
//!
//! Units are loaded in three passes over the whole set: domains, then
//! concepts, then pipes. A pipe can therefore use any concept of the set,
//! and a concept can refine one declared later in the same domain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::Library;
use crate::blueprint::{FactoryContext, FactoryRegistry, LibraryBlueprint, StructureBlueprint};
use crate::concept::{validate_concept_code, Concept, StructureShape};
use crate::config::CONFIG_FILE_NAME;
use crate::domain::Domain;
use crate::errors::{PipeworksError, PipeworksResult};

/// Whether redefinitions replace or fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    #[default]
    Strict,
    AllowUpdate,
}

impl LoadMode {
    fn allow_update(self) -> bool {
        self == Self::AllowUpdate
    }
}

/// Builds libraries from TOML units
pub struct LibraryLoader {
    factories: FactoryRegistry,
    mode: LoadMode,
    validate: bool,
}

impl LibraryLoader {
    pub fn new() -> Self {
        Self {
            factories: FactoryRegistry::new(),
            mode: LoadMode::Strict,
            validate: true,
        }
    }

    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Skip library validation after loading
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Load a library from one TOML string
    pub fn load_str(&self, content: &str, origin: &str) -> PipeworksResult<Library> {
        let mut library = Library::new();
        self.load_str_into(&mut library, content, origin)?;
        Ok(library)
    }

    /// Load one TOML string into an existing library
    pub fn load_str_into(
        &self,
        library: &mut Library,
        content: &str,
        origin: &str,
    ) -> PipeworksResult<()> {
        let unit = LibraryBlueprint::from_toml(content, origin)?;
        self.load_units(library, vec![(origin.to_string(), unit)])
    }

    /// Load a library from files
    pub fn load_files(&self, paths: &[PathBuf]) -> PipeworksResult<Library> {
        let mut units = Vec::with_capacity(paths.len());
        for path in paths {
            let content =
                std::fs::read_to_string(path).map_err(|e| PipeworksError::FileReadError {
                    path: path.clone(),
                    error: e.to_string(),
                })?;
            let origin = path.display().to_string();
            let unit = LibraryBlueprint::from_toml(&content, &origin)?;
            units.push((origin, unit));
        }

        let mut library = Library::new();
        self.load_units(&mut library, units)?;
        Ok(library)
    }

    /// Load every `.toml` file found under the given directories
    pub fn load_dirs(&self, dirs: &[PathBuf]) -> PipeworksResult<Library> {
        let files = find_library_files(dirs)?;
        tracing::debug!(count = files.len(), "found library files");
        self.load_files(&files)
    }

    /// Run the three loading passes over parsed units
    ///
    /// Stops at the first invalid definition; what was registered before
    /// it stays registered.
    pub fn load_units(
        &self,
        library: &mut Library,
        units: Vec<(String, LibraryBlueprint)>,
    ) -> PipeworksResult<()> {
        let allow_update = self.mode.allow_update();

        // Pass 1: domains
        for (_, unit) in &units {
            library.domains_mut().add(unit.to_domain());
        }
        tracing::debug!(domains = library.domains().len(), "loaded domains");

        // Concept codes per domain across the whole set
        let mut siblings: HashMap<String, Vec<String>> = HashMap::new();
        for (_, unit) in &units {
            siblings
                .entry(unit.domain.clone())
                .or_default()
                .extend(unit.concept.keys().cloned());
        }

        // Pass 2: concepts
        for (origin, unit) in &units {
            let sibling_codes = siblings.get(&unit.domain).map(Vec::as_slice).unwrap_or(&[]);
            for (code, blueprint) in &unit.concept {
                validate_concept_code(code)?;
                let mut concept = Concept::new(&unit.domain, code, blueprint.definition());

                if let Some(parent) = blueprint.refines() {
                    let parent = library
                        .concepts()
                        .resolve(parent, &unit.domain, sibling_codes)
                        .map_err(|e| {
                            PipeworksError::concept_blueprint(origin, code, format!("refines: {}", e))
                        })?;
                    concept = concept.with_refines(&parent);
                }

                match blueprint.structure() {
                    Some(StructureBlueprint::ClassName(class)) => {
                        concept = concept.with_structure(class);
                    }
                    Some(StructureBlueprint::Fields(fields)) => {
                        let shape = fields
                            .iter()
                            .fold(StructureShape::new(code), |shape, (name, field)| {
                                shape.with_field(name, field.to_spec())
                            });
                        if library.concepts_mut().structures_mut().register(shape).is_some() {
                            tracing::debug!(structure = %code, origin = %origin, "structure redefined");
                        }
                        concept = concept.with_structure(code);
                    }
                    None if library.concepts().structures().contains(code) => {
                        concept = concept.with_structure(code);
                    }
                    None => {}
                }

                library.concepts_mut().register(concept, allow_update)?;
            }
        }
        tracing::debug!(concepts = library.concepts().len(), "loaded concepts");

        // Pass 3: pipes
        for (origin, unit) in units {
            let domain: Domain = library
                .domains()
                .get(&unit.domain)
                .cloned()
                .unwrap_or_else(|| unit.to_domain());
            let sibling_codes = siblings.get(&unit.domain).cloned().unwrap_or_default();

            for (code, table) in unit.pipe {
                let pipe = {
                    let ctx = FactoryContext {
                        domain: &domain,
                        origin: &origin,
                        concepts: library.concepts(),
                        sibling_codes: &sibling_codes,
                    };
                    self.factories.make_pipe(&ctx, &code, table)?
                };
                library.add_pipe(pipe, allow_update)?;
            }
        }
        tracing::debug!(pipes = library.pipe_count(), "loaded pipes");

        if self.validate {
            let result = library.validate();
            for warning in &result.warnings {
                tracing::warn!("{}", warning);
            }
            if !result.is_valid() {
                return Err(PipeworksError::LibraryInvalid {
                    errors: result.errors,
                });
            }
        }

        Ok(())
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Every `.toml` file under the given directories, sorted
///
/// The engine configuration file is skipped.
pub fn find_library_files(dirs: &[PathBuf]) -> PipeworksResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut patterns = Vec::new();

    for dir in dirs {
        let pattern = dir.join("**").join("*.toml").display().to_string();
        for entry in glob::glob(&pattern)?.flatten() {
            if entry.is_file() && !is_config_file(&entry) {
                files.push(entry);
            }
        }
        patterns.push(pattern);
    }

    if files.is_empty() {
        return Err(PipeworksError::NoLibraryFiles {
            pattern: patterns.join(", "),
        });
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn is_config_file(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME)
}
