// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Dry-run validation
//!
//! Synthesizes plausible values for every concept and runs pipes in DRY
//! mode, where operators return mocks instead of calling their backend.
//! Combined with the static input analysis in [`crate::validation`], this
//! surfaces wiring errors before any external call is made.

use std::sync::Arc;

use crate::concept::{ConceptLibrary, NativeConcept};
use crate::errors::{PipeworksError, PipeworksResult};
use crate::library::Library;
use crate::memory::WorkingMemory;
use crate::operators::OperatorRegistry;
use crate::pipe::{InputRequirement, Multiplicity, Pipe, PipeRunParams, ResolvedMultiplicity};
use crate::router::{PipeRouter, DEFAULT_MAX_CALL_DEPTH};
use crate::stuff::{Stuff, StuffContent};
use crate::validation::{validate_pipe_inputs, StaticValidationError, StaticValidationErrorKind};

/// Prefix of every synthesized text
pub const DRY_RUN_MARKER: &str = "DRY RUN";

/// Default number of items in a synthesized list
pub const DEFAULT_NB_LIST_ITEMS: usize = 3;

/// Default bound of the self-healing loop
pub const DEFAULT_MAX_HEALING_ITERATIONS: usize = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Mocks
// ─────────────────────────────────────────────────────────────────────────────

/// Synthesize content for a concept, shaped after its structure class
pub fn mock_content(concepts: &ConceptLibrary, concept: &str, label: &str) -> StuffContent {
    let class = concepts.structure_class_of(concept);
    let marker = format!("{}: {} ({})", DRY_RUN_MARKER, label, concept);

    let native = NativeConcept::ALL
        .into_iter()
        .find(|n| n.structure_class_name() == class);

    match native {
        Some(NativeConcept::Image) => StuffContent::Image {
            url: format!("https://dry-run.invalid/{}.png", label),
            caption: Some(marker),
        },
        Some(NativeConcept::Pdf) => StuffContent::Pdf {
            url: format!("https://dry-run.invalid/{}.pdf", label),
        },
        Some(NativeConcept::Number) => StuffContent::Number { number: 0.0 },
        Some(NativeConcept::Html) => StuffContent::Html {
            html: format!("<p>{}</p>", marker),
        },
        Some(NativeConcept::TextAndImages) => StuffContent::TextAndImages {
            text: Some(marker),
            images: vec![],
        },
        Some(NativeConcept::Page) => StuffContent::Page {
            text: marker,
            images: vec![],
            page_view: None,
        },
        Some(NativeConcept::Dynamic) => StuffContent::Dynamic {
            value: serde_json::Value::String(marker),
        },
        Some(_) => StuffContent::text(marker),
        None => StuffContent::Structured {
            fields: concepts
                .structures()
                .get(&class)
                .map(|shape| shape.mock_fields())
                .unwrap_or_default(),
            class_name: class,
        },
    }
}

/// Synthesize a stuff satisfying an input requirement
pub fn mock_stuff(
    concepts: &ConceptLibrary,
    name: &str,
    requirement: &InputRequirement,
    nb_list_items: usize,
) -> Stuff {
    let content = match requirement.multiplicity {
        Multiplicity::Many => mock_list(concepts, &requirement.concept, name, nb_list_items),
        Multiplicity::Exactly(n) => mock_list(concepts, &requirement.concept, name, n),
        Multiplicity::One | Multiplicity::Optional => {
            mock_content(concepts, &requirement.concept, name)
        }
    };
    Stuff::new(name, requirement.concept.clone(), content)
}

fn mock_list(concepts: &ConceptLibrary, concept: &str, label: &str, count: usize) -> StuffContent {
    StuffContent::list(
        (0..count)
            .map(|i| mock_content(concepts, concept, &format!("{}_{}", label, i)))
            .collect(),
    )
}

/// Synthesize an operator's output, a list when multiple outputs are enabled
pub fn mock_output(
    concepts: &ConceptLibrary,
    concept: &str,
    label: &str,
    multiplicity: &ResolvedMultiplicity,
    nb_list_items: usize,
) -> StuffContent {
    if multiplicity.enabled {
        mock_list(
            concepts,
            concept,
            label,
            multiplicity.count.unwrap_or(nb_list_items),
        )
    } else {
        mock_content(concepts, concept, label)
    }
}

/// Memory holding a mock for every input the pipe declares
pub fn make_dry_run_memory(
    concepts: &ConceptLibrary,
    pipe: &Pipe,
    nb_list_items: usize,
) -> WorkingMemory {
    WorkingMemory::from_stuffs(
        pipe.core
            .inputs
            .iter()
            .map(|(name, requirement)| mock_stuff(concepts, name, requirement, nb_list_items))
            .collect(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────────────────────────

/// Dry-run outcome for one pipe
#[derive(Debug)]
pub struct PipeDryRunReport {
    pub pipe_code: String,
    /// Errors from comparing declared and needed inputs
    pub static_errors: Vec<StaticValidationError>,
    /// Error raised by the dry run itself
    pub run_error: Option<PipeworksError>,
}

impl PipeDryRunReport {
    pub fn is_ok(&self) -> bool {
        self.static_errors.is_empty() && self.run_error.is_none()
    }

    /// Every static error, including one raised during the run
    pub fn all_static_errors(&self) -> impl Iterator<Item = &StaticValidationError> {
        self.static_errors
            .iter()
            .chain(self.run_error.as_ref().and_then(PipeworksError::as_static_validation))
    }
}

/// Input declaration added by the self-healing loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealingPatch {
    pub pipe_code: String,
    pub input_name: String,
    pub concept: String,
}

/// Dry-run outcome for a library
#[derive(Debug, Default)]
pub struct DryRunReport {
    pub pipes: Vec<PipeDryRunReport>,
    pub healed: Vec<HealingPatch>,
}

impl DryRunReport {
    pub fn is_ok(&self) -> bool {
        self.pipes.iter().all(PipeDryRunReport::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PipeDryRunReport> {
        self.pipes.iter().filter(|p| !p.is_ok())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validator
// ─────────────────────────────────────────────────────────────────────────────

/// Dry-run settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunOptions {
    pub mock_inputs: bool,
    pub nb_list_items: usize,
    pub max_healing_iterations: usize,
    pub max_call_depth: usize,
}

impl Default for DryRunOptions {
    fn default() -> Self {
        Self {
            mock_inputs: true,
            nb_list_items: DEFAULT_NB_LIST_ITEMS,
            max_healing_iterations: DEFAULT_MAX_HEALING_ITERATIONS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Runs every pipe of a library in DRY mode
#[derive(Debug, Clone, Default)]
pub struct DryRunValidator {
    options: DryRunOptions,
}

impl DryRunValidator {
    pub fn new(options: DryRunOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DryRunOptions {
        &self.options
    }

    fn params(&self) -> PipeRunParams {
        PipeRunParams::dry()
            .with_mock_inputs(self.options.mock_inputs)
            .with_nb_list_items(self.options.nb_list_items)
    }

    fn router(&self, library: Arc<Library>) -> PipeRouter {
        // DRY runs never reach a backend
        PipeRouter::new(library, Arc::new(OperatorRegistry::new()))
            .with_max_call_depth(self.options.max_call_depth)
    }

    /// Statically check then dry-run one pipe
    pub async fn validate_pipe(&self, library: Arc<Library>, pipe_code: &str) -> PipeDryRunReport {
        let router = self.router(Arc::clone(&library));
        self.validate_with(&router, &library, pipe_code).await
    }

    async fn validate_with(
        &self,
        router: &PipeRouter,
        library: &Library,
        pipe_code: &str,
    ) -> PipeDryRunReport {
        let mut report = PipeDryRunReport {
            pipe_code: pipe_code.to_string(),
            static_errors: Vec::new(),
            run_error: None,
        };

        let pipe = match library.get_required_pipe(pipe_code) {
            Ok(pipe) => Arc::clone(pipe),
            Err(e) => {
                report.run_error = Some(e);
                return report;
            }
        };

        match validate_pipe_inputs(library, &pipe) {
            Ok(errors) => report.static_errors = errors,
            Err(e) => {
                report.run_error = Some(e);
                return report;
            }
        }

        let memory = make_dry_run_memory(library.concepts(), &pipe, self.options.nb_list_items);
        if let Err(e) = router.run_pipe(pipe.code(), memory, self.params()).await {
            report.run_error = Some(e);
        }

        tracing::debug!(pipe = %pipe_code, ok = report.is_ok(), "dry run");
        report
    }

    /// Dry-run every pipe of the library, in declaration order
    pub async fn validate_library(&self, library: Arc<Library>) -> DryRunReport {
        let router = self.router(Arc::clone(&library));
        let mut report = DryRunReport::default();

        for code in library.pipe_codes() {
            report
                .pipes
                .push(self.validate_with(&router, &library, &code).await);
        }

        report
    }

    /// Patch missing controller inputs until the library validates
    ///
    /// Each round declares, on the controller, every missing input the
    /// previous round reported, with the concept the error required. Stops
    /// when a round finds nothing to patch or after
    /// `max_healing_iterations` rounds.
    pub async fn heal(&self, library: &Library) -> PipeworksResult<(Library, DryRunReport)> {
        let mut library = library.clone();
        let mut healed: Vec<HealingPatch> = Vec::new();

        for iteration in 0..self.options.max_healing_iterations {
            let report = self.validate_library(Arc::new(library.clone())).await;
            let patches = healing_patches(&library, &report);

            if patches.is_empty() {
                return Ok((library, DryRunReport { healed, ..report }));
            }

            for patch in &patches {
                tracing::warn!(
                    pipe = %patch.pipe_code,
                    input = %patch.input_name,
                    concept = %patch.concept,
                    iteration,
                    "healing: declaring missing input"
                );
                let mut pipe = Pipe::clone(library.get_required_pipe(&patch.pipe_code)?);
                pipe.core
                    .inputs
                    .insert(&patch.input_name, InputRequirement::new(&patch.concept));
                library.replace_pipe(pipe)?;
            }
            healed.extend(patches);
        }

        let report = self.validate_library(Arc::new(library.clone())).await;
        Ok((library, DryRunReport { healed, ..report }))
    }
}

fn healing_patches(library: &Library, report: &DryRunReport) -> Vec<HealingPatch> {
    let mut patches: Vec<HealingPatch> = Vec::new();

    for error in report.pipes.iter().flat_map(PipeDryRunReport::all_static_errors) {
        if error.kind != StaticValidationErrorKind::MissingInputVariable {
            continue;
        }
        let is_controller = library
            .get_pipe(&error.pipe_code)
            .is_some_and(|p| p.is_controller());
        if !is_controller {
            continue;
        }

        let concept = error
            .required_concept
            .clone()
            .unwrap_or_else(|| NativeConcept::Anything.concept_string());
        for name in &error.variable_names {
            let patch = HealingPatch {
                pipe_code: error.pipe_code.clone(),
                input_name: name.clone(),
                concept: concept.clone(),
            };
            if !patches.contains(&patch) {
                patches.push(patch);
            }
        }
    }

    patches
}
