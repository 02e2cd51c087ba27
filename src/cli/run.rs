// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Run command - execute one pipe

use colored::Colorize;
use miette::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{report_error, CommandContext};
use crate::memory::WorkingMemory;
use crate::operators::{create_default_operators, FuncRegistry};
use crate::pipe::PipeRunParams;
use crate::router::PipeRouter;
use crate::stuff::{Stuff, StuffContent};
use crate::utils::with_spinner;

/// One entry of an inputs file
///
/// ```json
/// {
///   "topic": "tides",
///   "keywords": ["moon", "gravity"],
///   "draft": { "concept": "demo.Draft", "content": { "kind": "text", "text": "..." } }
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputValue {
    Text(String),
    Texts(Vec<String>),
    Stuff {
        concept: String,
        content: StuffContent,
    },
}

impl InputValue {
    fn into_stuff(self, name: &str) -> Stuff {
        match self {
            Self::Text(text) => Stuff::text(name, text),
            Self::Texts(texts) => Stuff::new(
                name,
                "native.Text",
                StuffContent::list(texts.into_iter().map(StuffContent::text).collect()),
            ),
            Self::Stuff { concept, content } => Stuff::new(name, concept, content),
        }
    }
}

/// Read an inputs file into working memory; the first entry is main
fn load_inputs(path: &Path) -> Result<WorkingMemory> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read inputs '{}': {}", path.display(), e))?;
    let entries: indexmap::IndexMap<String, InputValue> = serde_json::from_str(&content)
        .map_err(|e| miette::miette!("Invalid inputs file '{}': {}", path.display(), e))?;

    Ok(WorkingMemory::from_stuffs(
        entries
            .into_iter()
            .map(|(name, value)| value.into_stuff(&name))
            .collect(),
    ))
}

/// Run a pipe and print its main output as JSON
pub async fn run(
    ctx: CommandContext,
    pipe_code: String,
    inputs: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let library = ctx.load_library()?;
    library.get_required_pipe(&pipe_code).map_err(report_error)?;

    let memory = match &inputs {
        Some(path) => load_inputs(path)?,
        None => WorkingMemory::new(),
    };

    let params = if dry_run {
        let options = ctx.config.dry_run_options();
        PipeRunParams::dry()
            .with_mock_inputs(options.mock_inputs)
            .with_nb_list_items(options.nb_list_items)
    } else {
        PipeRunParams::live()
    };

    let router = PipeRouter::new(
        Arc::new(library),
        Arc::new(create_default_operators(FuncRegistry::new())),
    )
    .with_max_call_depth(ctx.config.router.max_call_depth);

    let mode = if dry_run { "Dry-running" } else { "Running" };
    let result = with_spinner(
        &format!("{} {}...", mode, pipe_code),
        router.run_pipe(&pipe_code, memory, params),
    )
    .await;

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("{}", format!("Pipe '{}' failed:", pipe_code).red().bold());
            return Err(report_error(e));
        }
    };

    if ctx.verbose {
        eprintln!("{}:", "Working memory".bold());
        for (name, stuff) in output.working_memory.iter() {
            eprintln!("  - {} ({})", name, stuff.concept.dimmed());
        }
        eprintln!();
    }

    let json = serde_json::to_string_pretty(output.main_stuff.as_ref())
        .map_err(|e| miette::miette!("Failed to serialize output: {}", e))?;
    println!("{}", json);

    Ok(())
}
