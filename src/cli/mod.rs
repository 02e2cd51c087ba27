// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for pipeworks.

pub mod graph;
pub mod list;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::errors::PipeworksError;
use crate::library::{Library, LibraryLoader};

/// Declarative pipe workflow engine
///
/// Load pipe libraries, check their wiring and run their pipes.
#[derive(Parser, Debug)]
#[clap(
    name = "pipeworks",
    version,
    about = "Declarative pipe workflow engine with dry-run validation",
    long_about = None,
    after_help = "Examples:\n\
        pipeworks validate                   Dry-run every pipe of the library\n\
        pipeworks validate --heal            Declare missing controller inputs\n\
        pipeworks run summarize -i in.json   Run a pipe on the given inputs\n\
        pipeworks graph --format mermaid     Show which pipes call which\n\n\
        See 'pipeworks <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (defaults to pipeworks.toml when present)
    #[clap(long, global = true, env = "PIPEWORKS_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Library directories, replacing the configured ones
    #[clap(short = 'L', long = "library", global = true, value_name = "DIR")]
    pub library: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Statically check and dry-run the library
    Validate {
        /// Only validate this pipe
        pipe: Option<String>,

        /// Declare missing controller inputs until the library validates
        #[clap(long)]
        heal: bool,
    },

    /// Run a pipe
    Run {
        /// Pipe code
        pipe: String,

        /// JSON file mapping input names to values
        #[clap(short, long, value_name = "FILE")]
        inputs: Option<PathBuf>,

        /// Run with synthesized outputs instead of calling backends
        #[clap(long)]
        dry_run: bool,
    },

    /// Show the pipe reference graph
    Graph {
        /// Output format (text, dot, mermaid)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// List what the library declares
    List {
        /// What to list (pipes, concepts, domains)
        #[clap(default_value = "pipes")]
        what: ListTarget,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Registry listed by the list command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    Pipes,
    Concepts,
    Domains,
}

impl std::str::FromStr for ListTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pipes" | "pipe" => Ok(Self::Pipes),
            "concepts" | "concept" => Ok(Self::Concepts),
            "domains" | "domain" => Ok(Self::Domains),
            _ => Err(format!("Unknown list target: {}", s)),
        }
    }
}

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: EngineConfig,
    pub library_paths: Vec<PathBuf>,
    pub verbose: bool,
}

impl CommandContext {
    /// Read the configuration and apply command-line overrides
    pub fn load(
        config: Option<&Path>,
        library: Vec<PathBuf>,
        verbose: bool,
    ) -> miette::Result<Self> {
        let config = EngineConfig::load(config)?;
        let library_paths = if library.is_empty() {
            config.library.paths.clone()
        } else {
            library
        };
        Ok(Self {
            config,
            library_paths,
            verbose,
        })
    }

    fn loader(&self) -> LibraryLoader {
        LibraryLoader::new().with_mode(self.config.library.load_mode())
    }

    /// Load and validate the library
    pub fn load_library(&self) -> miette::Result<Library> {
        self.loader()
            .load_dirs(&self.library_paths)
            .map_err(report_error)
    }

    /// Load the library, leaving structural checks to the caller
    pub fn load_library_unchecked(&self) -> miette::Result<Library> {
        self.loader()
            .without_validation()
            .load_dirs(&self.library_paths)
            .map_err(report_error)
    }
}

/// Print the recovery suggestion of an error, then hand it to miette
pub fn report_error(error: PipeworksError) -> miette::Report {
    if let Some(suggestion) = error.suggestion() {
        eprintln!();
        eprintln!("{}", suggestion.to_string().cyan());
    }
    error.into()
}
