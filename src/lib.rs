// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! # pipeworks - Declarative Pipe Workflow Engine
//!
//! `pipeworks` loads libraries of typed pipes from TOML and runs them.
//!
//! ## Features
//!
//! - **Concepts** - Domain-qualified semantic types with refinement and structures
//! - **Controllers** - Sequence, condition, parallel and batch composition
//! - **Working memory** - Named, typed values passed between pipes
//! - **Dry runs** - Check a whole pipe graph without calling any backend
//! - **Self-healing** - Declare missing controller inputs automatically
//!
//! ## Quick Start
//!
//! ```bash
//! # Dry-run every pipe of ./pipelines
//! pipeworks validate
//!
//! # Run a pipe on some inputs
//! pipeworks run summarize --inputs inputs.json
//!
//! # Show which pipes call which
//! pipeworks graph --format mermaid
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use pipeworks::library::LibraryLoader;
//! use pipeworks::memory::WorkingMemory;
//! use pipeworks::operators::{create_default_operators, FuncRegistry};
//! use pipeworks::pipe::PipeRunParams;
//! use pipeworks::router::PipeRouter;
//!
//! # async fn demo() -> pipeworks::PipeworksResult<()> {
//! let library = LibraryLoader::new().load_dirs(&[PathBuf::from("pipelines")])?;
//! let router = PipeRouter::new(
//!     Arc::new(library),
//!     Arc::new(create_default_operators(FuncRegistry::new())),
//! );
//! let output = router
//!     .run_pipe("summarize", WorkingMemory::from_text("text", "..."), PipeRunParams::live())
//!     .await?;
//! println!("{:?}", output.main_stuff);
//! # Ok(())
//! # }
//! ```

pub mod blueprint;
pub mod cli;
pub mod concept;
pub mod config;
pub mod controllers;
pub mod domain;
pub mod dry_run;
pub mod errors;
pub mod library;
pub mod memory;
pub mod operators;
pub mod pipe;
pub mod router;
pub mod stuff;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use errors::{PipeworksError, PipeworksResult};
pub use library::{Library, LibraryLoader};
pub use memory::WorkingMemory;
pub use router::PipeRouter;
pub use stuff::{Stuff, StuffContent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
