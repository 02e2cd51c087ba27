// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! pipeworks - declarative pipe workflow engine
//!
//! Load pipe libraries, validate their wiring with dry runs, and run pipes.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipeworks::cli::{Cli, CommandContext, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeworks=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let ctx = CommandContext::load(cli.config.as_deref(), cli.library, cli.verbose)?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Validate { pipe, heal } => pipeworks::cli::validate::run(ctx, pipe, heal).await,
        Commands::Run {
            pipe,
            inputs,
            dry_run,
        } => pipeworks::cli::run::run(ctx, pipe, inputs, dry_run).await,
        Commands::Graph { format } => pipeworks::cli::graph::run(ctx, format).await,
        Commands::List { what } => pipeworks::cli::list::run(ctx, what).await,
    }
}
