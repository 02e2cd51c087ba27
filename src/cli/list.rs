// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! List command - show the library's registries

use colored::Colorize;
use miette::Result;

use super::{CommandContext, ListTarget};
use crate::library::Library;
use crate::utils::print_header;

/// Run the list command
pub async fn run(ctx: CommandContext, what: ListTarget) -> Result<()> {
    let library = ctx.load_library_unchecked()?;

    match what {
        ListTarget::Pipes => list_pipes(&library, ctx.verbose),
        ListTarget::Concepts => list_concepts(&library),
        ListTarget::Domains => list_domains(&library),
    }

    Ok(())
}

fn list_pipes(library: &Library, verbose: bool) {
    print_header(&format!("Pipes ({})", library.pipe_count()));
    for pipe in library.pipes() {
        let inputs: Vec<String> = pipe
            .core
            .inputs
            .iter()
            .map(|(name, requirement)| format!("{}: {}", name, requirement))
            .collect();
        println!(
            "  {} {} → {}",
            pipe.code().bold(),
            format!("({}) [{}]", pipe.kind(), inputs.join(", ")).dimmed(),
            pipe.core.output.cyan()
        );
        if verbose {
            println!("      {}", pipe.core.definition);
        }
    }
}

fn list_concepts(library: &Library) {
    let concepts: Vec<_> = library.concepts().declared().collect();
    print_header(&format!("Concepts ({})", concepts.len()));
    for concept in concepts {
        let refines = concept
            .refines
            .as_deref()
            .map(|parent| format!(" refines {}", parent))
            .unwrap_or_default();
        println!(
            "  {}{}  {}",
            concept.concept_string().bold(),
            refines.cyan(),
            concept.definition.dimmed()
        );
    }
}

fn list_domains(library: &Library) {
    print_header(&format!("Domains ({})", library.domains().len()));
    for domain in library.domains().iter() {
        match &domain.definition {
            Some(definition) => println!("  {}  {}", domain.code.bold(), definition.dimmed()),
            None => println!("  {}", domain.code.bold()),
        }
    }
}
