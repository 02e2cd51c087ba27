// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Graph command - visualize which pipes call which

use miette::Result;

use super::{CommandContext, GraphFormat};

/// Run the graph command
pub async fn run(ctx: CommandContext, format: GraphFormat) -> Result<()> {
    let library = ctx.load_library_unchecked()?;
    let graph = library.graph();

    let output = match format {
        GraphFormat::Text => graph.to_text(),
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
