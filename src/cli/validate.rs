// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Validate command - check library wiring with a dry run

use colored::{Color, Colorize};
use miette::Result;
use std::sync::Arc;

use super::{report_error, CommandContext};
use crate::dry_run::{DryRunReport, DryRunValidator, PipeDryRunReport};
use crate::errors::RecoverySuggestion;
use crate::library::Library;
use crate::utils::{
    print_detail, print_error, print_info, print_section, print_success, print_warning,
};

/// Run the validate command
pub async fn run(ctx: CommandContext, pipe: Option<String>, heal: bool) -> Result<()> {
    println!("{}", "Validating library...".bold());
    println!();

    let library = ctx.load_library_unchecked()?;
    print_success(format!(
        "Loaded {} pipes and {} concepts from {} domain(s)",
        library.pipe_count(),
        library.concepts().declared().count(),
        library.domains().len()
    ));

    // Structural checks
    let validation = library.validate();

    if !validation.errors.is_empty() {
        print_section("Errors", Some(Color::Red));
        for error in &validation.errors {
            print_error(error);
        }
    }

    if !validation.warnings.is_empty() {
        print_section("Warnings", Some(Color::Yellow));
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if !validation.is_valid() {
        println!();
        return Err(miette::miette!("Library validation failed"));
    }

    let validator = DryRunValidator::new(ctx.config.dry_run_options());

    let report = match pipe {
        Some(code) => {
            library.get_required_pipe(&code).map_err(report_error)?;
            DryRunReport {
                pipes: vec![validator.validate_pipe(Arc::new(library), &code).await],
                healed: Vec::new(),
            }
        }
        None if heal => {
            let (healed, report) = validator.heal(&library).await.map_err(report_error)?;
            print_healing(&healed, &report);
            report
        }
        None => validator.validate_library(Arc::new(library)).await,
    };

    print_section("Dry run", None);
    for pipe_report in &report.pipes {
        print_pipe_report(pipe_report, ctx.verbose);
    }

    println!();

    if report.is_ok() {
        if validation.has_warnings() {
            println!("{}", "Library is valid but has warnings.".yellow().bold());
        } else {
            println!("{}", "Library is valid!".green().bold());
        }
        Ok(())
    } else {
        println!(
            "{}",
            format!(
                "{} of {} pipe(s) failed the dry run",
                report.failure_count(),
                report.pipes.len()
            )
            .red()
        );
        Err(miette::miette!("Validation failed"))
    }
}

fn print_pipe_report(report: &PipeDryRunReport, verbose: bool) {
    if report.is_ok() {
        print_success(&report.pipe_code);
        return;
    }

    print_error(report.pipe_code.bold());
    for error in &report.static_errors {
        print_detail(error);
        if verbose {
            let suggestion = RecoverySuggestion::fix_static_error(error);
            print_detail(suggestion.action.cyan());
        }
    }
    if let Some(error) = &report.run_error {
        print_detail(error.to_string().dimmed());
        if verbose {
            if let Some(suggestion) = error.suggestion() {
                print_detail(suggestion.action.cyan());
            }
        }
    }
}

fn print_healing(healed: &Library, report: &DryRunReport) {
    if report.healed.is_empty() {
        return;
    }

    print_section("Healing", None);
    for patch in &report.healed {
        let origin = healed
            .get_pipe(&patch.pipe_code)
            .and_then(|p| p.core.origin.clone())
            .unwrap_or_else(|| "<unknown>".to_string());
        print_info(format!(
            "{}: declared input {} = \"{}\" {}",
            patch.pipe_code,
            patch.input_name.cyan(),
            patch.concept,
            format!("({})", origin).dimmed()
        ));
    }
    print_detail("Copy these declarations into the library files to keep them".dimmed());
}
