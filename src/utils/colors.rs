// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Terminal output helpers
//!
//! Status lines are indented two spaces under their section; details of a
//! status line are indented six.

use colored::{Color, ColoredString, Colorize};
use std::fmt::Display;

/// Marker printed in front of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Success,
    Failure,
    Warning,
    Info,
}

impl Mark {
    fn symbol(self) -> ColoredString {
        match self {
            Self::Success => "✓".green(),
            Self::Failure => "✗".red(),
            Self::Warning => "⚠".yellow(),
            Self::Info => "→".blue(),
        }
    }
}

pub fn print_marked(mark: Mark, msg: impl Display) {
    println!("  {} {}", mark.symbol(), msg);
}

pub fn print_success(msg: impl Display) {
    print_marked(Mark::Success, msg);
}

pub fn print_error(msg: impl Display) {
    print_marked(Mark::Failure, msg);
}

pub fn print_warning(msg: impl Display) {
    print_marked(Mark::Warning, msg);
}

pub fn print_info(msg: impl Display) {
    print_marked(Mark::Info, msg);
}

/// Print a line belonging to the status line above it
pub fn print_detail(msg: impl Display) {
    println!("      {}", msg);
}

/// Print a blank line and a bold section title
pub fn print_section(title: &str, color: Option<Color>) {
    println!();
    match color {
        Some(color) => println!("{}:", title.color(color).bold()),
        None => println!("{}:", title.bold()),
    }
}

/// Print a title underlined to at least 40 columns
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.chars().count().max(40)));
}
