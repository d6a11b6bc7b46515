//! CLI output formatting for every command.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects. Diagnostics go through `tracing` to
//! stderr, so stdout carries only these summaries.
//!
//! # Output Format
//!
//! ## Group
//!
//! ```text
//! 001 Государственный архив Архангельской области
//!     Фонд 29 (1 inventory, 2 items)
//! 002 Российский государственный исторический архив
//!     Фонд 1343 (1 inventory, 1 item)
//!
//! Grouped 2 archives, 2 funds, 2 inventories, 3 items → store/
//! ```
//!
//! ## Rename
//!
//! ```text
//! Старое название → Новое название
//!
//! Renamed 1 archive → store/
//! ```
//!
//! ## Generate
//!
//! ```text
//! Generated 12 pages → pages/
//! ```
//!
//! ## Generate temples
//!
//! ```text
//! Regions: 2, temples: 4
//!     Present-day index: 3 temples
//!     Pre-1917 index: 2 temples
//!
//! Generated 11 pages → pages/ (list: pages.json)
//! ```

use crate::link::Link;
use crate::model::{ArchiveList, Fund, TreeStats};
use crate::render::{archive_page_name, fund_page_name};
use crate::temples::TemplesSummary;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 item`, `2 items`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    format!("{n} {}", if n == 1 { singular } else { plural })
}

fn stats_line(stats: &TreeStats) -> String {
    format!(
        "{}, {}, {}, {}",
        count(stats.archives, "archive", "archives"),
        count(stats.funds, "fund", "funds"),
        count(stats.inventories, "inventory", "inventories"),
        count(stats.items, "item", "items"),
    )
}

fn fund_line(key: Option<&str>, fund: Option<&Fund>) -> String {
    let name = fund_page_name(key);
    match fund {
        Some(fund) => {
            let items: usize = fund
                .inventories
                .values()
                .filter_map(Link::get)
                .map(|inventory| inventory.items.len())
                .sum();
            format!(
                "{}{name} ({}, {})",
                indent(1),
                count(fund.inventories.len(), "inventory", "inventories"),
                count(items, "item", "items"),
            )
        }
        None => format!("{}{name} (not loaded)", indent(1)),
    }
}

// ============================================================================
// Group
// ============================================================================

/// Archive → fund overview of a tree, followed by totals.
///
/// Only loaded nodes are counted; unloaded funds are marked as such.
pub fn format_tree_output(list: &ArchiveList, output_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, title) in list.titles().into_iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            archive_page_name(title.as_deref())
        ));
        let Some(archive) = list.archives[title].get() else {
            lines.push(format!("{}(not loaded)", indent(1)));
            continue;
        };
        for number in archive.fund_numbers() {
            lines.push(fund_line(number.as_deref(), archive.funds[number].get()));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Grouped {} → {}",
        stats_line(&list.stats()),
        output_dir.display()
    ));
    lines
}

pub fn print_tree_output(list: &ArchiveList, output_dir: &Path) {
    for line in format_tree_output(list, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Rename
// ============================================================================

pub fn format_rename_output(applied: &[(String, String)], output_dir: &Path) -> Vec<String> {
    let mut lines: Vec<String> = applied
        .iter()
        .map(|(old, new)| format!("{old} → {new}"))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Renamed {} → {}",
        count(applied.len(), "archive", "archives"),
        output_dir.display()
    ));
    lines
}

pub fn print_rename_output(applied: &[(String, String)], output_dir: &Path) {
    for line in format_rename_output(applied, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_generate_output(pages: usize, output_dir: &Path) -> Vec<String> {
    vec![format!(
        "Generated {} → {}",
        count(pages, "page", "pages"),
        output_dir.display()
    )]
}

pub fn print_generate_output(pages: usize, output_dir: &Path) {
    for line in format_generate_output(pages, output_dir) {
        println!("{}", line);
    }
}

pub fn format_temples_output(
    summary: &TemplesSummary,
    output_dir: &Path,
    list_file: &Path,
) -> Vec<String> {
    vec![
        format!(
            "Regions: {}, temples: {}",
            summary.regions, summary.temples
        ),
        format!(
            "{}Present-day index: {}",
            indent(1),
            count(summary.modern, "temple", "temples")
        ),
        format!(
            "{}Pre-1917 index: {}",
            indent(1),
            count(summary.old, "temple", "temples")
        ),
        String::new(),
        format!(
            "Generated {} → {} (list: {})",
            count(summary.pages, "page", "pages"),
            output_dir.display(),
            list_file.display()
        ),
    ]
}

pub fn print_temples_output(summary: &TemplesSummary, output_dir: &Path, list_file: &Path) {
    for line in format_temples_output(summary, output_dir, list_file) {
        println!("{}", line);
    }
}
