//! Console rendering for audit results.
//!
//! Everything here reads a [`Summary`]; nothing is printed while checks run.

use colored::Colorize;

use crate::check::{CheckOutcome, Status};
use crate::ledger::Summary;

const RULE_WIDTH: usize = 65;

/// Print the smoke test banner.
pub fn print_banner() {
    println!();
    println!(
        "{}",
        "╔═══════════════════════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║           IDP SMOKE TEST - Deployment Validation              ║".cyan()
    );
    println!(
        "{}",
        "╚═══════════════════════════════════════════════════════════════╝".cyan()
    );
}

/// Print a group header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", "━".repeat(RULE_WIDTH).blue());
    println!("  {}", title.blue().bold());
    println!("{}", "━".repeat(RULE_WIDTH).blue());
}

/// Print a section title inside a group.
pub fn print_section(title: &str) {
    println!();
    println!("{} {}", "▶".yellow(), title.yellow());
}

/// Print one outcome line, with its detail dimmed when present.
pub fn print_outcome(outcome: &CheckOutcome) {
    let marker = match outcome.status() {
        Status::Pass => "✓".green().bold(),
        Status::Fail => "✗".red().bold(),
        Status::Warning => "⚠".yellow().bold(),
    };

    match outcome.detail() {
        Some(detail) => println!(
            "  {marker} {} {}",
            outcome.label(),
            format!("({detail})").bright_black()
        ),
        None => println!("  {marker} {}", outcome.label()),
    }
}

/// Print every outcome under its group and section headers.
pub fn print_report(summary: &Summary) {
    for (group, sections) in summary.by_group() {
        print_header(group);
        for (section, outcomes) in sections {
            if !section.is_empty() {
                print_section(section);
            }
            for outcome in outcomes {
                print_outcome(outcome);
            }
        }
    }
}

/// Print an error that stopped the audit before any check ran.
pub fn print_init_error(message: &str) {
    println!("{} {}", "✗ Failed to initialize:".red().bold(), message.red());
}

/// Print totals and the closing verdict.
pub fn print_summary(summary: &Summary) {
    print_header("TEST SUMMARY");

    println!();
    println!("  {}   {}", "✓ Passed:".green(), summary.passed);
    println!("  {}   {}", "✗ Failed:".red(), summary.failed);
    println!("  {} {}", "⚠ Warnings:".yellow(), summary.warnings);
    println!("  {}", "─────────────────".bright_black());
    println!("  Total:     {}", summary.total);
    println!(
        "  {}",
        format!("{} checks run at {}", summary.checks_run, summary.timestamp.to_rfc3339())
            .bright_black()
    );

    println!();
    if summary.all_passed() {
        println!("{}", "✓ All critical checks passed!".green().bold());
    } else {
        println!("{}", "✗ Some checks failed. Review output above.".red().bold());
    }
    println!();
}
