//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user
//! interaction. The `format_*` functions build the text and are testable;
//! the `display_*` functions print it with `console` styling.

use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Print a non-fatal warning.
pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), message);
}

/// Print a pipeline step heading, preceded by a blank line.
pub fn display_step(message: &str) {
    println!("\n{}", style(message).cyan().bold());
}

/// Print the command a dry run would have executed.
pub fn display_dry_run(command: &str) {
    println!("{}", style(format_dry_run(command)).dim());
}

pub fn format_dry_run(command: &str) -> String {
    format!("[dryrun] {}", command)
}

/// Print a rewritten cross-package dependency.
pub fn display_dependency_update(package: &str, kind: &str, dependency: &str, version: &str) {
    display_success(&format_dependency_update(package, kind, dependency, version));
}

pub fn format_dependency_update(package: &str, kind: &str, dependency: &str, version: &str) -> String {
    format!("{} -> {} -> {}@{}", package, kind, dependency, version)
}

/// Warn about packages that were deliberately not published.
pub fn display_skipped_packages(packages: &[String]) {
    if let Some(message) = format_skipped_packages(packages) {
        display_warning(&message);
    }
}

/// Builds the skipped-package warning; `None` if nothing was skipped.
pub fn format_skipped_packages(packages: &[String]) -> Option<String> {
    if packages.is_empty() {
        return None;
    }
    Some(format!(
        "The following packages are skipped and NOT published:\n- {}",
        packages.join("\n- ")
    ))
}
