//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - The [Prompter] capability and its terminal implementation
//! - `mock` - Scripted answers for tests

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::error::{ReleaseError, Result};

pub mod formatter;
pub mod mock;

pub use formatter::{
    display_dependency_update, display_dry_run, display_error, display_skipped_packages,
    display_status, display_step, display_success, display_warning,
};
pub use mock::ScriptedPrompter;

/// Interactive questions the release flow may ask.
pub trait Prompter {
    /// Single choice from `items`; returns the selected index.
    fn select(&self, message: &str, items: &[String]) -> Result<usize>;

    /// Free-form text, pre-filled with `initial`.
    fn input(&self, message: &str, initial: &str) -> Result<String>;

    /// Yes/no question. Defaults to "no".
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Prompts on the controlling terminal via `dialoguer`.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        TerminalPrompter {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn select(&self, message: &str, items: &[String]) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .default(0)
            .interact()
            .map_err(|e| ReleaseError::prompt(e.to_string()))
    }

    fn input(&self, message: &str, initial: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .with_initial_text(initial)
            .interact_text()
            .map_err(|e| ReleaseError::prompt(e.to_string()))
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|e| ReleaseError::prompt(e.to_string()))
    }
}

/// Answers every confirmation with "yes"; used for `--yes`.
///
/// Selection and text input still go to the wrapped prompter.
pub struct AssumeYes<P> {
    inner: P,
}

impl<P: Prompter> AssumeYes<P> {
    pub fn new(inner: P) -> Self {
        AssumeYes { inner }
    }
}

impl<P: Prompter> Prompter for AssumeYes<P> {
    fn select(&self, message: &str, items: &[String]) -> Result<usize> {
        self.inner.select(message, items)
    }

    fn input(&self, message: &str, initial: &str) -> Result<String> {
        self.inner.input(message, initial)
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        display_status(&format!("{} yes", message));
        Ok(true)
    }
}
