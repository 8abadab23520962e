use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{ReleaseError, Result};
use crate::ui::Prompter;

#[derive(Debug, Clone, PartialEq)]
enum Answer {
    Select(usize),
    Input(String),
    Confirm(bool),
}

/// Mock prompter replaying a queue of prepared answers.
///
/// Answers are consumed in order; asking a question whose kind does not
/// match the next answer (or with the queue empty) is an error, so tests
/// notice unexpected prompts.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    /// Create a prompter with no prepared answers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_answer(self, index: usize) -> Self {
        self.answers.borrow_mut().push_back(Answer::Select(index));
        self
    }

    pub fn input_answer(self, text: impl Into<String>) -> Self {
        self.answers
            .borrow_mut()
            .push_back(Answer::Input(text.into()));
        self
    }

    pub fn confirm_answer(self, yes: bool) -> Self {
        self.answers.borrow_mut().push_back(Answer::Confirm(yes));
        self
    }

    /// Messages asked so far, with the offered items for selections
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    /// Whether every prepared answer was used
    pub fn exhausted(&self) -> bool {
        self.answers.borrow().is_empty()
    }

    fn next(&self, message: String) -> Result<Answer> {
        self.asked.borrow_mut().push(message.clone());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ReleaseError::prompt(format!("unexpected prompt: {}", message)))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, message: &str, items: &[String]) -> Result<usize> {
        match self.next(format!("{} [{}]", message, items.join(", ")))? {
            Answer::Select(index) if index < items.len() => Ok(index),
            other => Err(ReleaseError::prompt(format!(
                "expected selection for '{}', scripted {:?}",
                message, other
            ))),
        }
    }

    fn input(&self, message: &str, initial: &str) -> Result<String> {
        match self.next(format!("{} ({})", message, initial))? {
            Answer::Input(text) => Ok(text),
            other => Err(ReleaseError::prompt(format!(
                "expected input for '{}', scripted {:?}",
                message, other
            ))),
        }
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        match self.next(message.to_string())? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(ReleaseError::prompt(format!(
                "expected confirmation for '{}', scripted {:?}",
                message, other
            ))),
        }
    }
}
