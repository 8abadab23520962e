use std::sync::Mutex;

use crate::error::{ReleaseError, Result};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

#[derive(Debug, Clone)]
enum Scripted {
    Succeed(String),
    Fail { code: i32, stderr: String },
}

/// Mock runner for testing without spawning processes.
///
/// Every invocation is recorded. Responses are matched by command-line
/// prefix (`"git diff"`, `"yarn publish"`); the first registered match wins
/// and unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    script: Vec<(String, Scripted)>,
}

impl RecordingRunner {
    /// Create a new runner where every command succeeds silently
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands starting with `prefix` print `stdout`
    pub fn respond(mut self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.script
            .push((prefix.into(), Scripted::Succeed(stdout.into())));
        self
    }

    /// Make commands starting with `prefix` exit with code 1 and `stderr`
    pub fn fail(mut self, prefix: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.script.push((
            prefix.into(),
            Scripted::Fail {
                code: 1,
                stderr: stderr.into(),
            },
        ));
        self
    }

    /// Recorded invocations rendered as command lines
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// Recorded invocations
    pub fn calls(&self) -> Vec<CommandSpec> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether any recorded command line starts with `prefix`
    pub fn ran(&self, prefix: &str) -> bool {
        self.command_lines().iter().any(|line| line.starts_with(prefix))
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(command.clone()),
            Err(poisoned) => poisoned.into_inner().push(command.clone()),
        }

        let line = command.to_string();
        let scripted = self
            .script
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, scripted)| scripted);

        match scripted {
            Some(Scripted::Succeed(stdout)) => Ok(CommandOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            Some(Scripted::Fail { code, stderr }) => Err(ReleaseError::Command {
                program: command.program.clone(),
                args: command.args.clone(),
                code: Some(*code),
                stderr: stderr.clone(),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}
