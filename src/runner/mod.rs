//! External process abstraction layer
//!
//! Every external tool the release pipeline drives (git, the package
//! manager, the registry client) is invoked through the [CommandRunner]
//! trait. The concrete implementations are:
//!
//! - [SystemRunner]: spawns real processes with `std::process::Command`
//! - [mock::RecordingRunner]: records invocations and replays scripted
//!   responses for tests
//!
//! Dry-run handling does not live here; the orchestrator decides whether a
//! command is run or only logged.

pub mod mock;

pub use mock::RecordingRunner;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{ReleaseError, Result};

/// Whether a command's output goes to the terminal or is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Inherit,
    Capture,
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub output: OutputMode,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            output: OutputMode::Inherit,
        }
    }

    /// Runs the command in `dir` instead of the process working directory.
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Captures stdout/stderr instead of inheriting the terminal.
    pub fn captured(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    /// Builds a spec from an argv array such as `["pnpm", "run", "build"]`.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ReleaseError::config("empty command line"))?;
        Ok(CommandSpec::new(program.clone(), args.iter().cloned()))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Output of a successful command.
///
/// `stdout`/`stderr` are empty when the command inherited the terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Capability to run external commands.
///
/// A command exiting non-zero is reported as [ReleaseError::Command], with
/// any captured stderr attached.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %command, cwd = ?command.cwd, "spawning");

        let mut cmd = Command::new(program_name(&command.program));
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let (status, stdout, stderr) = match command.output {
            OutputMode::Inherit => {
                let status = cmd
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(|e| spawn_error(command, e))?;
                (status, String::new(), String::new())
            }
            OutputMode::Capture => {
                let output = cmd.output().map_err(|e| spawn_error(command, e))?;
                (
                    output.status,
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                )
            }
        };

        if !status.success() {
            return Err(ReleaseError::Command {
                program: command.program.clone(),
                args: command.args.clone(),
                code: status.code(),
                stderr: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

// npm, yarn and pnpm ship as .cmd shims on Windows
#[cfg(target_os = "windows")]
fn program_name(program: &str) -> String {
    if matches!(program, "npm" | "yarn" | "pnpm") {
        format!("{}.cmd", program)
    } else {
        program.to_string()
    }
}

#[cfg(not(target_os = "windows"))]
fn program_name(program: &str) -> String {
    program.to_string()
}

fn spawn_error(command: &CommandSpec, err: std::io::Error) -> ReleaseError {
    ReleaseError::Command {
        program: command.program.clone(),
        args: command.args.clone(),
        code: None,
        stderr: format!("failed to start: {}", err),
    }
}
