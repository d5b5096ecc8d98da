//! ProcessExecutor: runs invocations as child processes
//!
//! - **Program invocations** are passed to `tokio::process::Command` with an
//!   argument vector, never interpolated into a shell string
//! - **Shell invocations** (pre-publish hooks) run through `sh -c`
//!   (`cmd /C` on Windows)
//! - **Working directory** is validated before spawning
//! - Output is inherited so tool logs stream straight to the console
//!
//! There is no timeout: a hung child hangs the run.
//!
//! # Example
//!
//! ```rust,no_run
//! use package_rescoper::core::{CommandRunner, Invocation};
//! use package_rescoper::process::ProcessExecutor;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), package_rescoper::RescopeError> {
//! let executor = ProcessExecutor::new();
//! executor
//!     .run(&Invocation::program("npm", ["--version"], Path::new(".")))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::core::error::RescopeError;
use crate::core::traits::{CommandLine, CommandRunner, Invocation};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

/// Child process executor used for install, hooks and publish
#[derive(Debug, Default, Clone)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    fn build(command_line: &CommandLine) -> Command {
        match command_line {
            CommandLine::Program { program, args } => {
                let mut command = Command::new(program_name(program));
                command.args(args);
                command
            }
            CommandLine::Shell(line) => shell_command(line),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<(), RescopeError> {
        if !invocation.cwd.is_dir() {
            return Err(RescopeError::MissingDirectory {
                path: invocation.cwd.clone(),
            });
        }

        info!(
            command = %invocation.command,
            cwd = %invocation.cwd.display(),
            "running command"
        );

        let failure = |status: Option<i32>, message: String| RescopeError::ChildProcessFailure {
            command: invocation.command.to_string(),
            cwd: invocation.cwd.clone(),
            status,
            message,
        };

        let status = Self::build(&invocation.command)
            .current_dir(&invocation.cwd)
            .status()
            .await
            .map_err(|e| failure(None, format!("failed to start: {}", e)))?;

        if !status.success() {
            let message = match status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(failure(status.code(), message));
        }

        Ok(())
    }
}

// Windows-specific: npm, yarn, etc. are .cmd files, not .exe
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

#[cfg(target_os = "windows")]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", line]);
    command
}

#[cfg(not(target_os = "windows"))]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.args(["-c", line]);
    command
}
