//! Core traits and types for external process execution
//!
//! The pipeline never spawns processes directly; it hands [`Invocation`]s to
//! a [`CommandRunner`]. This keeps the orchestration testable without a
//! package manager installed.

use crate::core::error::RescopeError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// What to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// A program with arguments, no shell involved
    Program { program: String, args: Vec<String> },
    /// A command line interpreted by the platform shell
    Shell(String),
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program { program, args } if args.is_empty() => write!(f, "{}", program),
            Self::Program { program, args } => write!(f, "{} {}", program, args.join(" ")),
            Self::Shell(line) => write!(f, "{}", line),
        }
    }
}

/// A command plus the directory it runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: CommandLine,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn program<I, S>(program: impl Into<String>, args: I, cwd: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: CommandLine::Program {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn shell(line: impl Into<String>, cwd: &Path) -> Self {
        Self {
            command: CommandLine::Shell(line.into()),
            cwd: cwd.to_path_buf(),
        }
    }
}

/// Executes invocations to completion, one at a time
///
/// A non-zero exit must be reported as [`RescopeError::ChildProcessFailure`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<(), RescopeError>;
}
