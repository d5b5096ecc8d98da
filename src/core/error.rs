//! Error handling for package rescoping
//!
//! Every failure in the pipeline is fatal: errors propagate to the top level,
//! where the run is reported as failed. Each variant carries a stable code and
//! recovery hints for the operator.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rescoping and publishing operations
#[derive(Error, Debug)]
pub enum RescopeError {
    // Configuration errors
    #[error("Invalid configuration input '{field}': {message}")]
    ConfigurationError { field: String, message: String },

    #[error("Invalid directory pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    // Manifest errors
    #[error("The directory {} does not exist.", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("The directory {} does not contain a package.json.", path.display())]
    MissingManifest { path: PathBuf },

    #[error("Invalid manifest {}: {message}", path.display())]
    InvalidManifest { path: PathBuf, message: String },

    // Command execution errors
    #[error("Command `{command}` failed in {}: {message}", cwd.display())]
    ChildProcessFailure {
        command: String,
        cwd: PathBuf,
        status: Option<i32>,
        message: String,
    },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RescopeError {
    /// Shorthand for a configuration error on a named input
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            Self::InvalidPattern { .. } => "INVALID_PATTERN",
            Self::MissingDirectory { .. } => "MISSING_DIRECTORY",
            Self::MissingManifest { .. } => "MISSING_MANIFEST",
            Self::InvalidManifest { .. } => "INVALID_MANIFEST",
            Self::ChildProcessFailure { .. } => "CHILD_PROCESS_FAILURE",
            Self::Io { .. } => "IO_ERROR",
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::ConfigurationError { .. } => vec![
                "Check the `from` and `to` inputs are set and non-empty",
                "Check .rescope-config.yaml and INPUT_* environment variables",
            ],
            Self::InvalidPattern { .. } => {
                vec!["Fix the glob syntax in the directory patterns"]
            }
            Self::MissingDirectory { .. } => {
                vec!["Check the directory patterns against the working directory"]
            }
            Self::MissingManifest { .. } => vec![
                "Narrow the directory patterns to package directories",
                "Set fail_on_non_package_dir to false to skip such directories",
            ],
            Self::InvalidManifest { .. } => {
                vec!["Make sure package.json is a JSON object with a string `name`"]
            }
            Self::ChildProcessFailure { .. } => vec![
                "Check the command output above",
                "Packages published before the failure are not rolled back",
            ],
            Self::Io { .. } => vec!["Check file permissions and available disk space"],
        }
    }
}
