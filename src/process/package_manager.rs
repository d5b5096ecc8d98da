//! Package manager command construction

use crate::core::error::RescopeError;
use crate::core::traits::Invocation;
use std::path::Path;

/// Package managers that can install and publish npm packages
pub const ALLOWED_PACKAGE_MANAGERS: &[&str] = &["npm", "pnpm", "yarn", "bun"];

const DRY_RUN_FLAG: &str = "--dry-run";

/// The package manager binary used for `install` and `publish`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManager {
    program: String,
}

impl Default for PackageManager {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
        }
    }
}

impl PackageManager {
    /// Only binaries in [`ALLOWED_PACKAGE_MANAGERS`] are accepted
    pub fn new(program: &str) -> Result<Self, RescopeError> {
        let program = program.trim();
        if !ALLOWED_PACKAGE_MANAGERS.contains(&program) {
            return Err(RescopeError::config(
                "package_manager",
                format!(
                    "'{}' is not one of: {}",
                    program,
                    ALLOWED_PACKAGE_MANAGERS.join(", ")
                ),
            ));
        }

        Ok(Self {
            program: program.to_string(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `<tool> install` in `cwd`
    pub fn install(&self, cwd: &Path) -> Invocation {
        Invocation::program(&self.program, ["install"], cwd)
    }

    /// `<tool> publish [flags..]` in `cwd`, with `--dry-run` appended when asked
    pub fn publish(&self, cwd: &Path, flags: &[String], dry_run: bool) -> Invocation {
        let mut args = vec!["publish".to_string()];
        args.extend(flags.iter().cloned());
        if dry_run && !flags.iter().any(|f| f == DRY_RUN_FLAG) {
            args.push(DRY_RUN_FLAG.to_string());
        }

        Invocation::program(&self.program, args, cwd)
    }
}
