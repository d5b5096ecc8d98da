//! Configuration structures for package-rescoper
//!
//! [`RescopeConfig`] is one partial configuration layer (file, environment or
//! CLI). Layers are merged field by field and then resolved into the
//! immutable [`RunSettings`] the pipeline runs with.

use crate::core::error::RescopeError;
use crate::discovery::DEFAULT_PATTERN;
use crate::manifest::{ScopePair, VersionStrategy};
use crate::process::PackageManager;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dependency fields scanned when `dependency_types` is not configured
pub const DEFAULT_DEPENDENCY_TYPES: &[&str] =
    &["dependencies", "devDependencies", "peerDependencies"];

/// Commented template written by `package-rescoper init`
pub const CONFIG_TEMPLATE: &str = r##"# package-rescoper configuration
#
# Substring replaced in package names. Dependencies are rewritten when
# their name starts with it.
from: "@my-org"
to: "@my-org-canary"

# Fixed version for every rescoped package. When omitted, each package is
# stamped with a UTC timestamp version and aliases use "*".
# version: "1.0.0-canary.1"

# Glob patterns, relative to working_directory. "!" excludes, "#" comments.
directories:
  - "packages/*"
# directories_to_rescope: []
# directories_to_publish: []

dependency_types:
  - dependencies
  - devDependencies
  - peerDependencies

# Shell commands run in each package directory before publishing.
pre_publish_commands: []

# Extra flags passed verbatim to the publish command.
publish_flags:
  - "--access"
  - "public"

fail_on_non_package_dir: true
package_manager: npm
reinstall: true
dry_run: false
"##;

/// One configuration layer. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RescopeConfig {
    /// Substring to replace in package names (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Replacement for `from` (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Fixed version for all rescoped packages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Patterns used for both passes unless overridden
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directories: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub directories_to_rescope: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub directories_to_publish: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_publish_commands: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_types: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_flags: Option<Vec<String>>,

    /// Abort on directories without a package.json (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_non_package_dir: Option<bool>,

    /// Package manager binary (default: npm)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,

    /// Re-run install between the two passes (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinstall: Option<bool>,

    /// Publish with `--dry-run` (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,

    /// Root for install and relative patterns (default: .)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
}

impl RescopeConfig {
    /// Merge `overlay` on top of `self`; fields set in `overlay` win
    pub fn merge(self, overlay: RescopeConfig) -> Self {
        Self {
            from: overlay.from.or(self.from),
            to: overlay.to.or(self.to),
            version: overlay.version.or(self.version),
            directories: overlay.directories.or(self.directories),
            directories_to_rescope: overlay
                .directories_to_rescope
                .or(self.directories_to_rescope),
            directories_to_publish: overlay
                .directories_to_publish
                .or(self.directories_to_publish),
            pre_publish_commands: overlay.pre_publish_commands.or(self.pre_publish_commands),
            dependency_types: overlay.dependency_types.or(self.dependency_types),
            publish_flags: overlay.publish_flags.or(self.publish_flags),
            fail_on_non_package_dir: overlay
                .fail_on_non_package_dir
                .or(self.fail_on_non_package_dir),
            package_manager: overlay.package_manager.or(self.package_manager),
            reinstall: overlay.reinstall.or(self.reinstall),
            dry_run: overlay.dry_run.or(self.dry_run),
            working_directory: overlay.working_directory.or(self.working_directory),
        }
    }

    /// Validate and apply defaults
    pub fn resolve(&self) -> Result<RunSettings, RescopeError> {
        let scope = ScopePair::new(
            self.from.clone().unwrap_or_default(),
            self.to.clone().unwrap_or_default(),
        )?;

        let rescope_patterns =
            self.patterns_for("directories_to_rescope", &self.directories_to_rescope)?;
        let publish_patterns =
            self.patterns_for("directories_to_publish", &self.directories_to_publish)?;

        let dependency_types = match &self.dependency_types {
            Some(types) => {
                let mut unique: Vec<String> = Vec::new();
                for field in types.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                    if !unique.iter().any(|u| u == field) {
                        unique.push(field.to_string());
                    }
                }
                unique
            }
            None => DEFAULT_DEPENDENCY_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        };

        let package_manager = match &self.package_manager {
            Some(program) => PackageManager::new(program)?,
            None => PackageManager::default(),
        };

        Ok(RunSettings {
            scope,
            version: VersionStrategy::from_config(self.version.as_deref()),
            rescope_patterns,
            publish_patterns,
            pre_publish_commands: non_blank(self.pre_publish_commands.clone()),
            dependency_types,
            publish_flags: non_blank(self.publish_flags.clone()),
            fail_on_non_package_dir: self.fail_on_non_package_dir.unwrap_or(true),
            package_manager,
            reinstall: self.reinstall.unwrap_or(true),
            dry_run: self.dry_run.unwrap_or(false),
            working_directory: self
                .working_directory
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}


impl RescopeConfig {
    /// `specific` patterns, else `directories`, else the default pattern.
    /// An explicitly empty list is reported on the field that holds it.
    fn patterns_for(
        &self,
        field: &str,
        specific: &Option<Vec<String>>,
    ) -> Result<Vec<String>, RescopeError> {
        let (field, patterns) = match (specific, &self.directories) {
            (Some(patterns), _) => (field, patterns),
            (None, Some(patterns)) => ("directories", patterns),
            (None, None) => return Ok(vec![DEFAULT_PATTERN.to_string()]),
        };

        if patterns.is_empty() {
            return Err(RescopeError::config(
                field,
                "at least one directory pattern is required",
            ));
        }
        Ok(patterns.clone())
    }
}

fn non_blank(lines: Option<Vec<String>>) -> Vec<String> {
    lines
        .unwrap_or_default()
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Validated settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub scope: ScopePair,
    pub version: VersionStrategy,
    pub rescope_patterns: Vec<String>,
    pub publish_patterns: Vec<String>,
    pub pre_publish_commands: Vec<String>,
    pub dependency_types: Vec<String>,
    pub publish_flags: Vec<String>,
    pub fail_on_non_package_dir: bool,
    pub package_manager: PackageManager,
    pub reinstall: bool,
    pub dry_run: bool,
    pub working_directory: PathBuf,
}
