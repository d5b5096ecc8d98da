//! Rescope transforms
//!
//! Pure functions over [`Manifest`]: nothing here touches the filesystem.
//!
//! Two matching rules coexist and must not be unified:
//! - package names are rescoped by replacing the first occurrence of `from`
//!   anywhere in the name;
//! - dependencies are only rewritten when their name starts with `from`.

use crate::core::error::RescopeError;
use crate::manifest::package_json::Manifest;
use serde_json::Value;

/// Wildcard used in aliases when the run has no fixed version
pub const WILDCARD_VERSION: &str = "*";

/// The `from` -> `to` substitution applied to package names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePair {
    from: String,
    to: String,
}

impl ScopePair {
    /// Both sides are trimmed and must be non-empty
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self, RescopeError> {
        let from = from.into().trim().to_string();
        let to = to.into().trim().to_string();

        if from.is_empty() {
            return Err(RescopeError::config("from", "Input required and not supplied"));
        }
        if to.is_empty() {
            return Err(RescopeError::config("to", "Input required and not supplied"));
        }

        Ok(Self { from, to })
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// Rescope a package name (first occurrence, substring match)
    pub fn rescope_name(&self, name: &str) -> String {
        rescope_name(name, &self.from, &self.to)
    }

    /// Whether a dependency name is rewritten (prefix match)
    pub fn matches_dependency(&self, dependency: &str) -> bool {
        dependency.starts_with(&self.from)
    }

    /// Alias specifier pointing a dependency at its rescoped package
    pub fn alias_specifier(&self, dependency: &str, version: Option<&str>) -> String {
        format!(
            "npm:{}@{}",
            self.rescope_name(dependency),
            version.unwrap_or(WILDCARD_VERSION)
        )
    }
}

/// Replace the first occurrence of `from` in `name` with `to`
pub fn rescope_name(name: &str, from: &str, to: &str) -> String {
    name.replacen(from, to, 1)
}

/// A single dependency specifier change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRewrite {
    /// Manifest field the dependency lives in (e.g. `devDependencies`)
    pub field: String,
    pub dependency: String,
    pub previous: String,
    pub alias: String,
}

/// Transformed manifest plus the dependency changes that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RescopeOutcome {
    pub manifest: Manifest,
    pub rewrites: Vec<DependencyRewrite>,
}

/// Point every dependency whose name starts with `from` at its rescoped alias.
///
/// Keys are never renamed, so applying this twice yields the same manifest.
/// Only specifiers that actually changed are reported in `rewrites`.
pub fn rescope_dependencies(
    manifest: &Manifest,
    scope: &ScopePair,
    dependency_fields: &[String],
    version: Option<&str>,
) -> RescopeOutcome {
    let mut rescoped = manifest.clone();
    let mut rewrites = Vec::new();

    for field in dependency_fields {
        let Some(dependencies) = rescoped.dependencies_mut(field) else {
            continue;
        };

        for (dependency, specifier) in dependencies.iter_mut() {
            if !scope.matches_dependency(dependency) {
                continue;
            }

            let alias = scope.alias_specifier(dependency, version);
            let previous = match &*specifier {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };

            if previous != alias {
                rewrites.push(DependencyRewrite {
                    field: field.clone(),
                    dependency: dependency.clone(),
                    previous,
                    alias: alias.clone(),
                });
            }
            *specifier = Value::String(alias);
        }
    }

    RescopeOutcome {
        manifest: rescoped,
        rewrites,
    }
}

/// Rename the package, assign `version`, and rewrite its internal dependencies
pub fn rescope_package(
    manifest: &Manifest,
    scope: &ScopePair,
    version: &str,
    dependency_fields: &[String],
    alias_version: Option<&str>,
) -> RescopeOutcome {
    let mut renamed = manifest.clone();
    renamed.set_string("name", scope.rescope_name(manifest.name()));
    renamed.set_string("version", version);

    rescope_dependencies(&renamed, scope, dependency_fields, alias_version)
}
