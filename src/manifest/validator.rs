//! Manifest Validator - sanity checks on rescoped manifests
//!
//! Rescoping is a plain string substitution, so it can produce names npm
//! will refuse. These checks surface such problems before `npm publish`
//! does. Findings are warnings; they never stop the run.
//!
//! # Example
//!
//! ```
//! use package_rescoper::manifest::ManifestValidator;
//!
//! let validator = ManifestValidator::new();
//! assert!(validator.validate_package_name("@scope/my-package").is_empty());
//! assert!(!validator.validate_package_name("@scope/MyPackage").is_empty());
//! ```

use crate::manifest::package_json::Manifest;

/// npm limit on the full (scoped) package name
const MAX_NAME_LENGTH: usize = 214;

/// Validator for rescoped package manifests
pub struct ManifestValidator;

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a manifest's name and version, returning warning messages
    pub fn validate(&self, manifest: &Manifest) -> Vec<String> {
        let mut warnings = self.validate_package_name(manifest.name());

        match manifest.version() {
            Some(version) => warnings.extend(self.validate_version(version)),
            None => warnings.push("Missing required field: version".to_string()),
        }

        warnings
    }

    /// Validate package name according to npm rules
    /// https://docs.npmjs.com/cli/v9/configuring-npm/package-json#name
    pub fn validate_package_name(&self, name: &str) -> Vec<String> {
        let mut warnings = Vec::new();

        if name.is_empty() {
            warnings.push("Package name is empty".to_string());
            return warnings;
        }

        if name.len() > MAX_NAME_LENGTH {
            warnings.push(format!(
                "Package name must be at most {} characters",
                MAX_NAME_LENGTH
            ));
        }

        let unscoped = match name.strip_prefix('@') {
            Some(rest) => match rest.split_once('/') {
                Some((scope, package)) => {
                    if scope.is_empty() {
                        warnings.push("Package scope is empty".to_string());
                    }
                    package
                }
                None => {
                    warnings.push("Scoped package name must contain '/'".to_string());
                    rest
                }
            },
            None => name,
        };

        if unscoped.starts_with('.') || unscoped.starts_with('_') {
            warnings.push("Package name cannot start with a dot or an underscore".to_string());
        }

        if name.chars().any(char::is_uppercase) {
            warnings.push("Package name cannot contain uppercase letters".to_string());
        }

        let url_safe = |c: char| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_')
        };
        if !unscoped.chars().all(url_safe) {
            warnings.push(
                "Package name may only contain lowercase letters, digits, '-', '.' and '_'"
                    .to_string(),
            );
        }

        warnings
    }

    /// Validate SemVer version
    pub fn validate_version(&self, version: &str) -> Option<String> {
        semver::Version::parse(version)
            .err()
            .map(|e| format!("Version '{}' is not valid SemVer: {}", version, e))
    }
}
