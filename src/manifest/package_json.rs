//! package.json loading and writing
//!
//! The manifest is kept as an insertion-ordered JSON object so a
//! load-mutate-write cycle leaves untouched keys where they were. Output is
//! always 2-space indented with no trailing newline.

use crate::core::error::RescopeError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Manifest file name looked up in every package directory
pub const MANIFEST_FILE: &str = "package.json";

/// A parsed package.json
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    /// Parse manifest text. `origin` is only used for error reporting.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, RescopeError> {
        let invalid = |message: String| RescopeError::InvalidManifest {
            path: origin.to_path_buf(),
            message,
        };

        let value: Value =
            serde_json::from_str(content).map_err(|e| invalid(format!("Invalid JSON: {}", e)))?;

        let Value::Object(fields) = value else {
            return Err(invalid("top-level value is not an object".to_string()));
        };

        match fields.get("name") {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(_) => Err(invalid("`name` is not a string".to_string())),
            None => Err(invalid("Missing required field: name".to_string())),
        }
    }

    /// Package name
    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Package version, if present and a string
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Dependency map stored under `field`, if it is an object
    pub fn dependencies(&self, field: &str) -> Option<&Map<String, Value>> {
        self.fields.get(field).and_then(Value::as_object)
    }

    pub(crate) fn dependencies_mut(&mut self, field: &str) -> Option<&mut Map<String, Value>> {
        self.fields.get_mut(field).and_then(Value::as_object_mut)
    }

    /// Set a string field. Existing keys keep their position, new keys are appended.
    pub(crate) fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.fields
            .insert(key.to_string(), Value::String(value.into()));
    }

    /// Serialize with 2-space indentation and no trailing newline
    pub fn to_pretty_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.fields)
    }
}

/// Verify that `directory` exists and contains a package.json.
///
/// Returns the manifest path, or `None` when the manifest is missing and
/// `fail_on_non_package_dir` is false (the directory should be skipped).
pub async fn check_package_dir(
    directory: &Path,
    fail_on_non_package_dir: bool,
) -> Result<Option<PathBuf>, RescopeError> {
    let is_dir = fs::metadata(directory)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(RescopeError::MissingDirectory {
            path: directory.to_path_buf(),
        });
    }

    let manifest_path = directory.join(MANIFEST_FILE);
    let exists = fs::try_exists(&manifest_path)
        .await
        .map_err(|e| RescopeError::io(&manifest_path, e))?;

    if !exists {
        if fail_on_non_package_dir {
            return Err(RescopeError::MissingManifest {
                path: directory.to_path_buf(),
            });
        }
        info!(
            directory = %directory.display(),
            "The directory does not contain a package.json. Skipping."
        );
        return Ok(None);
    }

    Ok(Some(manifest_path))
}

/// Load the manifest of `directory`, failing when it is missing
pub async fn load(directory: &Path) -> Result<Manifest, RescopeError> {
    match load_if_present(directory, true).await? {
        Some(manifest) => Ok(manifest),
        None => Err(RescopeError::MissingManifest {
            path: directory.to_path_buf(),
        }),
    }
}

/// Load the manifest of `directory`, or `None` when it should be skipped
pub async fn load_if_present(
    directory: &Path,
    fail_on_non_package_dir: bool,
) -> Result<Option<Manifest>, RescopeError> {
    let Some(manifest_path) = check_package_dir(directory, fail_on_non_package_dir).await? else {
        return Ok(None);
    };

    let content = fs::read_to_string(&manifest_path)
        .await
        .map_err(|e| RescopeError::io(&manifest_path, e))?;

    Manifest::parse(&content, &manifest_path).map(Some)
}

/// Write `manifest` into `directory` (atomic: temp file, then rename)
pub async fn write(directory: &Path, manifest: &Manifest) -> Result<(), RescopeError> {
    let manifest_path = directory.join(MANIFEST_FILE);
    let json = manifest
        .to_pretty_string()
        .map_err(|e| RescopeError::InvalidManifest {
            path: manifest_path.clone(),
            message: e.to_string(),
        })?;

    let temp_file = manifest_path.with_extension("json.tmp");
    fs::write(&temp_file, json)
        .await
        .map_err(|e| RescopeError::io(&temp_file, e))?;
    if let Err(e) = fs::rename(&temp_file, &manifest_path).await {
        // never leave the temp file inside the package directory
        let _ = fs::remove_file(&temp_file).await;
        return Err(RescopeError::io(&manifest_path, e));
    }

    debug!(path = %manifest_path.display(), "manifest written");
    Ok(())
}
