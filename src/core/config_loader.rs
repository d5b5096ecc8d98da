//! Configuration file loader for package-rescoper
//!
//! This module provides configuration loading and layer merging, including
//! CI-style `INPUT_*` environment inputs.

use super::config::RescopeConfig;
use crate::core::error::RescopeError;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".rescope-config.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Accepted boolean input spellings (YAML 1.2 core schema)
const TRUE_VALUES: &[&str] = &["true", "True", "TRUE"];
const FALSE_VALUES: &[&str] = &["false", "False", "FALSE"];

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to look for the config file in
    pub project_path: PathBuf,

    /// Explicit config file (must exist when given)
    pub config_file: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<RescopeConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment inputs (`INPUT_*`)
    /// 3. Config file (`--config` or ./.rescope-config.yaml)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<RescopeConfig, RescopeError> {
        let mut config = RescopeConfig::default();

        let file_config = match &options.config_file {
            Some(path) => Some(Self::load_config_file(path).await?.ok_or_else(|| {
                RescopeError::config("config", format!("{} not found", path.display()))
            })?),
            None => Self::load_config_file(&options.project_path.join(CONFIG_FILENAME)).await?,
        };
        if let Some(file_config) = file_config {
            config = config.merge(file_config);
        }

        config = config.merge(Self::load_env_config(&options.env)?);

        if let Some(cli_config) = options.cli_args {
            config = config.merge(cli_config);
        }

        Self::expand_env_vars(config, &options.env)
    }

    /// Load configuration from a YAML file, `None` if it does not exist
    async fn load_config_file(file_path: &Path) -> Result<Option<RescopeConfig>, RescopeError> {
        if !fs::try_exists(file_path)
            .await
            .map_err(|e| RescopeError::io(file_path, e))?
        {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path)
            .await
            .map_err(|e| RescopeError::io(file_path, e))?;

        let config: RescopeConfig = serde_yaml::from_str(&content).map_err(|e| {
            RescopeError::config(
                file_path.display().to_string(),
                format!("Failed to parse YAML config: {}", e),
            )
        })?;

        debug!(path = %file_path.display(), "loaded config file");
        Ok(Some(config))
    }

    /// Load configuration from `INPUT_*` environment variables
    pub fn load_env_config(env: &HashMap<String, String>) -> Result<RescopeConfig, RescopeError> {
        Ok(RescopeConfig {
            from: input(env, "from"),
            to: input(env, "to"),
            version: input(env, "version"),
            directories: multiline_input(env, "directories"),
            directories_to_rescope: multiline_input(env, "directories_to_rescope"),
            directories_to_publish: multiline_input(env, "directories_to_publish"),
            pre_publish_commands: multiline_input(env, "pre_publish_commands"),
            dependency_types: multiline_input(env, "dependency_types"),
            publish_flags: multiline_input(env, "publish_flags"),
            fail_on_non_package_dir: boolean_input(env, "fail_on_non_package_dir")?,
            package_manager: input(env, "package_manager"),
            reinstall: boolean_input(env, "reinstall")?,
            dry_run: boolean_input(env, "dry_run")?,
            working_directory: input(env, "working_directory").map(PathBuf::from),
        })
    }

    /// Expand `${VAR}` references in publish flags
    ///
    /// Pre-publish commands are left alone; the shell expands them.
    pub fn expand_env_vars(
        mut config: RescopeConfig,
        env: &HashMap<String, String>,
    ) -> Result<RescopeConfig, RescopeError> {
        let regex = Regex::new(ENV_VAR_PATTERN)
            .map_err(|e| RescopeError::config("env", format!("Invalid regex: {}", e)))?;

        if let Some(flags) = config.publish_flags.take() {
            config.publish_flags = Some(
                flags
                    .iter()
                    .map(|f| expand_value(&regex, f, env, "publish_flags"))
                    .collect::<Result<_, _>>()?,
            );
        }

        Ok(config)
    }
}

fn env_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Single-line input; blank counts as absent
fn input(env: &HashMap<String, String>, name: &str) -> Option<String> {
    env.get(&env_key(name))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Multi-line input: one trimmed entry per non-empty line
fn multiline_input(env: &HashMap<String, String>, name: &str) -> Option<Vec<String>> {
    input(env, name).map(|value| {
        value
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    })
}

fn boolean_input(env: &HashMap<String, String>, name: &str) -> Result<Option<bool>, RescopeError> {
    let Some(value) = input(env, name) else {
        return Ok(None);
    };

    if TRUE_VALUES.contains(&value.as_str()) {
        Ok(Some(true))
    } else if FALSE_VALUES.contains(&value.as_str()) {
        Ok(Some(false))
    } else {
        Err(RescopeError::config(
            name,
            "Input does not meet YAML 1.2 \"Core Schema\" specification. \
             Support boolean input list: `true | True | TRUE | false | False | FALSE`",
        ))
    }
}

fn expand_value(
    regex: &Regex,
    value: &str,
    env: &HashMap<String, String>,
    field: &str,
) -> Result<String, RescopeError> {
    let mut missing: Option<String> = None;
    let expanded = regex.replace_all(value, |caps: &Captures| match env.get(&caps[1]) {
        Some(v) => v.clone(),
        None => {
            missing.get_or_insert_with(|| caps[1].to_string());
            String::new()
        }
    });

    if let Some(name) = missing {
        return Err(RescopeError::config(
            field,
            format!("environment variable {} is not set", name),
        ));
    }

    Ok(expanded.into_owned())
}
