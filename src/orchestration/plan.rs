//! Dry planning for the `check` command
//!
//! Simulates both manifest passes in memory: no file is written and no
//! process is started.

use crate::core::config::RunSettings;
use crate::core::error::RescopeError;
use crate::discovery::DirectoryResolver;
use crate::manifest::{
    DependencyRewrite, Manifest, ManifestValidator, package_json, rescope_dependencies,
    rescope_package,
};
use std::collections::HashMap;
use std::path::PathBuf;

/// What the run would do to one directory
#[derive(Debug, Clone)]
pub struct PlannedPackage {
    pub directory: PathBuf,
    pub previous_name: String,
    /// `None` when the directory is only in the publish set
    pub name: Option<String>,
    pub version: Option<String>,
    pub rewrites: Vec<DependencyRewrite>,
    pub warnings: Vec<String>,
    pub publish: bool,
}

/// Planned outcome of a run
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub packages: Vec<PlannedPackage>,
    pub skipped: Vec<PathBuf>,
}

impl RunPlan {
    pub fn publish_order(&self) -> impl Iterator<Item = &PlannedPackage> {
        self.packages.iter().filter(|p| p.publish)
    }
}

/// Build the plan for `settings` against the current filesystem
pub async fn plan(settings: &RunSettings) -> Result<RunPlan, RescopeError> {
    let resolver = DirectoryResolver::new(settings.working_directory.clone());
    let validator = ManifestValidator::new();
    let rescope_dirs = resolver.resolve(&settings.rescope_patterns)?;
    let publish_dirs = resolver.resolve(&settings.publish_patterns)?;
    let alias_version = settings.version.alias_version();

    let mut plan = RunPlan::default();
    let mut rescoped: HashMap<PathBuf, Manifest> = HashMap::new();

    for directory in rescope_dirs {
        let Some(manifest) =
            package_json::load_if_present(&directory, settings.fail_on_non_package_dir).await?
        else {
            plan.skipped.push(directory);
            continue;
        };

        let version = settings.version.stamp();
        let outcome = rescope_package(
            &manifest,
            &settings.scope,
            &version,
            &settings.dependency_types,
            alias_version,
        );

        plan.packages.push(PlannedPackage {
            directory: directory.clone(),
            previous_name: manifest.name().to_string(),
            name: Some(outcome.manifest.name().to_string()),
            version: Some(version),
            rewrites: outcome.rewrites,
            warnings: validator.validate(&outcome.manifest),
            publish: false,
        });
        rescoped.insert(directory, outcome.manifest);
    }

    for directory in publish_dirs {
        let manifest = match rescoped.get(&directory) {
            Some(manifest) => manifest.clone(),
            None => {
                match package_json::load_if_present(&directory, settings.fail_on_non_package_dir)
                    .await?
                {
                    Some(manifest) => manifest,
                    None => {
                        if !plan.skipped.contains(&directory) {
                            plan.skipped.push(directory);
                        }
                        continue;
                    }
                }
            }
        };

        let outcome = rescope_dependencies(
            &manifest,
            &settings.scope,
            &settings.dependency_types,
            alias_version,
        );

        match plan.packages.iter_mut().find(|p| p.directory == directory) {
            Some(planned) => {
                planned.rewrites.extend(outcome.rewrites);
                planned.publish = true;
            }
            None => plan.packages.push(PlannedPackage {
                directory,
                previous_name: manifest.name().to_string(),
                name: None,
                version: None,
                rewrites: outcome.rewrites,
                warnings: Vec::new(),
                publish: true,
            }),
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RescopeConfig;
    use crate::manifest::MANIFEST_FILE;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_package(root: &Path, dir: &str, content: &str) {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join(MANIFEST_FILE), content).unwrap();
    }

    fn settings(root: &Path, publish: &[&str]) -> RunSettings {
        RescopeConfig {
            from: Some("@old".to_string()),
            to: Some("@new".to_string()),
            version: Some("2.0.0".to_string()),
            directories_to_rescope: Some(vec!["packages/*".to_string()]),
            directories_to_publish: Some(publish.iter().map(|s| s.to_string()).collect()),
            fail_on_non_package_dir: Some(false),
            working_directory: Some(root.to_path_buf()),
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    #[tokio::test]
    async fn test_plan_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let original = r#"{"name": "@old/pkg", "dependencies": {"@old/lib": "1.0.0"}}"#;
        write_package(root, "packages/pkg", original);
        std::fs::create_dir_all(root.join("packages/empty")).unwrap();

        let plan = plan(&settings(root, &["packages/*"])).await.unwrap();

        assert_eq!(plan.packages.len(), 1);
        let planned = &plan.packages[0];
        assert_eq!(planned.name.as_deref(), Some("@new/pkg"));
        assert_eq!(planned.version.as_deref(), Some("2.0.0"));
        assert_eq!(planned.rewrites.len(), 1);
        assert_eq!(planned.rewrites[0].alias, "npm:@new/lib@2.0.0");
        assert!(planned.publish);
        assert_eq!(plan.skipped, vec![root.join("packages/empty")]);

        let on_disk = std::fs::read_to_string(root.join("packages/pkg").join(MANIFEST_FILE)).unwrap();
        assert_eq!(on_disk, original);
    }

    #[tokio::test]
    async fn test_plan_publish_only_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_package(root, "packages/lib", r#"{"name": "@old/lib"}"#);
        write_package(
            root,
            "apps/web",
            r#"{"name": "web", "devDependencies": {"@old/lib": "^1"}}"#,
        );

        let plan = plan(&settings(root, &["apps/web"])).await.unwrap();

        let publish: Vec<_> = plan.publish_order().collect();
        assert_eq!(publish.len(), 1);
        assert_eq!(publish[0].previous_name, "web");
        assert_eq!(publish[0].name, None);
        assert_eq!(publish[0].rewrites[0].field, "devDependencies");
        assert!(!plan.packages[0].publish);
    }
}
