//! Rescope Publisher - Main orchestrator for a rescope run
//!
//! Runs the two-pass workflow, strictly sequentially:
//! 1. `install` at the working directory
//! 2. Rescope pass over `directories_to_rescope`: rename, stamp the version,
//!    alias internal dependencies, write package.json
//! 3. Optional reinstall so the rewritten aliases resolve
//! 4. Dependency pass over `directories_to_publish`: alias internal
//!    dependencies again against the freshly installed tree
//! 5. For each publish directory in order: pre-publish hooks, then publish
//!
//! Every manifest pass loads and checks all of its directories before the
//! first write. Any error aborts the run; nothing is rolled back.

use crate::core::config::RunSettings;
use crate::core::error::RescopeError;
use crate::core::state_machine::{RunState, RunStateMachine};
use crate::core::traits::{CommandRunner, Invocation};
use crate::discovery::DirectoryResolver;
use crate::manifest::{
    DependencyRewrite, Manifest, ManifestValidator, package_json, rescope_dependencies,
    rescope_package,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// A package renamed during the rescope pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescopedPackage {
    pub directory: PathBuf,
    pub previous_name: String,
    pub name: String,
    pub version: String,
}

/// A dependency specifier changed in some directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRewrite {
    pub directory: PathBuf,
    pub rewrite: DependencyRewrite,
}

/// Report returned after a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub rescoped: Vec<RescopedPackage>,
    pub dependency_rewrites: Vec<PackageRewrite>,
    pub published: Vec<PathBuf>,
    /// Directories without a package.json (skip mode only)
    pub skipped: Vec<PathBuf>,
    /// Milliseconds
    pub duration: u64,
    pub state: RunState,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            rescoped: Vec::new(),
            dependency_rewrites: Vec::new(),
            published: Vec::new(),
            skipped: Vec::new(),
            duration: 0,
            state: RunState::Init,
        }
    }
}

struct LoadedPackage {
    directory: PathBuf,
    manifest: Manifest,
}

/// Main rescope orchestrator
pub struct RescopePublisher<R: CommandRunner> {
    settings: RunSettings,
    runner: R,
    resolver: DirectoryResolver,
    validator: ManifestValidator,
    state_machine: RunStateMachine,
}

impl<R: CommandRunner> RescopePublisher<R> {
    pub fn new(settings: RunSettings, runner: R) -> Self {
        Self {
            resolver: DirectoryResolver::new(settings.working_directory.clone()),
            validator: ManifestValidator::new(),
            state_machine: RunStateMachine::new(),
            settings,
            runner,
        }
    }

    pub fn state_machine(&self) -> &RunStateMachine {
        &self.state_machine
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Execute the whole pipeline. On error the state machine ends in `Failed`.
    pub async fn run(&mut self) -> Result<RunReport, RescopeError> {
        let start_time = Instant::now();
        let mut report = RunReport::default();

        match self.execute(&mut report).await {
            Ok(()) => {
                self.state_machine.transition(RunState::Done, None);
                report.state = RunState::Done;
                report.duration = start_time.elapsed().as_millis() as u64;
                info!(
                    rescoped = report.rescoped.len(),
                    published = report.published.len(),
                    skipped = report.skipped.len(),
                    "rescope run completed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(
                    code = e.code(),
                    state = %self.state_machine.get_state(),
                    "{}",
                    e
                );
                self.state_machine.fail(&e);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, report: &mut RunReport) -> Result<(), RescopeError> {
        let rescope_dirs = self.resolver.resolve(&self.settings.rescope_patterns)?;
        let publish_dirs = self.resolver.resolve(&self.settings.publish_patterns)?;
        info!(?rescope_dirs, ?publish_dirs, "resolved directories");

        self.state_machine.transition(RunState::Installing, None);
        self.install().await?;

        self.state_machine.transition(RunState::RescopingNames, None);
        self.rescope_names(&rescope_dirs, report).await?;

        if self.settings.reinstall {
            self.state_machine
                .transition(RunState::ReinstallingOptional, None);
            self.install().await?;
        }

        self.state_machine
            .transition(RunState::RewritingDependents, None);
        let publishable = self.rewrite_dependents(&publish_dirs, report).await?;

        for directory in publishable {
            let detail = Some(directory.display().to_string());

            self.state_machine
                .transition(RunState::RunningPrePublishHooks, detail.clone());
            self.run_pre_publish_hooks(&directory).await?;

            self.state_machine.transition(RunState::Publishing, detail);
            self.publish(&directory).await?;
            report.published.push(directory);
        }

        Ok(())
    }

    async fn install(&self) -> Result<(), RescopeError> {
        let invocation = self
            .settings
            .package_manager
            .install(&self.settings.working_directory);
        self.runner.run(&invocation).await
    }

    /// Check and load every directory before anything is written
    async fn load_packages(
        &self,
        directories: &[PathBuf],
        report: &mut RunReport,
    ) -> Result<Vec<LoadedPackage>, RescopeError> {
        let mut packages = Vec::with_capacity(directories.len());

        for directory in directories {
            match package_json::load_if_present(directory, self.settings.fail_on_non_package_dir)
                .await?
            {
                Some(manifest) => packages.push(LoadedPackage {
                    directory: directory.clone(),
                    manifest,
                }),
                None => {
                    if !report.skipped.contains(directory) {
                        report.skipped.push(directory.clone());
                    }
                }
            }
        }

        Ok(packages)
    }

    async fn rescope_names(
        &self,
        directories: &[PathBuf],
        report: &mut RunReport,
    ) -> Result<(), RescopeError> {
        let scope = &self.settings.scope;
        let alias_version = self.settings.version.alias_version();

        for package in self.load_packages(directories, report).await? {
            let version = self.settings.version.stamp();
            let outcome = rescope_package(
                &package.manifest,
                scope,
                &version,
                &self.settings.dependency_types,
                alias_version,
            );

            info!(
                directory = %package.directory.display(),
                from = package.manifest.name(),
                to = outcome.manifest.name(),
                version = %version,
                "package name"
            );
            for warning in self.validator.validate(&outcome.manifest) {
                warn!(package = outcome.manifest.name(), "{}", warning);
            }

            package_json::write(&package.directory, &outcome.manifest).await?;

            record_rewrites(report, &package.directory, outcome.rewrites);
            report.rescoped.push(RescopedPackage {
                directory: package.directory,
                previous_name: package.manifest.name().to_string(),
                name: outcome.manifest.name().to_string(),
                version,
            });
        }

        Ok(())
    }

    /// Returns the directories that still need publishing
    async fn rewrite_dependents(
        &self,
        directories: &[PathBuf],
        report: &mut RunReport,
    ) -> Result<Vec<PathBuf>, RescopeError> {
        let alias_version = self.settings.version.alias_version();
        let mut publishable = Vec::new();

        for package in self.load_packages(directories, report).await? {
            let outcome = rescope_dependencies(
                &package.manifest,
                &self.settings.scope,
                &self.settings.dependency_types,
                alias_version,
            );

            info!(
                directory = %package.directory.display(),
                package = package.manifest.name(),
                rewrites = outcome.rewrites.len(),
                "updating rescoped dependencies"
            );
            package_json::write(&package.directory, &outcome.manifest).await?;

            record_rewrites(report, &package.directory, outcome.rewrites);
            publishable.push(package.directory);
        }

        Ok(publishable)
    }

    async fn run_pre_publish_hooks(&self, directory: &Path) -> Result<(), RescopeError> {
        for command in &self.settings.pre_publish_commands {
            self.runner
                .run(&Invocation::shell(command.clone(), directory))
                .await?;
        }
        Ok(())
    }

    async fn publish(&self, directory: &Path) -> Result<(), RescopeError> {
        let invocation = self.settings.package_manager.publish(
            directory,
            &self.settings.publish_flags,
            self.settings.dry_run,
        );
        self.runner.run(&invocation).await
    }
}

fn record_rewrites(report: &mut RunReport, directory: &Path, rewrites: Vec<DependencyRewrite>) {
    for rewrite in rewrites {
        info!(
            directory = %directory.display(),
            "{}.{}: {} -> {}",
            rewrite.field,
            rewrite.dependency,
            rewrite.previous,
            rewrite.alias
        );
        report.dependency_rewrites.push(PackageRewrite {
            directory: directory.to_path_buf(),
            rewrite,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RescopeConfig;
    use crate::manifest::MANIFEST_FILE;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every invocation; fails the one whose command line matches `fail_on`
    #[derive(Default)]
    struct RecordingRunner {
        invocations: Mutex<Vec<Invocation>>,
        fail_on: Option<String>,
    }

    impl RecordingRunner {
        fn failing_on(command: &str) -> Self {
            Self {
                fail_on: Some(command.to_string()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, PathBuf)> {
            self.invocations
                .lock()
                .unwrap()
                .iter()
                .map(|i| (i.command.to_string(), i.cwd.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> Result<(), RescopeError> {
            self.invocations.lock().unwrap().push(invocation.clone());

            if self.fail_on.as_deref() == Some(invocation.command.to_string().as_str()) {
                return Err(RescopeError::ChildProcessFailure {
                    command: invocation.command.to_string(),
                    cwd: invocation.cwd.clone(),
                    status: Some(1),
                    message: "exited with status 1".to_string(),
                });
            }
            Ok(())
        }
    }

    fn write_package(root: &Path, dir: &str, content: &str) {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join(MANIFEST_FILE), content).unwrap();
    }

    fn read_package(root: &Path, dir: &str) -> serde_json::Value {
        let content = std::fs::read_to_string(root.join(dir).join(MANIFEST_FILE)).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    fn monorepo() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        write_package(
            temp_dir.path(),
            "packages/lib",
            r#"{"name": "@old/lib", "version": "1.2.3"}"#,
        );
        write_package(
            temp_dir.path(),
            "packages/pkg",
            r#"{"name": "@old/pkg", "version": "0.1.0", "dependencies": {"@old/lib": "1.2.3", "other": "4.0.0"}}"#,
        );
        temp_dir
    }

    fn config(root: &Path) -> RescopeConfig {
        RescopeConfig {
            from: Some("@old".to_string()),
            to: Some("@new".to_string()),
            directories: Some(vec!["packages/*".to_string()]),
            working_directory: Some(root.to_path_buf()),
            ..Default::default()
        }
    }

    fn publisher(config: RescopeConfig, runner: RecordingRunner) -> RescopePublisher<RecordingRunner> {
        RescopePublisher::new(config.resolve().unwrap(), runner)
    }

    #[tokio::test]
    async fn test_full_run_with_fixed_version() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        let mut publisher = publisher(
            RescopeConfig {
                version: Some("9.9.9".to_string()),
                pre_publish_commands: Some(vec!["npm run build".to_string()]),
                publish_flags: Some(vec!["--access".to_string(), "public".to_string()]),
                ..config(root)
            },
            RecordingRunner::default(),
        );

        let report = publisher.run().await.unwrap();

        let pkg = read_package(root, "packages/pkg");
        assert_eq!(pkg["name"], "@new/pkg");
        assert_eq!(pkg["version"], "9.9.9");
        assert_eq!(pkg["dependencies"]["@old/lib"], "npm:@new/lib@9.9.9");
        assert_eq!(pkg["dependencies"]["other"], "4.0.0");
        assert_eq!(read_package(root, "packages/lib")["name"], "@new/lib");

        let lib = root.join("packages/lib");
        let pkg_dir = root.join("packages/pkg");
        assert_eq!(
            publisher.runner().calls(),
            vec![
                ("npm install".to_string(), root.to_path_buf()),
                ("npm install".to_string(), root.to_path_buf()),
                ("npm run build".to_string(), lib.clone()),
                ("npm publish --access public".to_string(), lib.clone()),
                ("npm run build".to_string(), pkg_dir.clone()),
                ("npm publish --access public".to_string(), pkg_dir.clone()),
            ]
        );

        assert_eq!(report.state, RunState::Done);
        assert_eq!(report.published, vec![lib, pkg_dir]);
        assert_eq!(report.rescoped.len(), 2);
        assert_eq!(report.rescoped[1].previous_name, "@old/pkg");
        assert_eq!(report.rescoped[1].name, "@new/pkg");
        // the second pass finds the aliases already in place
        assert_eq!(report.dependency_rewrites.len(), 1);
        assert_eq!(publisher.state_machine().get_state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_timestamp_version_uses_wildcard_alias() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        let mut publisher = publisher(config(root), RecordingRunner::default());

        let report = publisher.run().await.unwrap();

        let pkg = read_package(root, "packages/pkg");
        assert_eq!(pkg["dependencies"]["@old/lib"], "npm:@new/lib@*");
        let version = pkg["version"].as_str().unwrap();
        assert_ne!(version, "0.1.0");
        assert!(version.contains('-'));
        assert_eq!(report.rescoped[1].version, version);
    }

    #[tokio::test]
    async fn test_missing_manifest_fails_before_any_write() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("packages/docs")).unwrap();
        let mut publisher = publisher(config(root), RecordingRunner::default());

        let result = publisher.run().await;

        assert!(matches!(result, Err(RescopeError::MissingManifest { .. })));
        assert_eq!(read_package(root, "packages/lib")["name"], "@old/lib");
        assert_eq!(read_package(root, "packages/pkg")["version"], "0.1.0");
        assert_eq!(
            publisher.runner().calls(),
            vec![("npm install".to_string(), root.to_path_buf())]
        );
        assert_eq!(publisher.state_machine().get_state(), RunState::Failed);
        assert!(
            publisher
                .state_machine()
                .get_last_error()
                .unwrap()
                .contains("does not contain a package.json")
        );
    }

    #[tokio::test]
    async fn test_missing_manifest_skipped_when_tolerated() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("packages/docs")).unwrap();
        let mut publisher = publisher(
            RescopeConfig {
                fail_on_non_package_dir: Some(false),
                ..config(root)
            },
            RecordingRunner::default(),
        );

        let report = publisher.run().await.unwrap();

        assert_eq!(report.skipped, vec![root.join("packages/docs")]);
        assert_eq!(
            report.published,
            vec![root.join("packages/lib"), root.join("packages/pkg")]
        );
        assert!(!root.join("packages/docs").join(MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn test_failing_hook_aborts_run() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        let mut publisher = publisher(
            RescopeConfig {
                pre_publish_commands: Some(vec!["npm test".to_string()]),
                ..config(root)
            },
            RecordingRunner::failing_on("npm test"),
        );

        let result = publisher.run().await;

        assert!(matches!(result, Err(RescopeError::ChildProcessFailure { .. })));
        let calls = publisher.runner().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], ("npm test".to_string(), root.join("packages/lib")));
        assert!(!calls.iter().any(|(command, _)| command.starts_with("npm publish")));
        assert_eq!(publisher.state_machine().get_state(), RunState::Failed);
    }

    #[tokio::test]
    async fn test_failing_publish_stops_later_directories() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        let mut publisher = publisher(config(root), RecordingRunner::failing_on("npm publish"));

        let result = publisher.run().await;

        assert!(matches!(result, Err(RescopeError::ChildProcessFailure { .. })));
        let publishes: Vec<_> = publisher
            .runner()
            .calls()
            .into_iter()
            .filter(|(command, _)| command == "npm publish")
            .collect();
        assert_eq!(publishes, vec![("npm publish".to_string(), root.join("packages/lib"))]);
    }

    #[tokio::test]
    async fn test_failing_install_touches_nothing() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        let mut publisher = publisher(config(root), RecordingRunner::failing_on("npm install"));

        let result = publisher.run().await;

        assert!(matches!(result, Err(RescopeError::ChildProcessFailure { .. })));
        assert_eq!(read_package(root, "packages/lib")["name"], "@old/lib");
    }

    #[tokio::test]
    async fn test_separate_publish_set_without_reinstall() {
        let temp_dir = monorepo();
        let root = temp_dir.path();
        let mut publisher = publisher(
            RescopeConfig {
                directories_to_publish: Some(vec!["packages/pkg".to_string()]),
                reinstall: Some(false),
                dry_run: Some(true),
                ..config(root)
            },
            RecordingRunner::default(),
        );

        let report = publisher.run().await.unwrap();

        assert_eq!(report.rescoped.len(), 2);
        assert_eq!(
            publisher.runner().calls(),
            vec![
                ("npm install".to_string(), root.to_path_buf()),
                ("npm publish --dry-run".to_string(), root.join("packages/pkg")),
            ]
        );
        let transitions: Vec<RunState> = publisher
            .state_machine()
            .transitions()
            .iter()
            .map(|t| t.to)
            .collect();
        assert!(!transitions.contains(&RunState::ReinstallingOptional));
    }

    #[tokio::test]
    async fn test_no_matching_directories_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let mut publisher = publisher(config(root), RecordingRunner::default());

        let report = publisher.run().await.unwrap();

        assert!(report.rescoped.is_empty());
        assert!(report.published.is_empty());
        assert_eq!(publisher.runner().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_state_sequence() {
        let temp_dir = TempDir::new().unwrap();
        write_package(temp_dir.path(), "packages/one", r#"{"name": "@old/one"}"#);
        let mut publisher = publisher(config(temp_dir.path()), RecordingRunner::default());

        publisher.run().await.unwrap();

        let states: Vec<RunState> = publisher
            .state_machine()
            .transitions()
            .iter()
            .map(|t| t.to)
            .collect();
        assert_eq!(
            states,
            vec![
                RunState::Installing,
                RunState::RescopingNames,
                RunState::ReinstallingOptional,
                RunState::RewritingDependents,
                RunState::RunningPrePublishHooks,
                RunState::Publishing,
                RunState::Done,
            ]
        );
    }
}
