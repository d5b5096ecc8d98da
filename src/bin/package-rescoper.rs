//! Package Rescoper CLI
//!
//! Republishes locally built packages under a different scope

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use package_rescoper::core::CONFIG_TEMPLATE;
use package_rescoper::{
    ConfigLoadOptions, ConfigLoader, ProcessExecutor, RescopeConfig, RescopeError,
    RescopePublisher, RunSettings, core::CONFIG_FILENAME, orchestration,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Republish a set of packages under a new scope
#[derive(Parser)]
#[command(name = "package-rescoper")]
#[command(version = "0.1.0")]
#[command(about = "Rescope and republish monorepo packages", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rescope, reinstall, rewrite dependencies and publish
    Run(InputArgs),

    /// Show what a run would change without writing or publishing
    Check(InputArgs),

    /// Write a default .rescope-config.yaml
    Init {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Substring to replace in package names
    #[arg(long)]
    from: Option<String>,

    /// Replacement for --from
    #[arg(long)]
    to: Option<String>,

    /// Fixed version for every rescoped package (default: UTC timestamp)
    #[arg(long = "version", value_name = "VERSION")]
    package_version: Option<String>,

    /// Directory pattern for both passes (repeatable)
    #[arg(long = "directory", value_name = "PATTERN")]
    directories: Vec<String>,

    /// Directory pattern for the rescope pass (repeatable)
    #[arg(long = "rescope-directory", value_name = "PATTERN")]
    rescope_directories: Vec<String>,

    /// Directory pattern for the publish pass (repeatable)
    #[arg(long = "publish-directory", value_name = "PATTERN")]
    publish_directories: Vec<String>,

    /// Shell command run in each package before publishing (repeatable)
    #[arg(long = "pre-publish-command", value_name = "COMMAND")]
    pre_publish_commands: Vec<String>,

    /// Manifest field holding dependencies (repeatable)
    #[arg(long = "dependency-type", value_name = "FIELD")]
    dependency_types: Vec<String>,

    /// Extra flag for the publish command (repeatable)
    #[arg(long = "publish-flag", value_name = "FLAG", allow_hyphen_values = true)]
    publish_flags: Vec<String>,

    /// Skip directories without a package.json instead of failing
    #[arg(long)]
    skip_non_package_dirs: bool,

    /// Package manager binary (npm, pnpm, yarn, bun)
    #[arg(long)]
    package_manager: Option<String>,

    /// Do not reinstall between the rescope and dependency passes
    #[arg(long)]
    no_reinstall: bool,

    /// Publish with --dry-run
    #[arg(long)]
    dry_run: bool,

    /// Configuration file (default: ./.rescope-config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for install and relative patterns
    #[arg(short = 'C', long)]
    working_directory: Option<PathBuf>,
}

impl InputArgs {
    fn project_path(&self) -> PathBuf {
        self.working_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// CLI layer of the configuration; unset flags stay `None`
    fn to_config(&self) -> RescopeConfig {
        let list = |values: &Vec<String>| (!values.is_empty()).then(|| values.clone());

        RescopeConfig {
            from: self.from.clone(),
            to: self.to.clone(),
            version: self.package_version.clone(),
            directories: list(&self.directories),
            directories_to_rescope: list(&self.rescope_directories),
            directories_to_publish: list(&self.publish_directories),
            pre_publish_commands: list(&self.pre_publish_commands),
            dependency_types: list(&self.dependency_types),
            publish_flags: list(&self.publish_flags),
            fail_on_non_package_dir: self.skip_non_package_dirs.then_some(false),
            package_manager: self.package_manager.clone(),
            reinstall: self.no_reinstall.then_some(false),
            dry_run: self.dry_run.then_some(true),
            working_directory: self.working_directory.clone(),
        }
    }

    async fn settings(&self) -> Result<RunSettings, RescopeError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let options = ConfigLoadOptions {
            project_path: self.project_path(),
            config_file: self.config.clone(),
            cli_args: Some(self.to_config()),
            env,
        };

        ConfigLoader::load(options).await?.resolve()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            report_failure(&e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "package_rescoper=debug,info"
    } else {
        "package_rescoper=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Report a fatal error, as a workflow annotation when running in GitHub Actions
fn report_failure(error: &anyhow::Error) {
    tracing::error!("{}", error);

    if let Some(rescope_error) = error.downcast_ref::<RescopeError>() {
        for action in rescope_error.suggested_actions() {
            eprintln!("  - {}", action);
        }
    }

    if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
        println!("::error::{}", error);
    }
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::Check(args) => check_command(args).await,
        Commands::Init {
            project_path,
            force,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            init_command(path, force).await
        }
    }
}

async fn run_command(args: InputArgs) -> Result<i32> {
    let settings = args.settings().await?;
    let mut publisher = RescopePublisher::new(settings, ProcessExecutor::new());

    let result = publisher.run().await;
    tracing::debug!(
        "state history:\n{}",
        publisher.state_machine().get_history()
    );
    let report = result?;

    println!(
        "\nRescoped {} package(s), published {}, skipped {} in {} ms",
        report.rescoped.len(),
        report.published.len(),
        report.skipped.len(),
        report.duration
    );
    for package in &report.rescoped {
        println!(
            "  {} -> {}@{}",
            package.previous_name, package.name, package.version
        );
    }

    Ok(0)
}

async fn check_command(args: InputArgs) -> Result<i32> {
    let settings = args.settings().await?;
    let plan = orchestration::plan(&settings).await?;

    println!(
        "\nRescope {} -> {}\n",
        settings.scope.from(),
        settings.scope.to()
    );

    if plan.packages.is_empty() {
        println!("No package directories matched");
        return Ok(1);
    }

    let mut has_warnings = false;
    for package in &plan.packages {
        println!("{}", package.directory.display());
        match (&package.name, &package.version) {
            (Some(name), Some(version)) => {
                println!("  name: {} -> {}@{}", package.previous_name, name, version)
            }
            _ => println!("  name: {} (not rescoped)", package.previous_name),
        }
        for rewrite in &package.rewrites {
            println!(
                "  {}.{}: {} -> {}",
                rewrite.field, rewrite.dependency, rewrite.previous, rewrite.alias
            );
        }
        for warning in &package.warnings {
            has_warnings = true;
            println!("  warning: {}", warning);
        }
    }

    let publish: Vec<String> = plan
        .publish_order()
        .map(|p| p.directory.display().to_string())
        .collect();
    println!("\nPublish order: {}", publish.join(", "));
    for skipped in &plan.skipped {
        println!("Skipped (no package.json): {}", skipped.display());
    }

    Ok(if has_warnings { 1 } else { 0 })
}

async fn init_command(project_path: PathBuf, force: bool) -> Result<i32> {
    let config_path = project_path.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        eprintln!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
        return Ok(1);
    }

    tokio::fs::write(&config_path, CONFIG_TEMPLATE).await?;
    println!("Created {}", config_path.display());
    Ok(0)
}
