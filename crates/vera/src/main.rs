//! Vera - validation and self-remediation engine.
//!
//! Runs the platform check suite, repairs what it can through reversible
//! fix strategies, and writes machine- and human-readable reports.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vera::actions;
use vera::checks;
use vera::config::{EngineConfig, CONFIG_FILE, SUITE_FILE};
use vera::registry::{CheckContext, CheckRegistry, WorkspaceEnvironment};
use vera::render::render_report;
use vera::resolver::StrategyTable;
use vera::store::FileStore;
use vera::{Engine, RemediationOptions, SuiteDefinition};

#[derive(Parser)]
#[command(name = "vera")]
#[command(about = "Validation and self-remediation engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Workspace root holding vera.toml and the store
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the validation suite with remediation
    Run {
        /// Suite definition file (defaults to vera-suite.yaml)
        #[arg(long)]
        suite: Option<PathBuf>,

        /// Validate only; skip the fix phase entirely
        #[arg(long)]
        validate_only: bool,

        /// Resolve strategies but do not execute them
        #[arg(long)]
        dry_run: bool,

        /// Do not start the next phase once a check has failed
        #[arg(long)]
        stop_on_first_failure: bool,

        /// Single attempt per check, no retry loop
        #[arg(long)]
        no_retries: bool,

        /// Run only the named checks (repeatable)
        #[arg(long = "only")]
        only_checks: Vec<String>,
    },

    /// Replay the rollback actions of every recorded fix operation
    Rollback,

    /// List registered checks
    Checks,

    /// Show the last saved structured report
    Report,
}

fn build_engine(workspace: &PathBuf) -> Result<(Engine, EngineConfig)> {
    let config = EngineConfig::load(&workspace.join(CONFIG_FILE))?;

    let store_path = workspace.join(&config.store_path);
    let store = Arc::new(FileStore::new(&store_path));
    let env = Box::new(WorkspaceEnvironment::new(&store_path));
    let ctx = CheckContext::new(store, workspace.clone());

    let mut registry = CheckRegistry::new();
    checks::register_builtin(&mut registry);

    let engine = Engine::new(
        config.clone(),
        registry,
        actions::builtin_registry(),
        StrategyTable::builtin(),
        env,
        ctx,
    );
    Ok((engine, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let workspace = match &cli.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("cannot determine working directory")?,
    };

    match cli.command {
        Commands::Run {
            suite,
            validate_only,
            dry_run,
            stop_on_first_failure,
            no_retries,
            only_checks,
        } => {
            let (mut engine, config) = build_engine(&workspace)?;
            let suite_path = suite.unwrap_or_else(|| workspace.join(SUITE_FILE));
            let suite = SuiteDefinition::load(&suite_path)
                .with_context(|| format!("cannot load suite {}", suite_path.display()))?;

            let mut options = RemediationOptions::from_config(&config);
            if validate_only {
                options.remediation_enabled = false;
            }
            if dry_run {
                options.dry_run = true;
            }
            if stop_on_first_failure {
                options.stop_on_first_failure = true;
            }
            if no_retries {
                options.enable_retries = false;
            }
            if !only_checks.is_empty() {
                options.only_checks = Some(only_checks);
            }

            info!("vera v{} running suite {}", env!("CARGO_PKG_VERSION"), suite.name);
            let report = engine.run_suite(&suite, &options).await;

            let report_path = workspace.join(&config.report_path);
            if let Some(parent) = report_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let structured = vera_common::export::structured(&report);
            std::fs::write(&report_path, serde_json::to_string_pretty(&structured)?)
                .with_context(|| format!("cannot write {}", report_path.display()))?;
            std::fs::write(
                report_path.with_extension("log"),
                vera_common::export::narrative(&report),
            )?;

            println!("{}", render_report(&report));
            if report.has_failures() {
                println!("{}", vera_common::export::suggestions(&report));
                std::process::exit(1);
            }
        }

        Commands::Rollback => {
            let (mut engine, _) = build_engine(&workspace)?;
            let result = engine.rollback_all().await;
            if result.attempted() == 0 {
                println!("ledger is empty, nothing to roll back");
            } else {
                for entry in &result.entries {
                    let status = if entry.succeeded {
                        format!("{}", "ok".green())
                    } else {
                        format!("{}", "failed".red())
                    };
                    println!("{} ({}): {}", entry.check_name, entry.strategy_kind, status);
                }
                if !result.all_succeeded() {
                    std::process::exit(1);
                }
            }
        }

        Commands::Checks => {
            let (engine, _) = build_engine(&workspace)?;
            for check in engine.checks().list() {
                println!("{:<20} {}", check.name.bold(), check.description);
            }
        }

        Commands::Report => {
            let (_, config) = build_engine(&workspace)?;
            let report_path = workspace.join(&config.report_path);
            let content = std::fs::read_to_string(&report_path)
                .with_context(|| format!("no saved report at {}", report_path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}
