//! # pubsync CLI
//!
//! Command parsing and wiring for the `pubsync` binary. Every piece of domain logic lives in
//! `pubsync-core`; this module loads configuration, builds the concrete collaborators
//! ([`ArticleClient`], [`PandocConverter`], [`GitChangeSource`]) and prints results.
//!
//! - `pubsync publish [FILES]...` publishes the named files, or the changed files of the
//!   index when none are named.
//! - `pubsync status` shows, per indexed file, whether it changed and where it is published.
//!
//! Call [`run`] with a parsed [`Cli`] for programmatic or integration use.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pubsync_core::config::{Baseline, PublishOptions};
use pubsync_core::convert::PandocConverter;
use pubsync_core::detect::{self, GitChangeSource, SelectionMode};
use pubsync_core::state::StateStore;
use pubsync_core::synchronise::{self, Collaborators, FileStatus, PlannedAction, PublishReport};

use crate::load_config::{api_key_from_env, load_config, CliConfig};
use crate::upload::ArticleClient;

/// Publish Org and Markdown articles to a remote blogging platform.
#[derive(Parser, Debug)]
#[clap(
    name = "pubsync",
    version,
    about = "Publish changed Org/Markdown articles and remember what they became"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update remote articles for the given files, or for changed indexed files
    Publish(PublishArgs),
    /// Show change and publish state for every indexed file
    Status(StatusArgs),
}

/// Locations shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Path to the YAML config file [default: pubsync.yaml, optional]
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Index of tracked content files (overrides config)
    #[clap(long)]
    pub index: Option<PathBuf>,
    /// Publish state file (overrides config)
    #[clap(long)]
    pub state: Option<PathBuf>,
    /// Compare the last two commits instead of HEAD and the working tree
    #[clap(long)]
    pub last_commit: bool,
    /// Match changed files on exact relative path only, never by file name
    #[clap(long)]
    pub strict_paths: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PublishArgs {
    /// Files to publish; bypasses the index and change detection
    pub files: Vec<PathBuf>,
    /// Print the payloads that would be sent without calling the API or writing state
    #[clap(long)]
    pub dry_run: bool,
    /// Publish every indexed file, changed or not
    #[clap(long, conflicts_with = "files")]
    pub force: bool,
    /// Publish everything as an unpublished draft
    #[clap(long)]
    pub draft: bool,
    #[clap(flatten)]
    pub paths: PathArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    #[clap(flatten)]
    pub paths: PathArgs,
}

/// Entry point shared by `main` and the integration tests.
///
/// `Err` means the run was aborted; a completed batch with failed files returns
/// `ExitCode::FAILURE` after printing the summary.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    tracing::info!("trace_initialised");
    match cli.command {
        Commands::Publish(args) => publish(args).await,
        Commands::Status(args) => status(args),
    }
}

/// Loads the config file and layers the command-line overrides on top.
fn resolve_config(paths: &PathArgs) -> Result<CliConfig> {
    let mut config = load_config(paths.config.as_deref())?;
    if let Some(index) = &paths.index {
        config.index = index.clone();
    }
    if let Some(state) = &paths.state {
        config.state = state.clone();
    }
    if paths.last_commit {
        config.baseline = Baseline::LastCommit;
    }
    config.strict_paths |= paths.strict_paths;
    Ok(config)
}

async fn publish(args: PublishArgs) -> Result<ExitCode> {
    let config = resolve_config(&args.paths)?;
    let api_key = api_key_from_env()?;

    let options = PublishOptions {
        root: config.root.clone(),
        dry_run: args.dry_run,
        draft_override: args.draft,
        strict_paths: config.strict_paths,
    };
    options.trace_loaded();

    let mode = if !args.files.is_empty() {
        SelectionMode::ExplicitFiles(
            args.files
                .iter()
                .map(|f| f.to_string_lossy().into_owned())
                .collect(),
        )
    } else if args.force {
        SelectionMode::Force
    } else {
        SelectionMode::Auto(config.baseline)
    };

    let indexed = match &mode {
        SelectionMode::ExplicitFiles(_) => Vec::new(),
        _ => detect::load_index(&config.index)?,
    };

    let mut state = StateStore::open(&config.state)?;
    let converter = PandocConverter::new(&config.pandoc)?;
    let changes = GitChangeSource::new(&config.root);
    let client = ArticleClient::from_config(&config, api_key)
        .context("Failed to construct API client")?;

    tracing::info!(command = "publish", ?mode, "Starting publish");
    let services = Collaborators {
        publisher: &client,
        converter: &converter,
        changes: &changes,
    };
    let report = synchronise::synchronise(&options, &mode, &indexed, &services, &mut state)
        .await
        .map_err(|e| {
            tracing::error!(command = "publish", error = %e, "Publish aborted");
            e
        })?;

    print_report(&report)?;
    tracing::info!(command = "publish", published = report.published(), failed = report.failed(), "Publish complete");
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &PublishReport) -> Result<()> {
    for outcome in &report.outcomes {
        match &outcome.status {
            FileStatus::Created { article_id, url } => {
                println!("[CREATED] {} -> {article_id} {url}", outcome.path)
            }
            FileStatus::Updated { article_id, url } => {
                println!("[UPDATED] {} -> {article_id} {url}", outcome.path)
            }
            FileStatus::DryRun { action, payload } => {
                let action = match action {
                    PlannedAction::Create => "create".to_string(),
                    PlannedAction::Update(id) => format!("update {id}"),
                };
                println!("[DRY-RUN] {} would {action}", outcome.path);
                println!("{}", serde_json::to_string_pretty(payload)?);
            }
            FileStatus::Failed(e) => println!("[FAIL] {}: {e}", outcome.path),
        }
    }
    println!("{report}");
    Ok(())
}

fn status(args: StatusArgs) -> Result<ExitCode> {
    let config = resolve_config(&args.paths)?;
    let indexed = detect::load_index(&config.index)?;
    let state = StateStore::open(&config.state)?;
    let changes = GitChangeSource::new(&config.root);

    let entries = synchronise::status(
        &indexed,
        config.baseline,
        &changes,
        config.strict_paths,
        &state,
    );
    let width = entries.iter().map(|e| e.path.len()).max().unwrap_or(4).max(4);
    println!("{:<width$}  {:<9}  ARTICLE", "FILE", "CHANGED");
    for entry in &entries {
        let changed = match entry.changed {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        };
        let article = match &entry.record {
            Some(r) => format!(
                "{} {} ({})",
                r.article_id,
                r.url,
                r.published_at
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
            None => "-".to_string(),
        };
        println!("{:<width$}  {changed:<9}  {article}", entry.path);
    }
    tracing::info!(command = "status", files = entries.len(), "Status complete");
    Ok(ExitCode::SUCCESS)
}
