use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use merlion_core::Config;
use merlion_core::model::DocumentKind;
use merlion_store::DuckStore;
use merlion_sync::{CaselawSync, Fetcher, StatuteSync, run_sweep};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "merlion", version, about = "Singapore statute and case-law ingestion")]
struct Cli {
    /// DuckDB database file.
    #[arg(long, global = true, default_value = "merlion.duckdb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Acts,
    Subsidiary,
}

#[derive(Subcommand)]
enum Command {
    /// Sync primary acts by site path, e.g. /Act/ASA2007.
    Acts {
        paths: Vec<String>,
        /// Discover every current act from the browse listing instead of
        /// taking explicit paths.
        #[arg(long, conflicts_with = "paths")]
        all: bool,
    },
    /// Sync subsidiary legislation by site path, e.g. /SL/AA2004-R5.
    Subsidiary {
        paths: Vec<String>,
        #[arg(long, conflicts_with = "paths")]
        all: bool,
    },
    /// List document paths from the browse listing without syncing.
    Discover { target: Target },
    /// Sync new case law from the aggregation API.
    Cases {
        /// Override the configured page cap.
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Summarize stored cases that still lack a summary.
    Summarize {
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, default_value = "https://api.openai.com/v1")]
        api_base: String,
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        /// Per-call timeout in seconds.
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = Config::default();
    let store = DuckStore::open_persistent(&cli.db)?;
    let fetcher = Fetcher::new(config.retry)?;

    match cli.command {
        Command::Acts { paths, all } => {
            let sync = StatuteSync::new(&store, &fetcher, &config);
            let paths = if all {
                sync.discover_act_paths().await?
            } else {
                paths
            };
            if paths.is_empty() {
                bail!("no act paths given; pass paths or --all");
            }
            let report = sync.sync_batch(DocumentKind::Act, &paths).await;
            summarize_run(&report)?;
        }
        Command::Subsidiary { paths, all } => {
            let sync = StatuteSync::new(&store, &fetcher, &config);
            let paths = if all {
                sync.discover_sl_paths().await?
            } else {
                paths
            };
            if paths.is_empty() {
                bail!("no subsidiary paths given; pass paths or --all");
            }
            let report = sync.sync_batch(DocumentKind::Subsidiary, &paths).await;
            summarize_run(&report)?;
        }
        Command::Discover { target } => {
            let sync = StatuteSync::new(&store, &fetcher, &config);
            let paths = match target {
                Target::Acts => sync.discover_act_paths().await?,
                Target::Subsidiary => sync.discover_sl_paths().await?,
            };
            for path in &paths {
                println!("{path}");
            }
            tracing::info!(count = paths.len(), "discovery finished");
        }
        Command::Cases { max_pages } => {
            if let Some(max_pages) = max_pages {
                config.max_pages = max_pages;
            }
            let report = CaselawSync::new(&store, &fetcher, &config).run().await?;
            tracing::info!(
                new_cases_found = report.new_cases_found,
                pages_processed = report.pages_processed,
                "case-law sync finished"
            );
        }
        Command::Summarize {
            api_key,
            api_base,
            model,
            timeout,
        } => {
            let summarizer = merlion_ai::Summarizer::new(
                &api_base,
                &api_key,
                &model,
                Duration::from_secs(timeout),
            )?;
            let report = run_sweep(&store, &summarizer, &config).await?;
            tracing::info!(
                attempted = report.attempted,
                summarized = report.summarized,
                "sweep finished"
            );
        }
    }
    Ok(())
}

fn summarize_run(report: &merlion_sync::RunReport) -> anyhow::Result<()> {
    tracing::info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        sections_written = report.sections_written,
        elapsed_secs = (report.finished_at - report.started_at).num_seconds(),
        "run finished"
    );
    if report.succeeded.is_empty() && !report.failed.is_empty() {
        bail!("every document in the batch failed");
    }
    Ok(())
}
