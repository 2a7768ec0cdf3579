//! CLI entry point for the NBA data lake refresh job.
//!
//! `run` performs a single refresh, `schedule` repeats it on a timer, and
//! `fetch` pulls the feed into a local JSONL file without uploading.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use azure_identity::{DefaultAzureCredential, TokenCredentialOptions};
use clap::{Parser, Subcommand};
use nba_refresh::config::{RefreshArgs, RefreshConfig};
use nba_refresh::infra::blob::AzureBlobConnector;
use nba_refresh::refresh::{Pipeline, run_schedule};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nba_refresh")]
#[command(about = "Refreshes the NBA player feed into blob storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed once and overwrite the archive blob
    Run {
        #[command(flatten)]
        refresh: RefreshArgs,
    },
    /// Refresh on a fixed interval
    Schedule {
        #[command(flatten)]
        refresh: RefreshArgs,

        /// Seconds between refreshes
        #[arg(short = 'e', long, env = "NBA_REFRESH_EVERY_SECS", default_value_t = 86_400)]
        every_secs: u64,

        /// Number of refreshes to perform (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        runs: usize,
    },
    /// Fetch the feed and write it to a local JSONL file instead of uploading
    Fetch {
        #[command(flatten)]
        refresh: RefreshArgs,

        /// File to write the snapshot to
        #[arg(short, long, default_value = "nba_player_data.jsonl")]
        output: PathBuf,
    },
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_logging() -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nba_refresh.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nba_refresh.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("RUST_LOG")
                .from_env_lossy(),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .with_env_var("RUST_LOG_JSON")
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

fn pipeline(args: RefreshArgs) -> Result<Pipeline> {
    let config = RefreshConfig::try_from(args)?;
    info!(
        vault = %config.vault_name,
        endpoint = %config.endpoint,
        blob = %config.target,
        "Configuration loaded"
    );

    // Environment service principal, then managed identity, then the Azure CLI.
    let credential = DefaultAzureCredential::create(TokenCredentialOptions::default())
        .context("no Azure credential available")?;
    Ok(Pipeline::with_key_vault(
        &config,
        Arc::new(credential),
        Arc::new(AzureBlobConnector),
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { refresh } => {
            let outcome = pipeline(refresh)?.run().await;
            if !outcome.is_success() {
                bail!("refresh did not complete: {outcome:?}");
            }
        }
        Commands::Schedule {
            refresh,
            every_secs,
            runs,
        } => {
            if every_secs == 0 {
                bail!("--every-secs must be at least 1");
            }
            let pipeline = pipeline(refresh)?;
            tokio::select! {
                outcomes = run_schedule(&pipeline, Duration::from_secs(every_secs), runs) => {
                    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
                    info!(runs = outcomes.len(), failed, "Schedule finished");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping schedule");
                }
            }
        }
        Commands::Fetch { refresh, output } => {
            pipeline(refresh)?.fetch_to_file(&output).await?;
        }
    }

    Ok(())
}
