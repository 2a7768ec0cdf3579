//! One refresh pass, and the timer loop that repeats it.
//!
//! Components hand back explicit results; this module decides what each one
//! means for the run and is the only place that logs a run's failure.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::archive::{ArchiveReport, ArchiveWriter};
use crate::config::{BlobTarget, RefreshConfig};
use crate::error::{RefreshError, Result};
use crate::fetch::FeedFetcher;
use crate::infra::blob::BlobConnector;
use crate::infra::keys::{KeyStore, KeyVaultKeyStore, TokenCredential};
use crate::output::write_jsonl_file;

#[derive(Debug)]
pub enum RefreshOutcome {
    Archived(ArchiveReport),
    /// The feed answered with an empty array.
    SkippedEmpty,
    FetchFailed(RefreshError),
    ArchiveFailed(RefreshError),
}

impl RefreshOutcome {
    /// `true` when nothing went wrong, including a legitimately empty feed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Archived(_) | Self::SkippedEmpty)
    }
}

/// Fetcher and writer wired to the same key store.
pub struct Pipeline {
    fetcher: FeedFetcher,
    writer: ArchiveWriter,
    target: BlobTarget,
}

impl Pipeline {
    pub fn new(
        config: &RefreshConfig,
        keys: Arc<dyn KeyStore>,
        connector: Arc<dyn BlobConnector>,
    ) -> Self {
        Self {
            fetcher: FeedFetcher::new(keys.clone(), config.endpoint.clone(), config.fetch_timeout),
            writer: ArchiveWriter::new(keys, connector),
            target: config.target.clone(),
        }
    }

    /// Resolves secrets from the configured Key Vault using `credential`.
    pub fn with_key_vault(
        config: &RefreshConfig,
        credential: Arc<dyn TokenCredential>,
        connector: Arc<dyn BlobConnector>,
    ) -> Result<Self> {
        let keys = KeyVaultKeyStore::new(config.vault_url()?, credential);
        Ok(Self::new(config, Arc::new(keys), connector))
    }

    /// Fetches the feed and writes it to `path` as JSONL instead of uploading.
    ///
    /// Like [`Pipeline::run`], a failure is logged once here before it is returned.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn fetch_to_file(&self, path: &Path) -> anyhow::Result<usize> {
        let snapshot = match self.fetcher.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Fetching feed failed; nothing written");
                return Err(e.into());
            }
        };
        if let Err(e) = write_jsonl_file(path, &snapshot) {
            error!(error = %format!("{e:#}"), "Writing snapshot failed");
            return Err(e);
        }
        Ok(snapshot.len())
    }

    /// Runs fetch then archive. Never fails; the outcome says what happened.
    #[tracing::instrument(skip_all, fields(blob = %self.target))]
    pub async fn run(&self) -> RefreshOutcome {
        info!("Refresh started");

        let snapshot = match self.fetcher.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Fetching feed failed; skipping upload");
                return RefreshOutcome::FetchFailed(e);
            }
        };

        if snapshot.is_empty() {
            warn!("No data fetched; skipping upload");
            return RefreshOutcome::SkippedEmpty;
        }

        match self.writer.archive(&snapshot, &self.target).await {
            Ok(report) => {
                info!(records = report.records, "Data lake refresh complete");
                RefreshOutcome::Archived(report)
            }
            Err(e) => {
                error!(error = %e, "Data lake refresh failed");
                RefreshOutcome::ArchiveFailed(e)
            }
        }
    }
}

/// Runs `pipeline` every `every`, `runs` times (0 = until the process stops).
///
/// Passes are sequential, so one process never has two refreshes writing the
/// same blob at once.
#[tracing::instrument(skip(pipeline, every), fields(every_secs = every.as_secs()))]
pub async fn run_schedule(pipeline: &Pipeline, every: Duration, runs: usize) -> Vec<RefreshOutcome> {
    let mut outcomes = Vec::new();
    let mut run_count = 0;

    if runs == 0 {
        info!("Refreshing indefinitely. Press Ctrl+C to stop.");
    }

    loop {
        if runs > 0 && run_count >= runs {
            break;
        }
        run_count += 1;

        info!(
            run = run_count,
            total = if runs == 0 { None } else { Some(runs) },
            "Starting scheduled refresh"
        );
        let outcome = pipeline.run().await;
        // Unbounded schedules would otherwise grow without limit.
        if runs > 0 {
            outcomes.push(outcome);
        }

        if runs == 0 || run_count < runs {
            info!(every_secs = every.as_secs(), "Waiting before next refresh");
            tokio::time::sleep(every).await;
        }
    }

    outcomes
}
