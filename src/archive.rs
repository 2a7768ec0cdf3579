//! Writes feed snapshots to blob storage as newline-delimited JSON.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::{BlobTarget, STORAGE_SECRET};
use crate::error::{RefreshError, Result};
use crate::infra::blob::{BlobConnector, ContainerStatus};
use crate::infra::keys::KeyStore;
use crate::output::encode_jsonl;
use crate::snapshot::FeedSnapshot;

pub const JSONL_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub records: usize,
    pub bytes: usize,
    pub target: BlobTarget,
    /// `None` when the container check failed and the upload went ahead anyway.
    pub container: Option<ContainerStatus>,
}

pub struct ArchiveWriter {
    keys: Arc<dyn KeyStore>,
    connector: Arc<dyn BlobConnector>,
}

impl ArchiveWriter {
    pub fn new(keys: Arc<dyn KeyStore>, connector: Arc<dyn BlobConnector>) -> Self {
        Self { keys, connector }
    }

    /// Overwrites `target` with the whole snapshot in one upload.
    ///
    /// A failed container check is logged as a warning and does not stop the
    /// upload; every other failure is returned.
    #[tracing::instrument(skip_all, fields(records = snapshot.len(), blob = %target))]
    pub async fn archive(&self, snapshot: &FeedSnapshot, target: &BlobTarget) -> Result<ArchiveReport> {
        let connection_string = self
            .keys
            .get(STORAGE_SECRET)
            .await
            .map_err(|e| RefreshError::secret(STORAGE_SECRET, e))?;

        let store = self
            .connector
            .connect(&connection_string)
            .map_err(|e| RefreshError::UploadFailed(format!("{e:#}")))?;

        let container = match store.ensure_container(&target.container).await {
            Ok(status) => {
                debug!(container = %target.container, ?status, "Container ready");
                Some(status)
            }
            Err(e) => {
                let err = RefreshError::ContainerCreateFailed(format!("{e:#}"));
                warn!(error = %err, "Container check failed, attempting upload anyway");
                None
            }
        };

        let payload = encode_jsonl(snapshot.records())
            .map_err(|e| RefreshError::UploadFailed(format!("encoding records: {e}")))?;
        let bytes = payload.len();

        store
            .put_blob(
                &target.container,
                &target.blob_path,
                Bytes::from(payload),
                JSONL_CONTENT_TYPE,
            )
            .await
            .map_err(|e| RefreshError::UploadFailed(format!("{e:#}")))?;

        info!(records = snapshot.len(), bytes, "Uploaded records to {target}");

        Ok(ArchiveReport {
            records: snapshot.len(),
            bytes,
            target: target.clone(),
            container,
        })
    }
}
