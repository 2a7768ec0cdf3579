//! Object storage: the [`BlobStore`] seam and its Azure Blob implementation.

mod azure;

pub use azure::AzureBlobStore;

use anyhow::Result;
use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    AlreadyExists,
}

/// Container and blob operations the archive writer needs.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Creates `container` unless it already exists.
    async fn ensure_container(&self, container: &str) -> Result<ContainerStatus>;

    /// Overwrites the blob at `blob_path` with `body` in a single request.
    async fn put_blob(
        &self,
        container: &str,
        blob_path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()>;
}

/// Opens a [`BlobStore`] from a connection string resolved at run time.
pub trait BlobConnector: Send + Sync {
    fn connect(&self, connection_string: &str) -> Result<Box<dyn BlobStore>>;
}

/// Connects to Azure Blob Storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct AzureBlobConnector;

impl BlobConnector for AzureBlobConnector {
    fn connect(&self, connection_string: &str) -> Result<Box<dyn BlobStore>> {
        Ok(Box::new(AzureBlobStore::from_connection_string(
            connection_string,
        )?))
    }
}
