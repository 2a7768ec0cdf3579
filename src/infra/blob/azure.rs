use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_storage::{CloudLocation, ConnectionString};
use azure_storage_blobs::prelude::{BlobServiceClient, ClientBuilder};
use bytes::Bytes;
use tracing::debug;

use super::{BlobStore, ContainerStatus};

/// Blob service client built from a storage account connection string.
pub struct AzureBlobStore {
    service: BlobServiceClient,
}

impl AzureBlobStore {
    pub fn new(service: BlobServiceClient) -> Self {
        Self { service }
    }

    /// Accepts account key or SAS connection strings, with an optional
    /// `BlobEndpoint` or `EndpointSuffix`, and `UseDevelopmentStorage=true`.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let parsed = ConnectionString::new(connection_string)
            .context("invalid storage connection string")?;

        if parsed.use_development_storage == Some(true) {
            return Ok(Self::new(ClientBuilder::emulator().blob_service_client()));
        }

        let credentials = parsed
            .storage_credentials()
            .context("storage connection string has no usable credentials")?;
        let account = parsed.account_name.unwrap_or_default().to_string();
        let location = match (parsed.blob_endpoint, parsed.endpoint_suffix) {
            (Some(endpoint), _) => CloudLocation::Custom {
                account,
                uri: endpoint.trim_end_matches('/').to_string(),
            },
            (None, Some(suffix)) => CloudLocation::Custom {
                uri: format!("https://{account}.blob.{suffix}"),
                account,
            },
            (None, None) => CloudLocation::Public { account },
        };

        Ok(Self::new(
            ClientBuilder::with_location(location, credentials).blob_service_client(),
        ))
    }
}

fn error_code(err: &azure_core::Error) -> Option<&str> {
    match err.kind() {
        ErrorKind::HttpResponse { error_code, .. } => error_code.as_deref(),
        _ => None,
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<ContainerStatus> {
        debug!(container, "Creating container");
        match self.service.container_client(container).create().await {
            Ok(_) => Ok(ContainerStatus::Created),
            Err(e) if error_code(&e) == Some("ContainerAlreadyExists") => {
                Ok(ContainerStatus::AlreadyExists)
            }
            Err(e) => {
                let code = error_code(&e).unwrap_or("unknown").to_string();
                Err(anyhow!(e).context(format!("Create container '{container}' failed ({code})")))
            }
        }
    }

    async fn put_blob(
        &self,
        container: &str,
        blob_path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()> {
        debug!(container, blob_path, bytes = body.len(), "Uploading block blob");
        self.service
            .container_client(container)
            .blob_client(blob_path)
            .put_block_blob(body)
            .content_type(content_type.to_owned())
            .await
            .map_err(|e| {
                let code = error_code(&e).unwrap_or("unknown").to_string();
                anyhow!(e).context(format!("Put blob '{container}/{blob_path}' failed ({code})"))
            })?;
        Ok(())
    }
}
