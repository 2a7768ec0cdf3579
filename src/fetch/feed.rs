use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info};

use super::auth::ApiKey;
use super::{BasicClient, HttpClient, fetch_bytes};
use crate::config::{API_KEY_SECRET, SUBSCRIPTION_KEY_HEADER};
use crate::error::{RefreshError, Result};
use crate::infra::keys::KeyStore;
use crate::snapshot::FeedSnapshot;

/// Fetches the player feed using the subscription key held in the vault.
///
/// `fetch` reports failures as [`RefreshError`] instead of logging them;
/// an empty JSON array comes back as an empty [`FeedSnapshot`], not an
/// error.
pub struct FeedFetcher {
    keys: Arc<dyn KeyStore>,
    endpoint: Url,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(keys: Arc<dyn KeyStore>, endpoint: Url, timeout: Duration) -> Self {
        Self {
            keys,
            endpoint,
            timeout,
        }
    }

    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn fetch(&self) -> Result<FeedSnapshot> {
        let key = self
            .keys
            .get(API_KEY_SECRET)
            .await
            .map_err(|e| RefreshError::secret(API_KEY_SECRET, e))?;

        let base = BasicClient::with_timeout(self.timeout)
            .map_err(|e| RefreshError::FetchFailed(format!("building HTTP client: {e}")))?;
        let client = ApiKey::new(base, SUBSCRIPTION_KEY_HEADER, &key)
            .map_err(|e| RefreshError::FetchFailed(e.to_string()))?;

        self.fetch_with(&client).await
    }

    /// Runs the request through a caller-supplied client, which must already
    /// carry whatever authentication the endpoint needs.
    pub async fn fetch_with<C: HttpClient>(&self, client: &C) -> Result<FeedSnapshot> {
        let started = std::time::Instant::now();
        let bytes = fetch_bytes(client, &self.endpoint)
            .await
            .map_err(|e| RefreshError::FetchFailed(format!("{e:#}")))?;
        debug!(bytes = bytes.len(), "Feed bytes received, parsing");

        let snapshot = FeedSnapshot::from_json_slice(&bytes).map_err(|e| {
            RefreshError::FetchFailed(format!("response body is not a JSON array: {e}"))
        })?;

        info!(
            records = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Feed fetched"
        );
        Ok(snapshot)
    }
}
