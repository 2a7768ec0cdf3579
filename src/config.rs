//! Runtime configuration for a refresh run.
//!
//! Every value can come from a CLI flag or the matching environment
//! variable (a `.env` file is loaded by `main` before parsing).

use std::time::Duration;

use clap::Args;
use reqwest::Url;
use tracing::info;

use crate::error::{RefreshError, Result};

/// Vault used when neither `--vault-name` nor `KEY_VAULT_NAME` is set.
pub const DEFAULT_VAULT_NAME: &str = "mydatalakekeyvault48";
/// `{vault}` is replaced by the vault identifier.
pub const DEFAULT_VAULT_URL_TEMPLATE: &str = "https://{vault}.vault.azure.net/";
pub const DEFAULT_CONTAINER: &str = "nba-datalake";
pub const DEFAULT_BLOB_PATH: &str = "raw-data/nba_player_data.jsonl";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Vault secret holding the feed subscription key.
pub const API_KEY_SECRET: &str = "SportsDataApiKey";
/// Vault secret holding the storage account connection string.
pub const STORAGE_SECRET: &str = "StorageConnectionString";

/// Header the feed provider expects the subscription key in.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    /// Key Vault name (defaults to mydatalakekeyvault48)
    #[arg(long, env = "KEY_VAULT_NAME")]
    pub vault_name: Option<String>,

    /// Vault endpoint template; `{vault}` is replaced by the vault name
    #[arg(long, env = "KEY_VAULT_URL_TEMPLATE", default_value = DEFAULT_VAULT_URL_TEMPLATE)]
    pub vault_url_template: String,

    /// Feed endpoint URL
    #[arg(long, env = "NBA_ENDPOINT")]
    pub endpoint: String,

    /// Destination blob container
    #[arg(long, env = "NBA_CONTAINER", default_value = DEFAULT_CONTAINER)]
    pub container: String,

    /// Destination blob path inside the container
    #[arg(long, env = "NBA_BLOB_PATH", default_value = DEFAULT_BLOB_PATH)]
    pub blob_path: String,

    /// Timeout for the feed request, in seconds
    #[arg(long, env = "NBA_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Where a snapshot gets written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobTarget {
    pub container: String,
    pub blob_path: String,
}

impl Default for BlobTarget {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            blob_path: DEFAULT_BLOB_PATH.to_string(),
        }
    }
}

impl std::fmt::Display for BlobTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.blob_path)
    }
}

/// Validated configuration shared by every entry point.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub vault_name: String,
    pub vault_url_template: String,
    pub endpoint: Url,
    pub target: BlobTarget,
    pub fetch_timeout: Duration,
}

impl RefreshConfig {
    /// Builds the vault endpoint for the configured vault.
    pub fn vault_url(&self) -> Result<Url> {
        vault_url(&self.vault_url_template, &self.vault_name)
    }
}

impl TryFrom<RefreshArgs> for RefreshConfig {
    type Error = RefreshError;

    fn try_from(args: RefreshArgs) -> Result<Self> {
        let vault_name = match args.vault_name.filter(|v| !v.trim().is_empty()) {
            Some(name) => name,
            None => {
                info!(vault = DEFAULT_VAULT_NAME, "KEY_VAULT_NAME not set, using default vault");
                DEFAULT_VAULT_NAME.to_string()
            }
        };

        let endpoint = Url::parse(&args.endpoint)
            .map_err(|e| RefreshError::Config(format!("invalid endpoint '{}': {e}", args.endpoint)))?;

        if args.timeout_secs == 0 {
            return Err(RefreshError::Config("timeout must be at least 1 second".to_string()));
        }

        let config = Self {
            vault_name,
            vault_url_template: args.vault_url_template,
            endpoint,
            target: BlobTarget {
                container: args.container,
                blob_path: args.blob_path,
            },
            fetch_timeout: Duration::from_secs(args.timeout_secs),
        };

        // Fail at startup rather than at the first secret lookup.
        config.vault_url()?;
        Ok(config)
    }
}

/// Expands `template` with `vault` and ensures the result ends with `/` so
/// relative paths like `secrets/<name>` join underneath it.
pub fn vault_url(template: &str, vault: &str) -> Result<Url> {
    let mut expanded = template.replace("{vault}", vault);
    if !expanded.ends_with('/') {
        expanded.push('/');
    }
    Url::parse(&expanded)
        .map_err(|e| RefreshError::Config(format!("invalid vault url '{expanded}': {e}")))
}
