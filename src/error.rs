//! Error kinds produced by the refresh pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefreshError {
    /// The vault could not be reached, refused the credential, or has no such secret.
    #[error("secret '{name}' unavailable: {reason}")]
    SecretUnavailable { name: String, reason: String },

    #[error("fetching feed failed: {0}")]
    FetchFailed(String),

    #[error("upload to blob storage failed: {0}")]
    UploadFailed(String),

    /// Non-fatal: the upload is still attempted after this.
    #[error("creating container failed: {0}")]
    ContainerCreateFailed(String),

    #[error("config error: {0}")]
    Config(String),
}

impl RefreshError {
    pub(crate) fn secret(name: &str, err: anyhow::Error) -> Self {
        Self::SecretUnavailable {
            name: name.to_string(),
            reason: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, RefreshError>;
