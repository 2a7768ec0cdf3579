//! Secret resolution.
//!
//! [`KeyStore`] is the async trait for resolving a secret name into its plaintext value.
//! [`KeyVaultKeyStore`] implements [`KeyStore`] against Azure Key Vault, authenticating
//! with whatever [`TokenCredential`] the caller injects.

mod keyvault;

pub use azure_core::auth::TokenCredential;
pub use keyvault::KeyVaultKeyStore;

use anyhow::Result;

/// Resolves a secret name into its current plaintext value.
///
/// Nothing is cached: every call goes back to the backing store.
#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<String>;
}
