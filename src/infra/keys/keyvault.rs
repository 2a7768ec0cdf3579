use std::sync::Arc;

use anyhow::{Context, Result, bail};
use azure_core::error::ErrorKind;
use azure_security_keyvault::SecretClient;
use reqwest::Url;

use super::{KeyStore, TokenCredential};

/// Resolves secrets from Azure Key Vault.
///
/// A [`SecretClient`] is opened per lookup with the injected credential and
/// reads the latest version of the secret, so the identity needs `secrets/get`.
pub struct KeyVaultKeyStore {
    vault_url: Url,
    credential: Arc<dyn TokenCredential>,
}

impl KeyVaultKeyStore {
    /// `vault_url` is the vault root, e.g. `https://myvault.vault.azure.net/`.
    pub fn new(vault_url: Url, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            vault_url,
            credential,
        }
    }

    fn client(&self) -> Result<SecretClient> {
        SecretClient::new(self.vault_url.as_str(), self.credential.clone())
            .with_context(|| format!("invalid Key Vault url '{}'", self.vault_url))
    }
}

// Vault names are alphanumerics and dashes; anything else could escape the path.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        bail!("invalid secret name '{name}'");
    }
    Ok(())
}

#[async_trait::async_trait]
impl KeyStore for KeyVaultKeyStore {
    /// Fetches the current version of secret `name` and returns its value.
    async fn get(&self, name: &str) -> Result<String> {
        check_name(name)?;

        match self.client()?.get(name).await {
            Ok(secret) => Ok(secret.value),
            Err(e) => {
                let detail = match e.kind() {
                    ErrorKind::HttpResponse { status, error_code } => format!(
                        "status {status:?} ({})",
                        error_code.as_deref().unwrap_or("unknown")
                    ),
                    _ => e.to_string(),
                };
                Err(anyhow::Error::new(e)
                    .context(format!("Key Vault lookup failed for '{name}': {detail}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_names() {
        assert!(check_name("SportsDataApiKey").is_ok());
        assert!(check_name("storage-conn-2").is_ok());
    }

    #[test]
    fn test_rejects_path_characters() {
        assert!(check_name("../keys/x").is_err());
        assert!(check_name("a/b").is_err());
        assert!(check_name("").is_err());
    }
}
