//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use nba_refresh::config::{BlobTarget, RefreshConfig};
use nba_refresh::infra::blob::{BlobConnector, BlobStore, ContainerStatus};
use nba_refresh::infra::keys::KeyStore;
use reqwest::Url;
use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

pub fn config(endpoint: &str) -> RefreshConfig {
    RefreshConfig {
        vault_name: "v1".to_string(),
        vault_url_template: "https://{vault}.vault.azure.net/".to_string(),
        endpoint: Url::parse(endpoint).unwrap(),
        target: BlobTarget::default(),
        fetch_timeout: Duration::from_secs(10),
    }
}

/// Secrets served from a map; unknown names fail like a missing vault secret.
pub struct StaticKeys {
    secrets: HashMap<String, String>,
    pub lookups: Mutex<Vec<String>>,
}

impl StaticKeys {
    pub fn new(pairs: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            secrets: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            lookups: Mutex::new(Vec::new()),
        })
    }

    pub fn standard() -> Arc<Self> {
        Self::new(&[
            ("SportsDataApiKey", "key123"),
            ("StorageConnectionString", "conn456"),
        ])
    }
}

#[async_trait]
impl KeyStore for StaticKeys {
    async fn get(&self, name: &str) -> Result<String> {
        self.lookups.lock().unwrap().push(name.to_string());
        match self.secrets.get(name) {
            Some(value) => Ok(value.clone()),
            None => bail!("SecretNotFound: {name}"),
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub blobs: Mutex<HashMap<(String, String), (Vec<u8>, String)>>,
    pub containers: Mutex<Vec<String>>,
    pub connections: Mutex<Vec<String>>,
    pub uploads: AtomicUsize,
    pub container_exists: bool,
    pub container_fails: bool,
    pub upload_fails: bool,
}

impl MemoryStorage {
    pub fn blob(&self, container: &str, path: &str) -> Option<String> {
        self.blobs
            .lock()
            .unwrap()
            .get(&(container.to_string(), path.to_string()))
            .map(|(body, _)| String::from_utf8(body.clone()).unwrap())
    }
}

pub struct MemoryConnector(pub Arc<MemoryStorage>);

impl MemoryConnector {
    pub fn new(storage: MemoryStorage) -> (Arc<Self>, Arc<MemoryStorage>) {
        let storage = Arc::new(storage);
        (Arc::new(Self(storage.clone())), storage)
    }
}

impl BlobConnector for MemoryConnector {
    fn connect(&self, connection_string: &str) -> Result<Box<dyn BlobStore>> {
        self.0
            .connections
            .lock()
            .unwrap()
            .push(connection_string.to_string());
        Ok(Box::new(MemoryStore(self.0.clone())))
    }
}

struct MemoryStore(Arc<MemoryStorage>);

#[async_trait]
impl BlobStore for MemoryStore {
    async fn ensure_container(&self, container: &str) -> Result<ContainerStatus> {
        if self.0.container_fails {
            bail!("AuthorizationPermissionMismatch");
        }
        self.0.containers.lock().unwrap().push(container.to_string());
        if self.0.container_exists {
            Ok(ContainerStatus::AlreadyExists)
        } else {
            Ok(ContainerStatus::Created)
        }
    }

    async fn put_blob(
        &self,
        container: &str,
        blob_path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()> {
        if self.0.upload_fails {
            bail!("ServerBusy");
        }
        self.0.uploads.fetch_add(1, Ordering::SeqCst);
        self.0.blobs.lock().unwrap().insert(
            (container.to_string(), blob_path.to_string()),
            (body.to_vec(), content_type.to_string()),
        );
        Ok(())
    }
}

/// Counts events at `ERROR` level.
#[derive(Clone, Default)]
pub struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Installs a thread-local subscriber that counts error lines until the guard drops.
pub fn capture_errors() -> (ErrorCounter, DefaultGuard) {
    let counter = ErrorCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    (counter, tracing::subscriber::set_default(subscriber))
}
