use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::api_client::{Backend, HttpBackend};
use crate::batch::BatchOrchestrator;
use crate::config::Config;
use crate::prep::PrepCache;
use crate::storage::{FileStore, LocalStore};

/// Everything a screen needs, wired once at startup and shared by clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub prep: PrepCache,
    pub batch: BatchOrchestrator,
}

impl AppState {
    /// Wires the HTTP backend and the on-disk annotation store from `config`.
    pub async fn build(config: Config) -> Result<Self> {
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&config)?);
        info!("Backend client initialized ({})", config.api_base_url);

        let store = Arc::new(FileStore::open(&config.store_dir).await?);
        info!("Annotation store at {}", config.store_dir.display());

        Ok(Self::with_parts(config, backend, store))
    }

    pub fn with_parts(
        config: Config,
        backend: Arc<dyn Backend>,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        let prep = PrepCache::new(Arc::clone(&backend), store, config.sync_debounce());
        let batch = BatchOrchestrator::new(Arc::clone(&backend));
        Self {
            config,
            backend,
            prep,
            batch,
        }
    }
}
