//! Application state

use crate::config::GatewayConfig;
use blobgate_store::{
    connect, MemoryConnector, MemoryObjectStore, ObjectStore, S3Connector, StoreError,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Bucket name used by the in-memory store when none is configured
const MEMORY_BUCKET: &str = "blobgate";

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Object store, created once at startup and shared by every request
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    /// Connect to the configured backend and build the state
    pub async fn new(config: GatewayConfig) -> Result<Self, StoreError> {
        let store = Self::connect_store(&config).await?;
        Ok(Self::with_store(config, store))
    }

    /// Build the state around an already connected store
    pub fn with_store(config: GatewayConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    async fn connect_store(config: &GatewayConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
        let policy = config.retry_policy();

        if config.use_memory_store {
            warn!("Using in-memory object store (data will not persist)");
            let bucket = if config.backend.bucket.is_empty() {
                MEMORY_BUCKET
            } else {
                config.backend.bucket.as_str()
            };
            let connector = MemoryConnector::new(MemoryObjectStore::new(bucket));
            return Ok(Arc::new(connect(&connector, &policy).await?));
        }

        let settings = config.backend.s3_settings();
        if !settings.tls {
            warn!("TLS to the object store is disabled");
        }
        let connector = S3Connector::new(settings);
        let store = connect(&connector, &policy).await?;
        info!(
            host = %config.backend.host,
            bucket = %config.backend.bucket,
            "Connected to object store"
        );
        Ok(Arc::new(store))
    }
}
