//! Shared application state.

use std::sync::Arc;

use tracing::info;

use photoq_queue::PhotoQueue;
use photoq_store::PhotoStore;

use crate::config::ApiConfig;

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub store: Arc<PhotoStore>,
    pub queue: Arc<PhotoQueue>,
}

impl AppState {
    /// Build state from environment configuration, connecting to the
    /// store and the broker and ensuring the queue exists.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = ApiConfig::from_env();

        let store = PhotoStore::from_env().await?;
        info!("connected to photo store");

        let queue = PhotoQueue::from_env().await?;
        queue.declare().await?;
        info!("connected to job queue");

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            queue: Arc::new(queue),
        })
    }
}
