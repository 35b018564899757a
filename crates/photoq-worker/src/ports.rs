//! Collaborator seams consumed by the job processor.
//!
//! The processor only sees these traits; the concrete store, fetcher, and
//! resizer adapt onto them so the state machine is testable in isolation.

use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use photoq_media::{HttpFetcher, MediaResult, ThumbnailGenerator};
use photoq_models::{Dimensions, PhotoRecord, PhotoStatus};
use photoq_store::{PhotoStore, StoreResult};

/// Job and thumbnail persistence.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<PhotoRecord>>;
    async fn set_status(&self, id: Uuid, status: PhotoStatus) -> StoreResult<()>;
    async fn add_thumbnail(&self, id: Uuid, dimensions: Dimensions, path: &str) -> StoreResult<()>;
}

#[async_trait]
impl StatusStore for PhotoStore {
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<PhotoRecord>> {
        PhotoStore::get_by_id(self, id).await
    }

    async fn set_status(&self, id: Uuid, status: PhotoStatus) -> StoreResult<()> {
        PhotoStore::set_status(self, id, status).await
    }

    async fn add_thumbnail(&self, id: Uuid, dimensions: Dimensions, path: &str) -> StoreResult<()> {
        PhotoStore::add_thumbnail(self, id, dimensions, path).await
    }
}

/// Source file retrieval.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> MediaResult<()>;
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn download(&self, url: &str, dest: &Path) -> MediaResult<()> {
        HttpFetcher::download(self, url, dest).await
    }
}

/// Thumbnail generation.
#[async_trait]
pub trait ThumbnailResizer: Send + Sync {
    async fn resize(&self, dimensions: Dimensions, input: &Path, output: &Path) -> MediaResult<()>;
}

#[async_trait]
impl ThumbnailResizer for ThumbnailGenerator {
    async fn resize(&self, dimensions: Dimensions, input: &Path, output: &Path) -> MediaResult<()> {
        ThumbnailGenerator::resize(self, dimensions, input, output).await
    }
}
