//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Store error: {0}")]
    Store(#[from] photoq_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] photoq_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] photoq_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
