//! Photo thumbnail worker.
//!
//! This crate provides:
//! - Trait seams for the store, fetcher, and resizer collaborators
//! - The job-processing state machine driving each delivery through
//!   pending -> processing -> completed | failed
//! - The consumer binary wiring the processor into the queue

pub mod config;
pub mod error;
pub mod ports;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use ports::{SourceFetcher, StatusStore, ThumbnailResizer};
pub use processor::PhotoProcessor;
