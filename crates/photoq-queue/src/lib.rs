//! Resilient photo job queue over Redis Streams.
//!
//! This crate provides:
//! - A managed broker connection with serialized reconnect
//! - A bounded retry primitive applied to every broker operation
//! - Publish and a run-until-cancelled consume loop with ack/nack and
//!   reclamation of deliveries stranded by crashed consumers

pub mod connection;
pub mod error;
pub mod queue;
pub mod retry;

pub use connection::ManagedConnection;
pub use error::{QueueError, QueueResult};
pub use queue::{NackPolicy, PhotoQueue, QueueConfig, Verdict};
pub use retry::{run_with_retry, RetryPolicy};
