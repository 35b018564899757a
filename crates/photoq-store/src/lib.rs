//! PostgreSQL-backed photo status store.
//!
//! Owns the photo and thumbnail rows. The worker drives status updates
//! through it; the API reads pending records from it.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::PhotoStore;
