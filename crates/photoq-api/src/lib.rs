//! Axum HTTP API for photo submission.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiJson, ApiResult};
pub use routes::create_router;
pub use state::AppState;
