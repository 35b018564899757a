//! Source photo download and thumbnail generation.

pub mod download;
pub mod error;
pub mod resize;

pub use download::HttpFetcher;
pub use error::{MediaError, MediaResult};
pub use resize::ThumbnailGenerator;
