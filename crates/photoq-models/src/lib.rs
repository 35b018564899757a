//! Shared data models for the PhotoQ pipeline.

pub mod photo;
pub mod thumbnail;

pub use photo::{PhotoRecord, PhotoStatus};
pub use thumbnail::{Dimensions, ThumbnailRecord, THUMBNAIL_DIMENSIONS};
