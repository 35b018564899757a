//! Thumbnail records and target dimensions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed thumbnail output size for the pipeline.
pub const THUMBNAIL_DIMENSIONS: Dimensions = Dimensions {
    width: 320,
    height: 320,
};

/// Bounding box for a generated thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A persisted thumbnail, unique per (photo, width, height).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThumbnailRecord {
    /// Photo this thumbnail belongs to.
    pub photo_uuid: Uuid,
    /// Thumbnail width in pixels.
    pub width: i32,
    /// Thumbnail height in pixels.
    pub height: i32,
    /// Storage path of the generated file.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dimensions() {
        assert_eq!(THUMBNAIL_DIMENSIONS.width, 320);
        assert_eq!(THUMBNAIL_DIMENSIONS.height, 320);
        assert_eq!(THUMBNAIL_DIMENSIONS.to_string(), "320x320");
    }
}
