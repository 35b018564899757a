//! Thumbnail generation.

use std::path::Path;

use tracing::debug;

use photoq_models::Dimensions;

use crate::error::{MediaError, MediaResult};

/// Generates bounded JPEG thumbnails from source photos.
pub struct ThumbnailGenerator;

impl ThumbnailGenerator {
    /// Resize `input` into a JPEG thumbnail bounded by `dimensions`,
    /// preserving aspect ratio. Fails on undecodable input or an
    /// unwritable output path.
    pub async fn resize(
        &self,
        dimensions: Dimensions,
        input: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        // Decode/encode is CPU-bound; keep it off the runtime threads
        tokio::task::spawn_blocking(move || -> MediaResult<()> {
            let img = image::open(&input)?;
            let thumb = img.thumbnail(dimensions.width, dimensions.height);
            thumb
                .to_rgb8()
                .save_with_format(&output, image::ImageFormat::Jpeg)?;

            debug!(
                input = %input.display(),
                output = %output.display(),
                %dimensions,
                "generated thumbnail"
            );
            Ok(())
        })
        .await
        .map_err(|e| MediaError::internal(format!("resize task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resize_stays_within_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("source.png");
        let output = dir.path().join("thumb.jpeg");

        image::RgbImage::new(64, 48).save(&input).unwrap();

        ThumbnailGenerator
            .resize(
                Dimensions {
                    width: 32,
                    height: 32,
                },
                &input,
                &output,
            )
            .await
            .unwrap();

        let thumb = image::open(&output).unwrap();
        assert!(thumb.width() <= 32);
        assert!(thumb.height() <= 32);
    }

    #[tokio::test]
    async fn test_resize_preserves_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("wide.png");
        let output = dir.path().join("thumb.jpeg");

        image::RgbImage::new(100, 50).save(&input).unwrap();

        ThumbnailGenerator
            .resize(
                Dimensions {
                    width: 50,
                    height: 50,
                },
                &input,
                &output,
            )
            .await
            .unwrap();

        let thumb = image::open(&output).unwrap();
        assert_eq!(thumb.width(), 50);
        assert_eq!(thumb.height(), 25);
    }

    #[tokio::test]
    async fn test_resize_fails_on_undecodable_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("garbage.png");
        let output = dir.path().join("thumb.jpeg");

        tokio::fs::write(&input, b"not an image").await.unwrap();

        let result = ThumbnailGenerator
            .resize(
                Dimensions {
                    width: 32,
                    height: 32,
                },
                &input,
                &output,
            )
            .await;

        assert!(matches!(result, Err(MediaError::Image(_))));
    }
}
