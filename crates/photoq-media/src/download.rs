//! Source photo download.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// HTTP fetcher for source photos.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch `url` into `dest`, streaming the body chunk by chunk so a
    /// large source photo is never held in memory whole.
    ///
    /// Any network problem, non-success status, or filesystem error fails
    /// the download.
    pub async fn download(&self, url: &str, dest: &Path) -> MediaResult<()> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::download_failed(format!(
                "{url} returned {status}"
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(url, dest = %dest.display(), size = written, "downloaded source photo");
        Ok(())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}
