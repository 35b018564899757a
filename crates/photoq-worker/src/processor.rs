//! Job-processing state machine.
//!
//! Each delivered identifier is driven through the status lifecycle:
//! the record is looked up, marked processing, run through the
//! fetch -> resize -> persist pipeline, and finally marked completed or
//! failed. The returned verdict feeds the queue's settlement protocol.

use std::path::PathBuf;

use tracing::{error, info, warn};
use uuid::Uuid;

use photoq_models::{PhotoRecord, PhotoStatus, THUMBNAIL_DIMENSIONS};
use photoq_queue::Verdict;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::ports::{SourceFetcher, StatusStore, ThumbnailResizer};

/// Processes one photo job end-to-end per delivery.
pub struct PhotoProcessor<S, F, R> {
    store: S,
    fetcher: F,
    resizer: R,
    config: WorkerConfig,
}

impl<S, F, R> PhotoProcessor<S, F, R>
where
    S: StatusStore,
    F: SourceFetcher,
    R: ThumbnailResizer,
{
    pub fn new(store: S, fetcher: F, resizer: R, config: WorkerConfig) -> Self {
        Self {
            store,
            fetcher,
            resizer,
            config,
        }
    }

    /// Handle one delivery; the verdict settles the delivery tag.
    ///
    /// An identifier with no record is rejected terminally, without
    /// touching job state: redelivering it can never help. A lookup that
    /// fails because the store is unreachable is rejected as retryable
    /// instead, since a later delivery may find the store back. Once the
    /// record is found, the delivery is acknowledged no matter how the
    /// pipeline ends: a failed pipeline is recorded in the store as
    /// `Failed`, and recovery happens out-of-band rather than through
    /// queue redelivery.
    pub async fn handle_delivery(&self, photo_id: Uuid) -> Verdict {
        let record = match self.store.get_by_id(photo_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%photo_id, "no record for delivered id, dropping");
                return Verdict::Drop;
            }
            Err(e) => {
                error!(%photo_id, "record lookup failed, will retry: {e}");
                return Verdict::Retry;
            }
        };

        match self.process(&record).await {
            Ok(()) => {
                info!(%photo_id, "photo processed");
            }
            Err(e) => {
                error!(%photo_id, "processing failed: {e}");
                if let Err(e) = self.store.set_status(photo_id, PhotoStatus::Failed).await {
                    error!(%photo_id, "could not mark photo failed: {e}");
                }
            }
        }

        Verdict::Completed
    }

    /// Run the pipeline, with the processing status persisted before the
    /// first side effect.
    async fn process(&self, record: &PhotoRecord) -> WorkerResult<()> {
        let paths = JobPaths::build(&self.config, record);

        self.store
            .set_status(record.uuid, PhotoStatus::Processing)
            .await?;

        self.fetcher.download(&record.url, &paths.download).await?;
        self.resizer
            .resize(THUMBNAIL_DIMENSIONS, &paths.download, &paths.thumbnail)
            .await?;
        self.store
            .add_thumbnail(
                record.uuid,
                THUMBNAIL_DIMENSIONS,
                &paths.thumbnail.to_string_lossy(),
            )
            .await?;

        self.store
            .set_status(record.uuid, PhotoStatus::Completed)
            .await?;

        Ok(())
    }
}

/// Scratch and output locations for one job.
struct JobPaths {
    download: PathBuf,
    thumbnail: PathBuf,
}

impl JobPaths {
    fn build(config: &WorkerConfig, record: &PhotoRecord) -> Self {
        let file_name = record
            .url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| record.uuid.to_string());

        Self {
            download: config.work_dir.join(file_name),
            thumbnail: config.thumbs_dir.join(format!("{}.jpeg", record.uuid)),
        }
    }
}
