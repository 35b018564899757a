//! Worker configuration.

use std::path::PathBuf;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scratch directory for downloaded source photos
    pub work_dir: PathBuf,
    /// Output directory for generated thumbnails
    pub thumbs_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/photoq"),
            thumbs_dir: PathBuf::from("/var/lib/photoq/thumbs"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            thumbs_dir: std::env::var("WORKER_THUMBS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.thumbs_dir),
        }
    }
}
