//! Photo records and their status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A photo row as owned by the status store.
///
/// The worker mutates only the `status` field; everything else is written
/// once at submission time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhotoRecord {
    /// Unique photo identifier.
    pub uuid: Uuid,
    /// Source image URL.
    pub url: String,
    /// Current processing status.
    pub status: PhotoStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Photo processing status.
///
/// Transitions are strictly `Pending -> Processing -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, sqlx::Type)]
#[sqlx(type_name = "photo_status", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum PhotoStatus {
    /// Submitted, waiting for a worker.
    #[default]
    Pending,
    /// A worker is running the thumbnail pipeline.
    Processing,
    /// Thumbnail generated and persisted.
    Completed,
    /// Pipeline failed; recovery happens out-of-band.
    Failed,
}

impl PhotoStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoStatus::Pending => "pending",
            PhotoStatus::Processing => "processing",
            PhotoStatus::Completed => "completed",
            PhotoStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PhotoStatus::Completed | PhotoStatus::Failed)
    }

    /// Check whether moving to `next` is a legal lifecycle step.
    pub fn can_transition_to(&self, next: PhotoStatus) -> bool {
        matches!(
            (self, next),
            (PhotoStatus::Pending, PhotoStatus::Processing)
                | (PhotoStatus::Processing, PhotoStatus::Completed)
                | (PhotoStatus::Processing, PhotoStatus::Failed)
        )
    }
}

impl std::fmt::Display for PhotoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lifecycle() {
        assert!(PhotoStatus::Pending.can_transition_to(PhotoStatus::Processing));
        assert!(PhotoStatus::Processing.can_transition_to(PhotoStatus::Completed));
        assert!(PhotoStatus::Processing.can_transition_to(PhotoStatus::Failed));
    }

    #[test]
    fn test_no_shortcut_or_backward_transitions() {
        // Never pending -> completed directly
        assert!(!PhotoStatus::Pending.can_transition_to(PhotoStatus::Completed));
        assert!(!PhotoStatus::Pending.can_transition_to(PhotoStatus::Failed));
        // Never backward
        assert!(!PhotoStatus::Processing.can_transition_to(PhotoStatus::Pending));
        assert!(!PhotoStatus::Completed.can_transition_to(PhotoStatus::Processing));
        assert!(!PhotoStatus::Failed.can_transition_to(PhotoStatus::Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PhotoStatus::Pending.is_terminal());
        assert!(!PhotoStatus::Processing.is_terminal());
        assert!(PhotoStatus::Completed.is_terminal());
        assert!(PhotoStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(PhotoStatus::Processing.as_str(), "processing");
        assert_eq!(
            serde_json::to_string(&PhotoStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
