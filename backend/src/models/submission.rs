use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::ReviewStatus;
use std::sync::Arc;

/// Stored model for task submissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: i64,
    pub task_id: i64,
    #[serde(default)]
    pub task_name: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    /// Shared so snapshots of the document do not copy image data
    #[serde(default = "empty_photo")]
    pub photo: Arc<str>,
    pub reward: i64,
    pub status: ReviewStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Approval already delivered to the client
    #[serde(default)]
    pub processed: bool,
    /// Rejection already delivered to the client
    #[serde(default)]
    pub user_notified: bool,
}

fn empty_photo() -> Arc<str> {
    Arc::from("")
}

impl SubmissionRecord {
    pub fn is_pending_for(&self, user_id: &str, task_id: i64) -> bool {
        self.status.is_pending() && self.user_id == user_id && self.task_id == task_id
    }

    /// The photo can be large; only admin review screens need it.
    pub fn to_shared(&self, include_photo: bool) -> shared::Submission {
        shared::Submission {
            id: self.id,
            task_id: self.task_id,
            task_name: self.task_name.clone(),
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            photo: include_photo.then(|| self.photo.to_string()),
            reward: self.reward,
            status: self.status,
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
            rejection_reason: self.rejection_reason.clone(),
        }
    }
}
