//! Task submission workflow.
//!
//! A submission is created `pending` and moves exactly once, to `approved` or
//! `rejected`. Approval credits the user in the same write that changes the
//! status, so the reward can never be paid twice. Rejection is soft: the user
//! may submit the same task again. Approval is final: the task id joins the
//! user's completed set and further submissions for it are refused.
//!
//! Clients learn about decisions by polling. Each decision is handed out once;
//! the `processed` / `user_notified` flags record that it was delivered.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::models::{next_id, Document, SubmissionRecord, UserRecord};
use crate::services::users::{self, UserError};
use crate::store::{Store, StoreError};
use shared::{
    ApprovedTaskEvent, RejectedTaskEvent, ReviewStatus, Submission, SubmitTaskRequest, Task,
    TaskWithStatus,
};

pub const DEFAULT_REJECTION_REASON: &str = "Попробуйте ещё раз";

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Task not found")]
    TaskNotFound,
    #[error("Submission not found")]
    NotFound,
    #[error("Task already completed")]
    AlreadyCompleted,
    #[error("Task is already waiting for review")]
    AlreadyPending,
    #[error("Submission is already {}", .0.as_str())]
    InvalidTransition(ReviewStatus),
    #[error("{0}")]
    Validation(String),
    #[error("User error: {0}")]
    UserError(#[from] UserError),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

/// Per-user projection of a task; computed, never stored.
pub fn derive_task_view(
    user: Option<&UserRecord>,
    user_id: &str,
    task: &Task,
    submissions: &[SubmissionRecord],
) -> TaskWithStatus {
    let user_completed = user.map(|u| u.has_completed(task.id)).unwrap_or(false);
    let pending_approval = submissions.iter().any(|s| s.is_pending_for(user_id, task.id));

    TaskWithStatus {
        task: task.clone(),
        user_completed,
        pending_approval,
        can_submit: !user_completed && !pending_approval,
    }
}

pub fn list_tasks_for_user(store: &Store, user_id: &str) -> Result<Vec<TaskWithStatus>, SubmissionError> {
    Ok(store.read(|doc| {
        let user = doc.users.get(user_id);
        doc.tasks
            .iter()
            .filter(|t| t.active)
            .map(|t| derive_task_view(user, user_id, t, &doc.submissions))
            .collect()
    })?)
}

pub fn submit(store: &Store, request: &SubmitTaskRequest) -> Result<Submission, SubmissionError> {
    if request.photo.trim().is_empty() {
        return Err(SubmissionError::Validation("Photo is required".to_string()));
    }

    let submission = store.write(|doc| {
        let now = Utc::now();
        let user_id = request.user_id.as_str();

        let task = doc
            .task(request.task_id)
            .filter(|t| t.active)
            .cloned()
            .ok_or(SubmissionError::TaskNotFound)?;

        if doc.users.get(user_id).map(|u| u.has_completed(task.id)).unwrap_or(false) {
            return Err(SubmissionError::AlreadyCompleted);
        }
        if doc.submissions.iter().any(|s| s.is_pending_for(user_id, task.id)) {
            return Err(SubmissionError::AlreadyPending);
        }

        let user = users::upsert_user(
            doc,
            user_id,
            request.user_name.as_deref(),
            request.user_contact.as_deref(),
            now,
        )?;
        let user_name = user.display_name.clone();

        let record = SubmissionRecord {
            id: next_id(doc.submissions.iter().map(|s| s.id)),
            task_id: task.id,
            task_name: task.name,
            user_id: user_id.to_string(),
            user_name,
            photo: Arc::from(request.photo.as_str()),
            reward: task.reward,
            status: ReviewStatus::Pending,
            submitted_at: now,
            reviewed_at: None,
            rejection_reason: None,
            processed: false,
            user_notified: false,
        };
        let submission = record.to_shared(false);
        doc.submissions.push(record);

        Ok::<_, SubmissionError>(submission)
    })?;

    log::info!(
        "User {} submitted task {} for review (submission {})",
        submission.user_id,
        submission.task_id,
        submission.id
    );
    Ok(submission)
}

fn pending_submission(
    doc: &mut Document,
    submission_id: i64,
    next: ReviewStatus,
) -> Result<&mut SubmissionRecord, SubmissionError> {
    let submission = doc
        .submissions
        .iter_mut()
        .find(|s| s.id == submission_id)
        .ok_or(SubmissionError::NotFound)?;

    if !submission.status.can_transition_to(next) {
        return Err(SubmissionError::InvalidTransition(submission.status));
    }

    Ok(submission)
}

pub fn approve(store: &Store, submission_id: i64) -> Result<Submission, SubmissionError> {
    let submission = store.write(|doc| {
        let now = Utc::now();
        let submission = pending_submission(doc, submission_id, ReviewStatus::Approved)?;
        submission.status = ReviewStatus::Approved;
        submission.reviewed_at = Some(now);
        submission.processed = false;
        let shared = submission.to_shared(false);

        users::record_approval_effects(doc, &shared.user_id, shared.task_id, shared.reward, now)?;

        Ok::<_, SubmissionError>(shared)
    })?;

    log::info!(
        "Approved submission {}: user {} earned {}",
        submission.id,
        submission.user_id,
        submission.reward
    );
    Ok(submission)
}

pub fn reject(store: &Store, submission_id: i64, reason: Option<&str>) -> Result<Submission, SubmissionError> {
    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REJECTION_REASON)
        .to_string();

    let submission = store.write(|doc| {
        let submission = pending_submission(doc, submission_id, ReviewStatus::Rejected)?;
        submission.status = ReviewStatus::Rejected;
        submission.reviewed_at = Some(Utc::now());
        submission.rejection_reason = Some(reason);
        submission.user_notified = false;

        Ok::<_, SubmissionError>(submission.to_shared(false))
    })?;

    log::info!("Rejected submission {} of user {}", submission.id, submission.user_id);
    Ok(submission)
}

fn is_undelivered_approval(s: &SubmissionRecord, user_id: &str) -> bool {
    s.user_id == user_id && s.status == ReviewStatus::Approved && !s.processed
}

fn is_undelivered_rejection(s: &SubmissionRecord, user_id: &str) -> bool {
    s.user_id == user_id && s.status == ReviewStatus::Rejected && !s.user_notified
}

/// Hand out approvals the user has not seen yet. Balance was already credited
/// on approval; this only notifies.
pub fn poll_approved_events(store: &Store, user_id: &str) -> Result<Vec<ApprovedTaskEvent>, SubmissionError> {
    let any = store.read(|doc| doc.submissions.iter().any(|s| is_undelivered_approval(s, user_id)))?;
    if !any {
        return Ok(Vec::new());
    }

    store.write(|doc| {
        let events = doc
            .submissions
            .iter_mut()
            .filter(|s| is_undelivered_approval(s, user_id))
            .map(|s| {
                s.processed = true;
                ApprovedTaskEvent {
                    submission_id: s.id,
                    task_id: s.task_id,
                    task_name: s.task_name.clone(),
                    reward: s.reward,
                    reviewed_at: s.reviewed_at,
                }
            })
            .collect();
        Ok::<_, SubmissionError>(events)
    })
}

pub fn poll_rejected_events(store: &Store, user_id: &str) -> Result<Vec<RejectedTaskEvent>, SubmissionError> {
    let any = store.read(|doc| doc.submissions.iter().any(|s| is_undelivered_rejection(s, user_id)))?;
    if !any {
        return Ok(Vec::new());
    }

    store.write(|doc| {
        let events = doc
            .submissions
            .iter_mut()
            .filter(|s| is_undelivered_rejection(s, user_id))
            .map(|s| {
                s.user_notified = true;
                RejectedTaskEvent {
                    submission_id: s.id,
                    task_id: s.task_id,
                    task_name: s.task_name.clone(),
                    reason: s
                        .rejection_reason
                        .clone()
                        .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
                    reviewed_at: s.reviewed_at,
                }
            })
            .collect();
        Ok::<_, SubmissionError>(events)
    })
}

/// Admin review queue, newest first, photos included.
pub fn list_submissions(
    store: &Store,
    status: Option<ReviewStatus>,
) -> Result<Vec<Submission>, SubmissionError> {
    Ok(store.read(|doc| {
        let mut submissions: Vec<Submission> = doc
            .submissions
            .iter()
            .filter(|s| status.map_or(true, |status| s.status == status))
            .map(|s| s.to_shared(true))
            .collect();
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        submissions
    })?)
}
