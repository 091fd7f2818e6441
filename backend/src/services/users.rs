use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Document, UserRecord};
use crate::store::{Store, StoreError};
use shared::{Blob, ReviewStatus, UpdateUserStateRequest, User, UserDetail, UserState};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

/// Create the user if absent, otherwise refresh activity and identity fields.
/// Works on a document the caller already holds for writing.
pub fn upsert_user<'a>(
    doc: &'a mut Document,
    user_id: &str,
    display_name: Option<&str>,
    contact: Option<&str>,
    now: DateTime<Utc>,
) -> Result<&'a mut UserRecord, UserError> {
    if user_id.trim().is_empty() {
        return Err(UserError::Validation("User ID is required".to_string()));
    }

    let display_name = non_empty(display_name);
    let contact = non_empty(contact);

    let user = doc
        .users
        .entry(user_id.to_string())
        .or_insert_with(|| {
            log::info!("Registering new user {}", user_id);
            UserRecord::new(display_name.clone(), contact.clone(), now)
        });

    user.last_active_at = now;
    if display_name.is_some() {
        user.display_name = display_name;
    }
    if contact.is_some() {
        user.contact = contact;
    }

    Ok(user)
}

pub fn ensure_user(
    store: &Store,
    user_id: &str,
    display_name: Option<&str>,
    contact: Option<&str>,
) -> Result<User, UserError> {
    store.write(|doc| {
        let user = upsert_user(doc, user_id, display_name, contact, Utc::now())?;
        Ok::<_, UserError>(user.to_shared(user_id))
    })
}

/// Unknown users simply have nothing yet.
pub fn get_balance(store: &Store, user_id: &str) -> Result<i64, UserError> {
    Ok(store.read(|doc| doc.balance_of(user_id))?)
}

pub fn set_balance(store: &Store, user_id: &str, balance: i64) -> Result<User, UserError> {
    if balance < 0 {
        return Err(UserError::Validation("Balance cannot be negative".to_string()));
    }

    let user = store.write(|doc| {
        let user = doc.users.get_mut(user_id).ok_or(UserError::NotFound)?;
        user.balance = balance;
        Ok::<_, UserError>(user.to_shared(user_id))
    })?;

    log::info!("Balance of user {} set to {}", user_id, balance);
    Ok(user)
}

/// Zero the user and delete everything they own. Irreversible.
pub fn reset_user(store: &Store, user_id: &str) -> Result<User, UserError> {
    let user = store.write(|doc| {
        let now = Utc::now();
        let user = doc.users.get_mut(user_id).ok_or(UserError::NotFound)?;
        user.balance = 0;
        user.completed_task_ids.clear();
        user.completed_count = 0;
        user.settings.clear();
        user.game_state.clear();
        user.last_active_at = now;
        let shared = user.to_shared(user_id);

        doc.submissions.retain(|s| s.user_id != user_id);
        doc.purchases.retain(|p| p.user_id != user_id);
        doc.purchase_requests.retain(|r| r.user_id != user_id);

        Ok::<_, UserError>(shared)
    })?;

    log::warn!("User {} was reset", user_id);
    Ok(user)
}

/// Credit an approved submission. Runs inside the approval's write; an error
/// makes that write roll back.
pub fn record_approval_effects(
    doc: &mut Document,
    user_id: &str,
    task_id: i64,
    reward: i64,
    now: DateTime<Utc>,
) -> Result<(), UserError> {
    let user = doc
        .users
        .entry(user_id.to_string())
        .or_insert_with(|| UserRecord::new(None, None, now));

    user.balance = user
        .balance
        .checked_add(reward)
        .ok_or_else(|| UserError::Validation("Balance overflow".to_string()))?;
    user.completed_task_ids.insert(task_id);
    user.completed_count = user.completed_count.saturating_add(1);
    user.last_active_at = now;
    Ok(())
}

pub fn get_state(store: &Store, user_id: &str) -> Result<UserState, UserError> {
    Ok(store.read(|doc| {
        doc.users
            .get(user_id)
            .map(|u| UserState {
                settings: u.settings.clone(),
                game_state: u.game_state.clone(),
            })
            .unwrap_or_default()
    })?)
}

/// Merge the provided blobs key by key; the incoming value wins.
pub fn update_state(
    store: &Store,
    user_id: &str,
    request: UpdateUserStateRequest,
) -> Result<UserState, UserError> {
    store.write(|doc| {
        let user = doc.users.get_mut(user_id).ok_or(UserError::NotFound)?;

        if let Some(settings) = request.settings {
            merge(&mut user.settings, settings);
        }
        if let Some(game_state) = request.game_state {
            merge(&mut user.game_state, game_state);
        }
        user.last_active_at = Utc::now();

        Ok::<_, UserError>(UserState {
            settings: user.settings.clone(),
            game_state: user.game_state.clone(),
        })
    })
}

pub fn list_users(store: &Store) -> Result<Vec<User>, UserError> {
    Ok(store.read(|doc| {
        doc.users
            .iter()
            .map(|(id, user)| user.to_shared(id))
            .collect()
    })?)
}

pub fn get_user_detail(store: &Store, user_id: &str) -> Result<UserDetail, UserError> {
    store.read(|doc| {
        let user = doc.users.get(user_id).ok_or(UserError::NotFound)?;

        let submissions: Vec<_> = doc
            .submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.to_shared(false))
            .collect();
        let count = |status: ReviewStatus| submissions.iter().filter(|s| s.status == status).count();

        Ok::<_, UserError>(UserDetail {
            user: user.to_shared(user_id),
            total_submissions: submissions.len(),
            approved_submissions: count(ReviewStatus::Approved),
            pending_submissions: count(ReviewStatus::Pending),
            rejected_submissions: count(ReviewStatus::Rejected),
            purchases: doc
                .purchases
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect(),
            purchase_requests: doc
                .purchase_requests
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect(),
            submissions,
        })
    })?
}

fn merge(target: &mut Blob, incoming: Blob) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
