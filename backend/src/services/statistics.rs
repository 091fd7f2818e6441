use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::Document;
use crate::store::{Store, StoreError};
use shared::{ReviewStatus, Stats};

/// Users seen within this many days count as active
pub const ACTIVE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

pub fn compute_stats(doc: &Document, now: DateTime<Utc>) -> Stats {
    let active_since = now - Duration::days(ACTIVE_WINDOW_DAYS);

    Stats {
        total_users: doc.users.len(),
        active_users: doc
            .users
            .values()
            .filter(|u| u.last_active_at > active_since)
            .count(),
        total_submissions: doc.submissions.len(),
        pending_submissions: doc
            .submissions
            .iter()
            .filter(|s| s.status == ReviewStatus::Pending)
            .count(),
        total_lavki: doc
            .users
            .values()
            .fold(0i64, |total, u| total.saturating_add(u.balance)),
        active_tasks: doc.tasks.iter().filter(|t| t.active).count(),
        active_shop_items: doc.shop.iter().filter(|i| i.active).count(),
        total_purchases: doc.purchases.len(),
        pending_purchase_requests: doc
            .purchase_requests
            .iter()
            .filter(|r| r.status == ReviewStatus::Pending)
            .count(),
    }
}

pub fn stats(store: &Store) -> Result<Stats, StatisticsError> {
    Ok(store.read(|doc| compute_stats(doc, Utc::now()))?)
}
