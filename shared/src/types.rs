use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Opaque key-value blob stored per user (settings, game state)
pub type Blob = Map<String, Value>;

// ============================================================================
// Review Status
// ============================================================================

/// Lifecycle of anything an administrator has to look at: task submissions
/// and purchase requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReviewStatus::Pending)
    }

    /// Only pending items may move, and only to a terminal state.
    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::Pending, ReviewStatus::Approved) | (ReviewStatus::Pending, ReviewStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ReviewStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

// ============================================================================
// User Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(rename = "lavki")]
    pub balance: i64,
    pub display_name: Option<String>,
    pub contact: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub completed_task_ids: Vec<i64>,
    pub completed_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub total_submissions: usize,
    pub approved_submissions: usize,
    pub pending_submissions: usize,
    pub rejected_submissions: usize,
    pub submissions: Vec<Submission>,
    pub purchases: Vec<Purchase>,
    pub purchase_requests: Vec<PurchaseRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeUserRequest {
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_contact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub settings: Blob,
    #[serde(default)]
    pub game_state: Blob,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStateRequest {
    pub settings: Option<Blob>,
    pub game_state: Option<Blob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub lavki: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBalanceRequest {
    pub lavki: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetUserRequest {
    #[serde(default)]
    pub confirm: bool,
}

// ============================================================================
// Task Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub reward: i64,
    pub active: bool,
}

/// A task as seen by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithStatus {
    #[serde(flatten)]
    pub task: Task,
    pub user_completed: bool,
    pub pending_approval: bool,
    pub can_submit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub reward: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub reward: Option<i64>,
    pub active: Option<bool>,
}

// ============================================================================
// Submission Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub task_id: i64,
    pub task_name: String,
    pub user_id: String,
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub reward: i64,
    pub status: ReviewStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTaskRequest {
    pub task_id: i64,
    pub photo: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_contact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectSubmissionRequest {
    pub reason: Option<String>,
}

/// Delivered once to the client after an approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedTaskEvent {
    pub submission_id: i64,
    pub task_id: i64,
    pub task_name: String,
    pub reward: i64,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Delivered once to the client after a rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedTaskEvent {
    pub submission_id: i64,
    pub task_id: i64,
    pub task_name: String,
    pub reason: String,
    pub reviewed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Shop Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShopItemRequest {
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateShopItemRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyItemRequest {
    pub item_id: i64,
    pub item_name: Option<String>,
    pub price: Option<i64>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub price: i64,
    pub status: ReviewStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: i64,
    pub item_id: i64,
    #[serde(default)]
    pub item_name: String,
    #[serde(alias = "cost")]
    pub price: i64,
    pub user_id: String,
    pub purchased_at: DateTime<Utc>,
    #[serde(default)]
    pub request_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPurchaseRequest {
    pub status: ReviewStatus,
    pub admin_notes: Option<String>,
}

/// Outcome of an admin decision; `purchase` is absent for rejections and for
/// approvals that found the balance short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPurchaseResponse {
    pub request: PurchaseRequest,
    pub purchase: Option<Purchase>,
}

// ============================================================================
// Admin Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_submissions: usize,
    pub pending_submissions: usize,
    pub total_lavki: i64,
    pub active_tasks: usize,
    pub active_shop_items: usize,
    pub total_purchases: usize,
    pub pending_purchase_requests: usize,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

// ============================================================================
// Tests
// ============================================================================
