use actix_web::HttpResponse;
use shared::{ApiError, ReviewStatus};

use crate::services::auth::AuthError;
use crate::services::purchases::PurchaseError;
use crate::services::shop::ShopError;
use crate::services::statistics::StatisticsError;
use crate::services::submissions::SubmissionError;
use crate::services::tasks::TaskError;
use crate::services::users::UserError;
use crate::store::StoreError;

/// Service errors that know how they look on the wire
pub trait ToResponse {
    fn to_response(&self) -> HttpResponse;
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::new("not_found", message))
}

pub fn validation_error(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new("validation_error", message))
}

pub fn unauthorized(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiError::new("unauthorized", message))
}

pub fn internal_error(error: &dyn std::fmt::Debug) -> HttpResponse {
    log::error!("Internal error: {:?}", error);
    HttpResponse::InternalServerError().json(ApiError::new("internal_error", "Internal server error"))
}

fn invalid_transition(status: ReviewStatus, what: &str) -> HttpResponse {
    HttpResponse::Conflict().json(ApiError::new(
        "invalid_transition",
        format!("{} is already {}", what, status.as_str()),
    ))
}

impl ToResponse for StoreError {
    fn to_response(&self) -> HttpResponse {
        internal_error(self)
    }
}

impl ToResponse for UserError {
    fn to_response(&self) -> HttpResponse {
        match self {
            UserError::NotFound => not_found("User not found"),
            UserError::Validation(message) => validation_error(message.as_str()),
            UserError::StoreError(e) => e.to_response(),
        }
    }
}

impl ToResponse for TaskError {
    fn to_response(&self) -> HttpResponse {
        match self {
            TaskError::NotFound => not_found("Task not found"),
            TaskError::Validation(message) => validation_error(message.as_str()),
            TaskError::StoreError(e) => e.to_response(),
        }
    }
}

impl ToResponse for ShopError {
    fn to_response(&self) -> HttpResponse {
        match self {
            ShopError::NotFound => not_found("Shop item not found"),
            ShopError::Validation(message) => validation_error(message.as_str()),
            ShopError::StoreError(e) => e.to_response(),
        }
    }
}

impl ToResponse for SubmissionError {
    fn to_response(&self) -> HttpResponse {
        match self {
            SubmissionError::TaskNotFound => not_found("Task not found"),
            SubmissionError::NotFound => not_found("Submission not found"),
            SubmissionError::AlreadyCompleted => HttpResponse::Conflict()
                .json(ApiError::new("already_completed", "Task already completed")),
            SubmissionError::AlreadyPending => HttpResponse::Conflict()
                .json(ApiError::new("already_pending", "Task is already waiting for review")),
            SubmissionError::InvalidTransition(status) => invalid_transition(*status, "Submission"),
            SubmissionError::Validation(message) => validation_error(message.as_str()),
            SubmissionError::UserError(e) => e.to_response(),
            SubmissionError::StoreError(e) => e.to_response(),
        }
    }
}

impl ToResponse for PurchaseError {
    fn to_response(&self) -> HttpResponse {
        match self {
            PurchaseError::ItemNotFound => not_found("Shop item not found"),
            PurchaseError::NotFound => not_found("Purchase request not found"),
            PurchaseError::InsufficientBalance { .. } => HttpResponse::BadRequest()
                .json(ApiError::new("insufficient_balance", self.to_string())),
            PurchaseError::InvalidTransition(status) => invalid_transition(*status, "Purchase request"),
            PurchaseError::Validation(message) => validation_error(message.as_str()),
            PurchaseError::UserError(e) => e.to_response(),
            PurchaseError::StoreError(e) => e.to_response(),
        }
    }
}

impl ToResponse for AuthError {
    fn to_response(&self) -> HttpResponse {
        match self {
            AuthError::InvalidCredentials => unauthorized("Invalid password"),
            AuthError::PasswordTooShort => validation_error(self.to_string()),
            AuthError::StoreError(e) => e.to_response(),
            AuthError::HashingError | AuthError::JwtError(_) => internal_error(self),
        }
    }
}

impl ToResponse for StatisticsError {
    fn to_response(&self) -> HttpResponse {
        match self {
            StatisticsError::StoreError(e) => e.to_response(),
        }
    }
}
