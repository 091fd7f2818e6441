use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Deserialize;
use shared::{
    ApiError, ApiSuccess, ChangePasswordRequest, CreateShopItemRequest, CreateTaskRequest,
    LoginRequest, LoginResponse, ProcessPurchaseRequest, RejectSubmissionRequest, ResetUserRequest,
    ReviewStatus, SetBalanceRequest, UpdateShopItemRequest, UpdateTaskRequest,
};

use super::errors::{internal_error, unauthorized, validation_error, ToResponse};
use crate::middleware::auth::{client_key, require_admin};
use crate::models::AppState;
use crate::services::auth::{self as auth_service, AuthError};
use crate::services::{
    purchases as purchase_service, shop as shop_service, statistics as statistics_service,
    submissions as submission_service, tasks as task_service, users as user_service,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/login", web::post().to(login))
            .route("/change-password", web::post().to(change_password))
            .route("/submissions", web::get().to(list_submissions))
            .route("/submissions/{id}/approve", web::post().to(approve_submission))
            .route("/submissions/{id}/reject", web::post().to(reject_submission))
            .route("/tasks", web::get().to(list_tasks))
            .route("/tasks", web::post().to(create_task))
            .route("/tasks/{id}", web::put().to(update_task))
            .route("/shop", web::get().to(list_shop_items))
            .route("/shop", web::post().to(create_shop_item))
            .route("/shop/{id}", web::put().to(update_shop_item))
            .route("/purchase-requests", web::get().to(list_purchase_requests))
            .route("/purchase-requests/{id}/process", web::post().to(process_purchase_request))
            .route("/purchases", web::get().to(list_purchases))
            .route("/users", web::get().to(list_users))
            .route("/users/{user_id}", web::get().to(get_user))
            .route("/users/{user_id}/balance", web::put().to(set_balance))
            .route("/users/{user_id}/reset", web::post().to(reset_user))
            .route("/stats", web::get().to(get_stats))
            .route("/reload", web::post().to(reload_data)),
    );
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

fn authorize(req: &HttpRequest, state: &AppState) -> Result<(), HttpResponse> {
    require_admin(req, &state.config.jwt_secret).map_err(|e| unauthorized(e.to_string()))
}

/// `all` and an empty value mean no filter
fn parse_status(query: &StatusQuery) -> Result<Option<ReviewStatus>, HttpResponse> {
    match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(status) => status
            .parse()
            .map(Some)
            .map_err(|e: shared::UnknownStatus| validation_error(e.to_string())),
    }
}

async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let client = client_key(&req);

    if !state.login_rate_limiter.check(&client) {
        log::warn!("Admin login rate limited for {}", client);
        return Ok(HttpResponse::TooManyRequests().json(ApiError::new(
            "too_many_requests",
            "Too many login attempts, try again later",
        )));
    }

    let store = state.store.clone();
    let password = body.into_inner().password;
    let outcome = web::block(move || auth_service::login(&store, &password)).await;

    match outcome {
        Ok(Ok(())) => {
            state.login_rate_limiter.clear(&client);
            match auth_service::create_jwt(&state.config.jwt_secret, state.config.jwt_expiration_hours) {
                Ok(token) => Ok(HttpResponse::Ok().json(ApiSuccess::new(LoginResponse { token }))),
                Err(e) => Ok(e.to_response()),
            }
        }
        Ok(Err(AuthError::InvalidCredentials)) => {
            state.login_rate_limiter.record(&client);
            log::warn!("Failed admin login from {}", client);
            Ok(unauthorized("Invalid password"))
        }
        Ok(Err(e)) => Ok(e.to_response()),
        Err(e) => Ok(internal_error(&e)),
    }
}

async fn change_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    let store = state.store.clone();
    let new_password = body.into_inner().new_password;

    match web::block(move || auth_service::change_password(&store, &new_password)).await {
        Ok(Ok(())) => Ok(HttpResponse::Ok().json(ApiSuccess::new(()))),
        Ok(Err(e)) => Ok(e.to_response()),
        Err(e) => Ok(internal_error(&e)),
    }
}

async fn list_submissions(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }
    let status = match parse_status(&query) {
        Ok(status) => status,
        Err(resp) => return Ok(resp),
    };

    match submission_service::list_submissions(&state.store, status) {
        Ok(submissions) => Ok(HttpResponse::Ok().json(ApiSuccess::new(submissions))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn approve_submission(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match submission_service::approve(&state.store, path.into_inner()) {
        Ok(submission) => Ok(HttpResponse::Ok().json(ApiSuccess::new(submission))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn reject_submission(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: Option<web::Json<RejectSubmissionRequest>>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }
    let reason = body.and_then(|b| b.into_inner().reason);

    match submission_service::reject(&state.store, path.into_inner(), reason.as_deref()) {
        Ok(submission) => Ok(HttpResponse::Ok().json(ApiSuccess::new(submission))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_tasks(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match task_service::list_tasks(&state.store, false) {
        Ok(tasks) => Ok(HttpResponse::Ok().json(ApiSuccess::new(tasks))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn create_task(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match task_service::create_task(&state.store, &body) {
        Ok(task) => Ok(HttpResponse::Created().json(ApiSuccess::new(task))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn update_task(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match task_service::update_task(&state.store, path.into_inner(), &body) {
        Ok(task) => Ok(HttpResponse::Ok().json(ApiSuccess::new(task))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_shop_items(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match shop_service::list_items(&state.store, false) {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiSuccess::new(items))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn create_shop_item(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateShopItemRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match shop_service::create_item(&state.store, &body) {
        Ok(item) => Ok(HttpResponse::Created().json(ApiSuccess::new(item))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn update_shop_item(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateShopItemRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match shop_service::update_item(&state.store, path.into_inner(), &body) {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiSuccess::new(item))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_purchase_requests(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }
    let status = match parse_status(&query) {
        Ok(status) => status,
        Err(resp) => return Ok(resp),
    };

    match purchase_service::list_requests(&state.store, status) {
        Ok(requests) => Ok(HttpResponse::Ok().json(ApiSuccess::new(requests))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn process_purchase_request(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ProcessPurchaseRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }
    let request = body.into_inner();

    match purchase_service::process(
        &state.store,
        path.into_inner(),
        request.status,
        request.admin_notes.as_deref(),
    ) {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiSuccess::new(outcome))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_purchases(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match purchase_service::list_purchases(&state.store) {
        Ok(purchases) => Ok(HttpResponse::Ok().json(ApiSuccess::new(purchases))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_users(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match user_service::list_users(&state.store) {
        Ok(users) => Ok(HttpResponse::Ok().json(ApiSuccess::new(users))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn get_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match user_service::get_user_detail(&state.store, &path.into_inner()) {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn set_balance(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SetBalanceRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match user_service::set_balance(&state.store, &path.into_inner(), body.lavki) {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn reset_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ResetUserRequest>,
) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }
    if !body.confirm {
        return Ok(validation_error("Reset must be confirmed"));
    }

    match user_service::reset_user(&state.store, &path.into_inner()) {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn get_stats(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match statistics_service::stats(&state.store) {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiSuccess::new(stats))),
        Err(e) => Ok(e.to_response()),
    }
}

/// Re-read the data file, e.g. after it was edited by hand
async fn reload_data(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(resp) = authorize(&req, &state) {
        return Ok(resp);
    }

    match state.store.invalidate() {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiSuccess::new(true))),
        Err(e) => Ok(e.to_response()),
    }
}
