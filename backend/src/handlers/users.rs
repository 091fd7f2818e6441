use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, BalanceResponse, InitializeUserRequest, UpdateUserStateRequest};

use super::errors::ToResponse;
use crate::models::AppState;
use crate::services::users as user_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/initialize-user", web::post().to(initialize_user))
        .route("/user/{user_id}/balance", web::get().to(get_balance))
        .route("/user/{user_id}/state", web::get().to(get_state))
        .route("/user/{user_id}/state", web::post().to(update_state));
}

async fn initialize_user(
    state: web::Data<AppState>,
    body: web::Json<InitializeUserRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();

    match user_service::ensure_user(
        &state.store,
        &request.user_id,
        request.user_name.as_deref(),
        request.user_contact.as_deref(),
    ) {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn get_balance(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match user_service::get_balance(&state.store, &user_id) {
        Ok(lavki) => Ok(HttpResponse::Ok().json(ApiSuccess::new(BalanceResponse { lavki }))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn get_state(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match user_service::get_state(&state.store, &user_id) {
        Ok(user_state) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user_state))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn update_state(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateUserStateRequest>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match user_service::update_state(&state.store, &user_id, body.into_inner()) {
        Ok(user_state) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user_state))),
        Err(e) => Ok(e.to_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::test_state;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_initialize_then_balance() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/initialize-user")
            .set_json(json!({"userId": "u1", "userName": "Masha"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["lavki"], json!(0));
        assert_eq!(body["data"]["displayName"], json!("Masha"));

        let req = test::TestRequest::get().uri("/api/user/u1/balance").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], json!({"lavki": 0}));
    }

    #[actix_web::test]
    async fn test_state_round_trip_and_unknown_user() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/user/ghost/state")
            .set_json(json!({"gameState": {"mood": "happy"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/initialize-user")
            .set_json(json!({"userId": "u1"}))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/user/u1/state")
            .set_json(json!({"gameState": {"mood": "happy"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/user/u1/state").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["gameState"]["mood"], json!("happy"));
        assert_eq!(body["data"]["settings"], json!({}));
    }
}
