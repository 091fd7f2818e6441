use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, BuyItemRequest};

use super::errors::ToResponse;
use crate::models::AppState;
use crate::services::purchases as purchase_service;
use crate::services::shop as shop_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/shop", web::get().to(list_items))
        .route("/buy-item", web::post().to(buy_item))
        .route("/user/{user_id}/purchases", web::get().to(list_purchases))
        .route("/user/{user_id}/purchase-requests", web::get().to(list_purchase_requests));
}

async fn list_items(state: web::Data<AppState>) -> Result<HttpResponse> {
    match shop_service::list_items(&state.store, true) {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiSuccess::new(items))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn buy_item(
    state: web::Data<AppState>,
    body: web::Json<BuyItemRequest>,
) -> Result<HttpResponse> {
    match purchase_service::request(&state.store, &body) {
        Ok(request) => Ok(HttpResponse::Created().json(ApiSuccess::new(request))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_purchases(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match purchase_service::list_user_purchases(&state.store, &user_id) {
        Ok(purchases) => Ok(HttpResponse::Ok().json(ApiSuccess::new(purchases))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_purchase_requests(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match purchase_service::list_user_requests(&state.store, &user_id) {
        Ok(requests) => Ok(HttpResponse::Ok().json(ApiSuccess::new(requests))),
        Err(e) => Ok(e.to_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::test_state;
    use crate::services::users as user_service;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_buy_item_flow() {
        let state = test_state();
        user_service::ensure_user(&state.store, "u1", None, None).unwrap();
        user_service::set_balance(&state.store, "u1", 10).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/buy-item")
            .set_json(json!({"itemId": 2, "userId": "u1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], json!("insufficient_balance"));

        let req = test::TestRequest::post()
            .uri("/api/buy-item")
            .set_json(json!({"itemId": 1, "itemName": "👕 Футболка", "price": 10, "userId": "u1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri("/api/user/u1/purchase-requests")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["status"], json!("pending"));

        let req = test::TestRequest::get().uri("/api/user/u1/purchases").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], json!([]));
    }

    #[actix_web::test]
    async fn test_shop_lists_active_items() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/shop").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }
}
