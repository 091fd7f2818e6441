use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, SubmitTaskRequest};

use super::errors::ToResponse;
use crate::models::AppState;
use crate::services::submissions as submission_service;
use crate::services::tasks as task_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/tasks", web::get().to(list_tasks))
        .route("/tasks/{user_id}", web::get().to(list_tasks_for_user))
        .route("/submit-task", web::post().to(submit_task))
        .route("/user/{user_id}/approved-tasks", web::get().to(approved_tasks))
        .route("/user/{user_id}/rejected-tasks", web::get().to(rejected_tasks));
}

async fn list_tasks(state: web::Data<AppState>) -> Result<HttpResponse> {
    match task_service::list_tasks(&state.store, true) {
        Ok(tasks) => Ok(HttpResponse::Ok().json(ApiSuccess::new(tasks))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn list_tasks_for_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match submission_service::list_tasks_for_user(&state.store, &user_id) {
        Ok(tasks) => Ok(HttpResponse::Ok().json(ApiSuccess::new(tasks))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn submit_task(
    state: web::Data<AppState>,
    body: web::Json<SubmitTaskRequest>,
) -> Result<HttpResponse> {
    match submission_service::submit(&state.store, &body) {
        Ok(submission) => Ok(HttpResponse::Created().json(ApiSuccess::new(submission))),
        Err(e) => Ok(e.to_response()),
    }
}

/// Decisions are delivered once; a second poll returns an empty list.
async fn approved_tasks(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match submission_service::poll_approved_events(&state.store, &user_id) {
        Ok(events) => Ok(HttpResponse::Ok().json(ApiSuccess::new(events))),
        Err(e) => Ok(e.to_response()),
    }
}

async fn rejected_tasks(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    match submission_service::poll_rejected_events(&state.store, &user_id) {
        Ok(events) => Ok(HttpResponse::Ok().json(ApiSuccess::new(events))),
        Err(e) => Ok(e.to_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::test_state;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    fn submit_body(task_id: i64) -> Value {
        json!({
            "taskId": task_id,
            "photo": "data:image/jpeg;base64,AAAA",
            "userId": "u1",
            "userName": "Masha"
        })
    }

    #[actix_web::test]
    async fn test_submit_and_task_view() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/submit-task")
            .set_json(submit_body(2))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], json!("pending"));
        assert!(body["data"].get("photo").is_none());

        let req = test::TestRequest::post()
            .uri("/api/submit-task")
            .set_json(submit_body(2))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], json!("already_pending"));

        let req = test::TestRequest::get().uri("/api/tasks/u1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let task = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == json!(2))
            .unwrap()
            .clone();
        assert_eq!(task["pendingApproval"], json!(true));
        assert_eq!(task["canSubmit"], json!(false));
    }

    #[actix_web::test]
    async fn test_unknown_task_and_empty_polls() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/submit-task")
            .set_json(submit_body(999))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/user/u1/approved-tasks").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], json!([]));

        let req = test::TestRequest::get().uri("/api/tasks").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }
}
