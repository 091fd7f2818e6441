use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use shared::ApiError;
use std::sync::Arc;

mod config;
mod handlers;
mod middleware;
mod models;
mod services;
mod store;

use config::Config;
use store::Store;

fn to_io_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(to_io_error)?;

    log::info!("Starting server at {}:{}", config.host, config.port);

    let store = Arc::new(Store::open(&config.data_file, config.save_debounce).map_err(to_io_error)?);
    if let Some(path) = store.path() {
        log::info!("Using data file {}", path.display());
    }

    tokio::spawn(store.clone().run_flusher());

    // 5 failed attempts per 15 minutes
    let login_rate_limiter = Arc::new(middleware::RateLimiter::new(5, 15 * 60));

    let app_state = web::Data::new(models::AppState {
        store: store.clone(),
        config: config.clone(),
        login_rate_limiter,
    });

    let max_body_bytes = config.max_body_bytes;
    let allowed_origins = config.cors_origins.clone();

    HttpServer::new(move || {
        let allowed_origins = allowed_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|allowed| origin_str.starts_with(allowed.as_str()))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
            .max_age(3600);

        let json_config = web::JsonConfig::default()
            .limit(max_body_bytes)
            .error_handler(|err, _req| {
                let response = actix_web::HttpResponse::BadRequest()
                    .json(ApiError::new("validation_error", err.to_string()));
                actix_web::error::InternalError::from_response(err, response).into()
            });

        App::new()
            .app_data(app_state.clone())
            .app_data(json_config)
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    log::info!("Server stopped, saving data file");
    store.flush().map_err(to_io_error)
}
