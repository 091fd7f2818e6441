use actix_web::web;

pub mod admin;
pub mod errors;
pub mod shop;
pub mod tasks;
pub mod users;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(admin::configure)
            .configure(users::configure)
            .configure(tasks::configure)
            .configure(shop::configure),
    );
}

#[cfg(test)]
pub mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::web;

    use crate::config::Config;
    use crate::middleware::RateLimiter;
    use crate::models::AppState;
    use crate::store::Store;

    pub const TEST_JWT_SECRET: &str = "test-secret";

    pub fn test_state() -> web::Data<AppState> {
        test_state_with(Store::in_memory().unwrap())
    }

    pub fn test_state_with(store: Store) -> web::Data<AppState> {
        web::Data::new(AppState {
            store: Arc::new(store),
            config: Config {
                host: "127.0.0.1".to_string(),
                port: 0,
                data_file: String::new(),
                save_debounce: Duration::ZERO,
                jwt_secret: TEST_JWT_SECRET.to_string(),
                jwt_expiration_hours: 1,
                cors_origins: Vec::new(),
                max_body_bytes: 1024 * 1024,
            },
            login_rate_limiter: Arc::new(RateLimiter::new(5, 15 * 60)),
        })
    }
}
