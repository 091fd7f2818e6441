use std::sync::Arc;

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::store::Store;

pub mod document;
pub mod submission;
pub mod user;

pub use document::*;
pub use submission::*;
pub use user::*;

/// Application state shared across all handlers
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Config,
    pub login_rate_limiter: Arc<RateLimiter>,
}
