use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::Database;
use crate::middleware::RateLimiter;
use crate::rules::RuleBook;

/// Shared state handed to every handler. Everything mutable lives in `db`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub rules: Arc<RuleBook>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        let limiter = RateLimiter::new(
            config.api.rate_limit_requests,
            Duration::from_secs(config.api.rate_limit_window_secs),
        );

        Self {
            config: Arc::new(config),
            db: Arc::new(db),
            rules: Arc::new(RuleBook::standard()),
            limiter: Arc::new(limiter),
        }
    }
}
