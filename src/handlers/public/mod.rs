// handlers/public/mod.rs - endpoints reachable without a token

use axum::extract::State;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub mod auth;

/// GET / - service banner
pub async fn root(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "Kinder API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
    })))
}

/// GET /health - 503 while the store is closed
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Database is not available")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "database": "connected",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
