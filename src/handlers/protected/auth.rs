// handlers/protected/auth.rs - GET /api/auth/me

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;

pub async fn me(State(state): State<AppState>, identity: Identity) -> ApiResult<Value> {
    let user = state.db.users.get_404(identity.id).await?;

    Ok(ApiResponse::success(json!({
        "identity": identity,
        "user": user,
    })))
}
