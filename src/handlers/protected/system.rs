// handlers/protected/system.rs - /api/system/settings

use axum::extract::State;
use chrono::Utc;
use serde_json::Value;

use super::utils::{apply_patch, expected_version};
use crate::database::models::SystemSettings;
use crate::error::ApiError;
use crate::middleware::{perm, ApiResponse, ApiResult, Authorized, ValidJson};
use crate::state::AppState;
use crate::validation::{self, FieldRule, FieldType};

const UPDATE_SETTINGS: &[FieldRule] = &[
    FieldRule::optional("kindergartenName", FieldType::String).max(100.0),
    FieldRule::optional("aiModel", FieldType::String).max(100.0),
    FieldRule::optional("temperature", FieldType::Number).range(0.0, 2.0),
    FieldRule::optional("maxTokens", FieldType::Integer).range(1.0, 32768.0),
];

const EDITABLE: &[&str] = &["kindergartenName", "aiModel", "temperature", "maxTokens"];

async fn current(state: &AppState) -> Result<SystemSettings, ApiError> {
    state
        .db
        .settings
        .all()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("System settings have not been initialised"))
}

/// GET /api/system/settings
pub async fn get(State(state): State<AppState>, _auth: Authorized<perm::ReadSettings>) -> ApiResult<SystemSettings> {
    Ok(ApiResponse::success(current(&state).await?))
}

/// PUT /api/system/settings
pub async fn update(
    State(state): State<AppState>,
    auth: Authorized<perm::UpdateSettings>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<SystemSettings> {
    validation::validate_partial(UPDATE_SETTINGS, &body, Utc::now()).map_err(ApiError::validation)?;
    let version = expected_version(&body)?;

    let settings = current(&state).await?;
    let mut updated: SystemSettings = apply_patch(&settings, &body, EDITABLE)?;
    updated.kindergarten_name = updated.kindergarten_name.trim().to_string();
    updated.updated_at = Utc::now();

    let settings = state.db.settings.update(updated, version).await?;
    tracing::info!("{} updated system settings (version {})", auth.username, settings.version);

    Ok(ApiResponse::success(settings).with_message("Settings updated"))
}
