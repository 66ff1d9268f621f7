// handlers/public/auth/login.rs - POST /api/auth/login

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{generate_jwt, verify_password, Claims};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidJson};
use crate::state::AppState;
use crate::validation::{self, FieldRule, FieldType};

const LOGIN: &[FieldRule] = &[
    FieldRule::required("username", FieldType::String),
    FieldRule::required("password", FieldType::String),
];

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: User,
}

/// Exchange credentials for a bearer token. Unknown users and wrong passwords
/// are indistinguishable to the caller.
pub async fn login_post(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<LoginResponse> {
    let request: LoginRequest = validation::parse(LOGIN, body)?;
    let username = request.username.trim().to_string();

    let user = state
        .db
        .users
        .find(&|u: &User| u.username == username)
        .await?
        .into_iter()
        .next()
        .filter(|u| verify_password(&request.password, &u.password_hash));

    let Some(user) = user else {
        tracing::warn!("Failed login for '{}'", username);
        return Err(ApiError::unauthorized(
            "Invalid username or password",
            "AUTH_INVALID_CREDENTIALS",
        ));
    };

    let expiry_hours = state.config.security.jwt_expiry_hours;
    let claims = Claims::new(user.id, user.username.clone(), user.role, expiry_hours);
    let token = generate_jwt(&claims, &state.config.security.jwt_secret)?;

    tracing::info!("User {} logged in as {}", user.username, user.role);

    Ok(ApiResponse::success(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: expiry_hours * 3600,
        user,
    })
    .with_message("Login successful"))
}
