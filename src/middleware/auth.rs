use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::auth::{validate_jwt, Claims, Role};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Id;

/// Caller identity established from a verified token
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: Id,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Rejects unauthenticated requests with 401 and injects [`Identity`]
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers)?;
    let claims = validate_jwt(token, &state.config.security.jwt_secret)?;

    let identity = Identity::from(claims);
    tracing::debug!("Authenticated {} ({})", identity.username, identity.role);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers.get(AUTHORIZATION).ok_or_else(ApiError::token_missing)?;

    let auth_str = auth_header.to_str().map_err(|_| ApiError::invalid_format())?;
    if auth_str.trim().is_empty() {
        return Err(ApiError::token_missing());
    }

    let (scheme, token) = auth_str.split_once(' ').unwrap_or((auth_str, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::invalid_format());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::token_missing());
    }
    Ok(token)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(ApiError::token_missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    fn code_of(value: Option<&str>) -> &'static str {
        extract_bearer(&headers(value)).unwrap_err().error_code()
    }

    #[test]
    fn missing_and_empty_tokens() {
        assert_eq!(code_of(None), "AUTH_TOKEN_MISSING");
        assert_eq!(code_of(Some("Bearer ")), "AUTH_TOKEN_MISSING");
        assert_eq!(code_of(Some("Bearer")), "AUTH_TOKEN_MISSING");
    }

    #[test]
    fn non_bearer_scheme_is_a_format_error() {
        assert_eq!(code_of(Some("Basic dXNlcjpwYXNz")), "AUTH_INVALID_FORMAT");
        assert_eq!(code_of(Some("Token abc")), "AUTH_INVALID_FORMAT");
    }

    #[test]
    fn bearer_token_is_extracted() {
        let h = headers(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&h).unwrap(), "abc.def.ghi");
    }
}
