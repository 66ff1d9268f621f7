// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::validation::FieldError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    Validation {
        message: String,
        details: Vec<FieldError>,
    },
    InvalidJson(String),
    BusinessRule {
        message: String,
        code: &'static str,
    },

    // 401 Unauthorized
    Unauthorized {
        message: String,
        code: &'static str,
    },

    // 403 Forbidden
    Forbidden {
        message: String,
        code: &'static str,
    },

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 409 Conflict
    Duplicate(String),
    ForeignKey(String),
    ConcurrentModification(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 429 Too Many Requests
    RateLimited {
        message: String,
        retry_after: u64,
    },

    // 500 Internal Server Error
    Internal {
        message: String,
        debug: Option<String>,
    },
    Database(String),
    Transaction(String),

    // 502 / 504 (external service issues)
    UpstreamUnavailable(String),
    UpstreamTimeout(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Validation { .. }
            | ApiError::InvalidJson(_)
            | ApiError::BusinessRule { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Duplicate(_)
            | ApiError::ForeignKey(_)
            | ApiError::ConcurrentModification(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } | ApiError::Database(_) | ApiError::Transaction(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::InvalidJson(msg)
            | ApiError::NotFound(msg)
            | ApiError::MethodNotAllowed(msg)
            | ApiError::Duplicate(msg)
            | ApiError::ForeignKey(msg)
            | ApiError::ConcurrentModification(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Database(msg)
            | ApiError::Transaction(msg)
            | ApiError::UpstreamUnavailable(msg)
            | ApiError::UpstreamTimeout(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::Validation { message, .. }
            | ApiError::BusinessRule { message, .. }
            | ApiError::Unauthorized { message, .. }
            | ApiError::Forbidden { message, .. }
            | ApiError::RateLimited { message, .. }
            | ApiError::Internal { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::BusinessRule { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. } => *code,
            ApiError::NotFound(_) => "RESOURCE_NOT_FOUND",
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::Duplicate(_) => "DUPLICATE_ENTRY",
            ApiError::ForeignKey(_) => "FOREIGN_KEY_CONSTRAINT",
            ApiError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::Internal { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Transaction(_) => "TRANSACTION_ERROR",
            ApiError::UpstreamUnavailable(_) => "EXTERNAL_SERVICE_UNAVAILABLE",
            ApiError::UpstreamTimeout(_) => "EXTERNAL_SERVICE_TIMEOUT",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to the failure envelope.
    /// `debug` output of internal errors is only rendered when `expose_debug` is set.
    pub fn to_json(&self, request_id: &str, expose_debug: bool) -> Value {
        let mut body = json!({
            "success": false,
            "message": self.message(),
            "errorCode": self.error_code(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "requestId": request_id,
        });

        match self {
            ApiError::Validation { details, .. } => {
                body["details"] = json!(details);
            }
            ApiError::RateLimited { retry_after, .. } => {
                body["details"] = json!({ "retryAfter": retry_after });
            }
            ApiError::Internal { debug: Some(debug), .. } if expose_debug => {
                body["details"] = json!({ "debug": debug });
            }
            _ => {}
        }

        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        let summary = details
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::Validation {
            message: format!("Validation failed: {}", summary),
            details,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        ApiError::BusinessRule {
            message: message.into(),
            code: "BUSINESS_RULE_VIOLATION",
        }
    }

    pub fn invalid_status_transition(message: impl Into<String>) -> Self {
        ApiError::BusinessRule {
            message: message.into(),
            code: "INVALID_STATUS_TRANSITION",
        }
    }

    pub fn unauthorized(message: impl Into<String>, code: &'static str) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
            code,
        }
    }

    pub fn token_missing() -> Self {
        Self::unauthorized("Access token is required", "AUTH_TOKEN_MISSING")
    }

    pub fn invalid_format() -> Self {
        Self::unauthorized(
            "Authorization header must use the Bearer scheme",
            "AUTH_INVALID_FORMAT",
        )
    }

    pub fn invalid_token() -> Self {
        Self::unauthorized("Invalid token", "AUTH_INVALID_TOKEN")
    }

    pub fn token_expired() -> Self {
        Self::unauthorized("Token expired", "AUTH_TOKEN_EXPIRED")
    }

    pub fn insufficient_permissions() -> Self {
        ApiError::Forbidden {
            message: "Insufficient permissions".to_string(),
            code: "INSUFFICIENT_PERMISSIONS",
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            message: message.into(),
            code: "ACCESS_DENIED",
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn method_not_allowed(method: impl std::fmt::Display) -> Self {
        ApiError::MethodNotAllowed(format!("Method {} is not allowed on this route", method))
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        ApiError::Duplicate(message.into())
    }

    pub fn foreign_key(message: impl Into<String>) -> Self {
        ApiError::ForeignKey(message.into())
    }

    pub fn concurrent_modification(message: impl Into<String>) -> Self {
        ApiError::ConcurrentModification(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        ApiError::RateLimited {
            message: "Too many requests, please try again later".to_string(),
            retry_after,
        }
    }

    pub fn internal(message: impl Into<String>, debug: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            message: message.into(),
            debug: Some(debug.to_string()),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        ApiError::Database(message.into())
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        ApiError::Transaction(message.into())
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        ApiError::UpstreamUnavailable(message.into())
    }

    pub fn upstream_timeout(message: impl Into<String>) -> Self {
        ApiError::UpstreamTimeout(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::database::DatabaseError> for ApiError {
    fn from(err: crate::database::DatabaseError) -> Self {
        use crate::database::DatabaseError;

        match err {
            DatabaseError::NotFound { table, id } => {
                ApiError::not_found(format!("{} record {} not found", table, id))
            }
            DatabaseError::Unique { message, .. } => ApiError::duplicate(message),
            DatabaseError::VersionConflict { table, id, expected, actual } => {
                tracing::warn!(
                    "Version conflict on {} {}: expected {}, found {}",
                    table, id, expected, actual
                );
                ApiError::concurrent_modification(format!(
                    "The {} record was modified by another request, reload and retry",
                    table
                ))
            }
            DatabaseError::Rejected(violation) => violation.into(),
            DatabaseError::Closed => {
                tracing::error!("Database access after close");
                ApiError::database("Database is not available")
            }
            DatabaseError::Aborted(msg) => {
                tracing::error!("Multi-step write aborted: {}", msg);
                ApiError::transaction("The operation could not be completed and was rolled back")
            }
        }
    }
}

impl From<crate::rules::RuleViolation> for ApiError {
    fn from(violation: crate::rules::RuleViolation) -> Self {
        use crate::rules::RuleViolation;

        let message = violation.to_string();
        match violation {
            RuleViolation::Business(_) => ApiError::business_rule(message),
            RuleViolation::InvalidTransition { .. } => ApiError::invalid_status_transition(message),
            RuleViolation::Dependents(_) => ApiError::foreign_key(message),
        }
    }
}

impl From<crate::auth::JwtError> for ApiError {
    fn from(err: crate::auth::JwtError) -> Self {
        use crate::auth::JwtError;

        match &err {
            JwtError::Expired => ApiError::token_expired(),
            JwtError::Invalid(reason) => {
                tracing::debug!("Rejected token: {}", reason);
                ApiError::invalid_token()
            }
            JwtError::InvalidSecret | JwtError::TokenGeneration(_) => {
                tracing::error!("Token handling failed: {}", err);
                ApiError::internal("Authentication is misconfigured", &err)
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let request_id = crate::middleware::request_id::current_request_id();
        let expose_debug = crate::middleware::request_id::expose_debug();

        if status.is_server_error() {
            tracing::error!(request_id = %request_id, code = self.error_code(), "{}", self.message());
        } else {
            tracing::debug!(request_id = %request_id, code = self.error_code(), "{}", self.message());
        }

        let mut response = (status, Json(self.to_json(&request_id, expose_debug))).into_response();

        if let ApiError::RateLimited { retry_after, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
