use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::state::AppState;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request values that error rendering needs without access to state
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub request_id: String,
    pub expose_debug: bool,
}

tokio::task_local! {
    static SCOPE: RequestScope;
}

/// Id of the request being served, or a fresh one outside a request scope
pub fn current_request_id() -> String {
    SCOPE
        .try_with(|scope| scope.request_id.clone())
        .unwrap_or_else(|_| Uuid::new_v4().to_string())
}

/// Whether internal error details may be rendered. Follows the serving
/// app's configuration; the process-wide config outside a request.
pub fn expose_debug() -> bool {
    SCOPE
        .try_with(|scope| scope.expose_debug)
        .unwrap_or_else(|_| !crate::is_production!())
}

/// Run `future` inside a request scope
pub async fn scoped<F: std::future::Future>(scope: RequestScope, future: F) -> F::Output {
    SCOPE.scope(scope, future).await
}

/// Assigns every request an id (honouring a well-formed incoming
/// `x-request-id`), runs the rest of the stack inside a span carrying it and
/// echoes it on the response.
pub async fn request_id_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let scope = RequestScope {
        request_id: request_id.clone(),
        expose_debug: !state.config.is_production(),
    };
    let mut response = scoped(scope, next.run(request).instrument(span)).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}
