// router.rs - route table and the global middleware stack
//
// Layer order, outermost first: request id -> CORS -> trace -> rate limit ->
// body limit -> 405 envelope -> (protected routes only) JWT auth -> handler.

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, rate_limit_middleware, request_id_middleware};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(student_routes())
        .merge(class_routes())
        .merge(activity_routes())
        .merge(schedule_routes())
        .merge(enrollment_routes())
        .merge(finance_routes())
        .merge(system_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/auth/login", post(public::auth::login_post))
        // Protected
        .merge(protected_routes)
        .fallback(fallback)
        // Global middleware
        .layer(middleware::from_fn(method_not_allowed_envelope))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.security))
        .layer(middleware::from_fn_with_state(state.clone(), request_id_middleware))
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new().route("/api/auth/me", get(auth::me))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
}

fn student_routes() -> Router<AppState> {
    use protected::students;

    Router::new()
        .route("/api/students", get(students::list).post(students::create))
        .route(
            "/api/students/:id",
            get(students::get).put(students::update).delete(students::delete),
        )
        .route("/api/students/:id/transfer", post(students::transfer))
}

fn class_routes() -> Router<AppState> {
    use protected::classes;

    Router::new()
        .route("/api/classes", get(classes::list).post(classes::create))
        .route(
            "/api/classes/:id",
            get(classes::get).put(classes::update).delete(classes::delete),
        )
        .route("/api/teachers/:id/classes", get(classes::teacher_classes))
}

fn activity_routes() -> Router<AppState> {
    use protected::activities;

    Router::new()
        .route("/api/activities", get(activities::list).post(activities::create))
        .route(
            "/api/activities/:id",
            get(activities::get).delete(activities::cancel),
        )
        .route("/api/activities/:id/approve", put(activities::approve))
        .route("/api/activities/:id/register", post(activities::register))
        .route(
            "/api/activities/:id/registrations/:registration_id/cancel",
            post(activities::cancel_registration),
        )
        .route(
            "/api/activities/:id/feedback",
            get(activities::list_feedback).post(activities::feedback),
        )
}

fn schedule_routes() -> Router<AppState> {
    use protected::schedules;

    Router::new().route("/api/schedules", get(schedules::list).post(schedules::create))
}

fn enrollment_routes() -> Router<AppState> {
    use protected::enrollment;

    Router::new()
        .route(
            "/api/enrollment/plans",
            get(enrollment::list_plans).post(enrollment::create_plan),
        )
        .route(
            "/api/enrollment/applications",
            get(enrollment::list_applications).post(enrollment::submit_application),
        )
        .route(
            "/api/enrollment/applications/:id/status",
            put(enrollment::review_application),
        )
}

fn finance_routes() -> Router<AppState> {
    use protected::finance;

    Router::new().route("/api/finance/payments", get(finance::list).post(finance::record))
}

fn system_routes() -> Router<AppState> {
    use protected::system;

    Router::new().route("/api/system/settings", get(system::get).put(system::update))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

async fn fallback() -> ApiError {
    ApiError::not_found("Route not found")
}

/// The router answers an unsupported method on a known path with a bare 405
async fn method_not_allowed_envelope(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut enveloped = ApiError::method_not_allowed(method).into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(header::ALLOW, allow);
    }
    enveloped
}
