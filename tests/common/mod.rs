#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

use kinder_api::auth::{generate_jwt, Claims, Role};
use kinder_api::config::AppConfig;
use kinder_api::database::{seed_demo, Database, DemoIds};
use kinder_api::{app, AppState};

pub use kinder_api::database::seed::DEMO_PASSWORD;

const MAX_BODY: usize = 4 * 1024 * 1024;

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub headers: HeaderMap,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_code(&self) -> &str {
        self.body["errorCode"].as_str().unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// Captured per test; the first call wins, later ones are no-ops
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// An in-process app over a freshly seeded store
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub ids: DemoIds,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::with_config(AppConfig::development()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        init_tracing();

        let db = Database::in_memory();
        db.open().await?;
        let ids = seed_demo(&db).await.context("seeding demo data")?;

        let state = AppState::new(config, db);
        let router = app(state.clone());
        Ok(Self { router, state, ids })
    }

    pub fn token(&self, user_id: i64, username: &str, role: Role) -> String {
        let security = &self.state.config.security;
        let claims = Claims::new(user_id, username, role, security.jwt_expiry_hours);
        generate_jwt(&claims, &security.jwt_secret).expect("token")
    }

    pub fn admin(&self) -> String {
        self.token(self.ids.admin, "admin", Role::Admin)
    }

    pub fn principal(&self) -> String {
        self.token(self.ids.principal, "principal", Role::Principal)
    }

    pub fn teacher(&self) -> String {
        self.token(self.ids.teacher, "teacher_wang", Role::Teacher)
    }

    pub fn other_teacher(&self) -> String {
        self.token(self.ids.other_teacher, "teacher_chen", Role::Teacher)
    }

    pub fn parent(&self) -> String {
        self.token(self.ids.parent, "parent_li", Role::Parent)
    }

    pub fn other_parent(&self) -> String {
        self.token(self.ids.other_parent, "parent_zhang", Role::Parent)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Reply> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), MAX_BODY).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {:?}", bytes))?
        };
        Ok(Reply { status, body, headers })
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Reply> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<Reply> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<Reply> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}

/// Parse a money field serialized as a decimal string
pub fn money(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_f64().and_then(|f| rust_decimal::Decimal::try_from(f).ok()))
        .unwrap_or_else(|| panic!("not a decimal: {}", value))
}
