use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::state::AppState;

const MAX_TRACKED_CLIENTS: usize = 10_000;

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window closes
    pub reset_after: u64,
}

/// Fixed-window request counter keyed by client
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut clients = self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if clients.len() >= MAX_TRACKED_CLIENTS {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(entry.started))
            .as_secs()
            .max(1);

        if entry.count >= self.limit {
            return Decision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_after,
            };
        }

        entry.count += 1;
        Decision {
            allowed: true,
            limit: self.limit,
            remaining: self.limit - entry.count,
            reset_after,
        }
    }
}

/// Client address: the socket peer when known, else the first forwarded hop
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
    let pairs = [
        (&X_RATELIMIT_LIMIT, decision.limit as u64),
        (&X_RATELIMIT_REMAINING, decision.remaining as u64),
        (&X_RATELIMIT_RESET, decision.reset_after),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
            headers.insert(name.clone(), value);
        }
    }
}

pub async fn rate_limit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.api.enable_rate_limiting {
        return next.run(request).await;
    }

    let key = client_key(&request);
    let decision = state.limiter.check(&key);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!("Rate limit exceeded for {}", key);
        ApiError::rate_limited(decision.reset_after).into_response()
    };

    apply_headers(response.headers_mut(), &decision);
    response
}
