use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub pagination: PaginationConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

/// Tunables for the business rules. Age bounds are inclusive, in whole years.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub student_min_age: u32,
    pub student_max_age: u32,
    pub activity_min_capacity: u32,
    pub activity_max_capacity: u32,
    /// Activities with a fee strictly above this amount need admin approval
    pub activity_fee_approval_threshold: Decimal,
}

/// Errors loading a config file named by APP_CONFIG_FILE
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let base = match env::var("APP_CONFIG_FILE") {
            Ok(path) => match Self::from_yaml_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring config file: {}", e);
                    Self::preset(environment)
                }
            },
            Err(_) => Self::preset(environment),
        };

        base.with_env_overrides()
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("KINDER_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Pagination overrides
        if let Ok(v) = env::var("PAGINATION_DEFAULT_LIMIT") {
            self.pagination.default_limit = v.parse().unwrap_or(self.pagination.default_limit);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_LIMIT") {
            self.pagination.max_limit = v.parse().unwrap_or(self.pagination.max_limit);
        }

        // Rule overrides
        if let Ok(v) = env::var("RULES_STUDENT_MIN_AGE") {
            self.rules.student_min_age = v.parse().unwrap_or(self.rules.student_min_age);
        }
        if let Ok(v) = env::var("RULES_STUDENT_MAX_AGE") {
            self.rules.student_max_age = v.parse().unwrap_or(self.rules.student_max_age);
        }
        if let Ok(v) = env::var("RULES_ACTIVITY_FEE_APPROVAL_THRESHOLD") {
            self.rules.activity_fee_approval_threshold =
                v.parse().unwrap_or(self.rules.activity_fee_approval_threshold);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                port: 3000,
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                jwt_secret: "kinder-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                enable_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string()],
            },
            pagination: PaginationConfig {
                default_limit: 20,
                max_limit: 100,
            },
            rules: RulesConfig::default(),
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                port: 3000,
                enable_rate_limiting: true,
                rate_limit_requests: 300,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 512 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.kinder.example.com".to_string()],
            },
            pagination: PaginationConfig {
                default_limit: 20,
                max_limit: 100,
            },
            rules: RulesConfig::default(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                port: 8080,
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 256 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 8,
                enable_cors: true,
                cors_origins: vec!["https://kinder.example.com".to_string()],
            },
            pagination: PaginationConfig {
                default_limit: 20,
                max_limit: 50,
            },
            rules: RulesConfig::default(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            student_min_age: 3,
            student_max_age: 7,
            activity_min_capacity: 1,
            activity_max_capacity: 100,
            activity_fee_approval_threshold: Decimal::new(500, 0),
        }
    }
}

// Global config - read once at startup by the binary. The router itself takes
// an explicit AppConfig through AppState.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        $crate::config::CONFIG.is_production()
    };
}
