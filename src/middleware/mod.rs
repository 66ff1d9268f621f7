pub mod auth;
pub mod authorize;
pub mod json;
pub mod rate_limit;
pub mod request_id;
pub mod response;

pub use auth::{jwt_auth_middleware, Identity};
pub use authorize::{ensure_owner, ensure_owns, perm, Authorized};
pub use json::{ValidJson, ValidPath, ValidQuery};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use request_id::{current_request_id, request_id_middleware};
pub use response::{ApiResponse, ApiResult};
