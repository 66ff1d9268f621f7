pub mod password;
pub mod permissions;

pub use password::{hash_password, verify_password, PasswordError};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::Id;

/// Flat role set. No role inherits another's permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Principal,
    Teacher,
    Parent,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Principal, Role::Teacher, Role::Parent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Principal => "principal",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        }
    }

    /// Admins and principals see every record regardless of ownership
    pub fn bypasses_ownership(&self) -> bool {
        matches!(self, Role::Admin | Role::Principal)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "principal" => Ok(Role::Principal),
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Id,
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Id, username: impl Into<String>, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            username: username.into(),
            role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("JWT secret is not configured")]
    InvalidSecret,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::new(Algorithm::HS256);

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry. Expiry is exact: no leeway is granted.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn issued_token_validates() {
        let claims = Claims::new(7, "teacher_li", Role::Teacher, 1);
        let token = generate_jwt(&claims, SECRET).unwrap();
        let decoded = validate_jwt(&token, SECRET).unwrap();

        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.role, Role::Teacher);
        assert_eq!(decoded.username, "teacher_li");
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let mut claims = Claims::new(1, "admin", Role::Admin, 1);
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 10;
        let token = generate_jwt(&claims, SECRET).unwrap();

        assert!(matches!(validate_jwt(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_invalid() {
        let token = generate_jwt(&Claims::new(1, "admin", Role::Admin, 1), SECRET).unwrap();

        assert!(matches!(validate_jwt(&token, "another-secret"), Err(JwtError::Invalid(_))));
        assert!(matches!(validate_jwt("not.a.jwt", SECRET), Err(JwtError::Invalid(_))));

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(validate_jwt(&tampered, SECRET), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let claims = Claims::new(1, "admin", Role::Admin, 1);
        assert!(matches!(generate_jwt(&claims, ""), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn roles_parse_from_wire_names() {
        assert_eq!("principal".parse::<Role>(), Ok(Role::Principal));
        assert!("superuser".parse::<Role>().is_err());
        assert!(Role::Admin.bypasses_ownership());
        assert!(!Role::Parent.bypasses_ownership());
    }
}
