use serde_json::json;

use crate::auth::{generate_jwt, Claims, Role};
use crate::cli::{utils::output_success, OutputFormat};
use crate::config;

pub fn handle(user_id: i64, username: &str, role: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    let security = &config::config().security;
    if security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set to issue tokens");
    }

    let claims = Claims::new(user_id, username, role, security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({ "token": token, "expiresAt": claims.exp })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
