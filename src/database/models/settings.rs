use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_entity;
use crate::types::Id;

/// Singleton row holding the kindergarten-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub id: Id,
    pub version: u32,
    pub kindergarten_name: String,
    pub ai_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(SystemSettings, "system_settings");
