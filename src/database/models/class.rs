use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_entity;
use crate::types::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "小班")]
    Junior,
    #[serde(rename = "中班")]
    Middle,
    #[serde(rename = "大班")]
    Senior,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoom {
    pub id: Id,
    pub version: u32,
    pub name: String,
    pub grade: Grade,
    pub teacher_id: Id,
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(ClassRoom, "classes");

/// Class as returned to clients, with the roster size derived from students
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassView {
    #[serde(flatten)]
    pub class: ClassRoom,
    pub current_count: usize,
}
