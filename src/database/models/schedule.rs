use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_entity;
use crate::types::Id;

/// One timetable slot. The interval is half-open: `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: Id,
    pub version: u32,
    pub title: String,
    pub teacher_id: Id,
    pub room: String,
    pub class_id: Option<Id>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl_entity!(ScheduleEntry, "schedules");
