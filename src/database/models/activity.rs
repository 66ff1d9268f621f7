use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::impl_entity;
use crate::types::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityStatus {
    #[serde(rename = "待审核")]
    PendingApproval,
    #[serde(rename = "开放报名")]
    Open,
    #[serde(rename = "已取消")]
    Cancelled,
    #[serde(rename = "已结束")]
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Id,
    pub version: u32,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
    pub fee: Decimal,
    pub status: ActivityStatus,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub created_by: Id,
    pub created_at: DateTime<Utc>,
}

impl_entity!(Activity, "activities");

/// Activity as returned to clients, with its active registration count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    #[serde(flatten)]
    pub activity: Activity,
    pub registered_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    #[serde(rename = "已报名")]
    Registered,
    #[serde(rename = "已取消")]
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Id,
    pub version: u32,
    pub activity_id: Id,
    pub student_id: Id,
    pub parent_id: Id,
    pub status: RegistrationStatus,
    pub fee: Decimal,
    pub registered_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_fee: Option<Decimal>,
    pub refund: Option<Decimal>,
}

impl_entity!(Registration, "registrations");

impl Registration {
    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Registered
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Id,
    pub version: u32,
    pub activity_id: Id,
    pub author_id: Id,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl_entity!(Feedback, "activity_feedback");
