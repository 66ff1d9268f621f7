use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_entity;
use crate::types::Id;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPlan {
    pub id: Id,
    pub version: u32,
    pub title: String,
    pub year: i32,
    pub capacity: u32,
    pub min_age: u32,
    pub max_age: u32,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl_entity!(EnrollmentPlan, "enrollment_plans");

/// Review sequence of an application. Declaration order is the forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "待审核")]
    Pending,
    #[serde(rename = "需补充材料")]
    NeedsMaterials,
    #[serde(rename = "已通过")]
    Approved,
    #[serde(rename = "已拒绝")]
    Rejected,
    #[serde(rename = "已入学")]
    Enrolled,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "待审核",
            ApplicationStatus::NeedsMaterials => "需补充材料",
            ApplicationStatus::Approved => "已通过",
            ApplicationStatus::Rejected => "已拒绝",
            ApplicationStatus::Enrolled => "已入学",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentApplication {
    pub id: Id,
    pub version: u32,
    pub enrollment_plan_id: Id,
    pub student_name: String,
    pub birth_date: NaiveDate,
    pub parent_name: String,
    pub parent_phone: String,
    pub status: ApplicationStatus,
    pub review_note: Option<String>,
    pub submitted_by: Id,
    pub submitted_at: DateTime<Utc>,
}

impl_entity!(EnrollmentApplication, "enrollment_applications");
