use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_entity;
use crate::types::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "男")]
    Male,
    #[serde(rename = "女")]
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    #[serde(rename = "在读")]
    Enrolled,
    #[serde(rename = "已毕业")]
    Graduated,
    #[serde(rename = "已退学")]
    Withdrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Id,
    pub version: u32,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub parent_id: Id,
    pub class_id: Option<Id>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Student, "students");

impl Student {
    /// Counts toward a class roster
    pub fn is_active_in(&self, class_id: Id) -> bool {
        self.class_id == Some(class_id) && self.status == StudentStatus::Enrolled
    }
}
