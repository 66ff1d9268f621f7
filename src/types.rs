/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Store-allocated record identifier
pub type Id = i64;

/// Actions a caller can attempt against a resource.
/// Used by the permission table and by handler permission markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    Approve,
    Register,
    Cancel,
    Transfer,
    Review,
}

/// Resources guarded by the permission table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
    Students,
    Classes,
    Teachers,
    Activities,
    Registrations,
    Schedules,
    EnrollmentPlans,
    EnrollmentApplications,
    Payments,
    SystemSettings,
}
