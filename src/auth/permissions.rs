//! Declarative permission table: role x resource x action -> allow.
//!
//! Anything not listed is denied. Ownership is a separate, later check; a row
//! here only says which roles may attempt the action at all.

use super::Role;
use crate::types::{Action, Resource};

use Role::{Admin, Parent, Principal, Teacher};

const EVERYONE: &[Role] = &[Admin, Principal, Teacher, Parent];
const STAFF: &[Role] = &[Admin, Principal, Teacher];
const MANAGEMENT: &[Role] = &[Admin, Principal];
const ADMIN_ONLY: &[Role] = &[Admin];
const FAMILIES_AND_MANAGEMENT: &[Role] = &[Admin, Principal, Parent];

pub const PERMISSIONS: &[(Resource, Action, &[Role])] = &[
    // Users: management is admin-only, profile read/update is ownership-gated
    (Resource::Users, Action::List, ADMIN_ONLY),
    (Resource::Users, Action::Create, ADMIN_ONLY),
    (Resource::Users, Action::Delete, ADMIN_ONLY),
    (Resource::Users, Action::Read, EVERYONE),
    (Resource::Users, Action::Update, EVERYONE),
    // Students
    (Resource::Students, Action::List, EVERYONE),
    (Resource::Students, Action::Read, EVERYONE),
    (Resource::Students, Action::Create, MANAGEMENT),
    (Resource::Students, Action::Update, MANAGEMENT),
    (Resource::Students, Action::Delete, MANAGEMENT),
    (Resource::Students, Action::Transfer, MANAGEMENT),
    // Classes
    (Resource::Classes, Action::List, STAFF),
    (Resource::Classes, Action::Read, STAFF),
    (Resource::Classes, Action::Create, MANAGEMENT),
    (Resource::Classes, Action::Update, MANAGEMENT),
    (Resource::Classes, Action::Delete, MANAGEMENT),
    (Resource::Teachers, Action::Read, STAFF),
    // Activities and registrations
    (Resource::Activities, Action::List, EVERYONE),
    (Resource::Activities, Action::Read, EVERYONE),
    (Resource::Activities, Action::Create, STAFF),
    (Resource::Activities, Action::Approve, MANAGEMENT),
    (Resource::Activities, Action::Cancel, MANAGEMENT),
    (Resource::Activities, Action::Register, FAMILIES_AND_MANAGEMENT),
    (Resource::Activities, Action::Review, FAMILIES_AND_MANAGEMENT),
    (Resource::Registrations, Action::Cancel, FAMILIES_AND_MANAGEMENT),
    // Timetable
    (Resource::Schedules, Action::List, STAFF),
    (Resource::Schedules, Action::Create, MANAGEMENT),
    // Enrollment
    (Resource::EnrollmentPlans, Action::List, EVERYONE),
    (Resource::EnrollmentPlans, Action::Create, ADMIN_ONLY),
    (Resource::EnrollmentApplications, Action::Create, FAMILIES_AND_MANAGEMENT),
    (Resource::EnrollmentApplications, Action::List, MANAGEMENT),
    (Resource::EnrollmentApplications, Action::Update, MANAGEMENT),
    // Finance
    (Resource::Payments, Action::List, FAMILIES_AND_MANAGEMENT),
    (Resource::Payments, Action::Create, MANAGEMENT),
    // System settings
    (Resource::SystemSettings, Action::Read, ADMIN_ONLY),
    (Resource::SystemSettings, Action::Update, ADMIN_ONLY),
];

/// Roles allowed to perform `action` on `resource`; empty when nobody is
pub fn allowed_roles(resource: Resource, action: Action) -> &'static [Role] {
    PERMISSIONS
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, roles)| *roles)
        .unwrap_or(&[])
}

pub fn is_allowed(role: Role, resource: Resource, action: Action) -> bool {
    allowed_roles(resource, action).contains(&role)
}
