//! Role and ownership gates.
//!
//! Handlers declare the permission they need in their signature with
//! `Authorized<perm::CreateStudent>`. The extractor runs before any body
//! extractor, so a denied request never reaches validation.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;
use std::ops::Deref;

use crate::auth::permissions::is_allowed;
use crate::database::models::{Registration, Student, User};
use crate::error::ApiError;
use crate::middleware::auth::Identity;
use crate::types::{Action, Id, Resource};

/// A row of the permission table, named at the type level
pub trait Permission: Send + Sync + 'static {
    const RESOURCE: Resource;
    const ACTION: Action;
}

macro_rules! permissions {
    ($($name:ident => ($resource:ident, $action:ident)),* $(,)?) => {
        $(
            pub struct $name;

            impl super::Permission for $name {
                const RESOURCE: crate::types::Resource = crate::types::Resource::$resource;
                const ACTION: crate::types::Action = crate::types::Action::$action;
            }
        )*
    };
}

pub mod perm {
    permissions! {
        ListUsers => (Users, List),
        ReadUser => (Users, Read),
        CreateUser => (Users, Create),
        UpdateUser => (Users, Update),
        DeleteUser => (Users, Delete),
        ListStudents => (Students, List),
        ReadStudent => (Students, Read),
        CreateStudent => (Students, Create),
        UpdateStudent => (Students, Update),
        DeleteStudent => (Students, Delete),
        TransferStudent => (Students, Transfer),
        ListClasses => (Classes, List),
        ReadClass => (Classes, Read),
        CreateClass => (Classes, Create),
        UpdateClass => (Classes, Update),
        DeleteClass => (Classes, Delete),
        ReadTeacher => (Teachers, Read),
        ListActivities => (Activities, List),
        ReadActivity => (Activities, Read),
        CreateActivity => (Activities, Create),
        ApproveActivity => (Activities, Approve),
        CancelActivity => (Activities, Cancel),
        RegisterActivity => (Activities, Register),
        ReviewActivity => (Activities, Review),
        CancelRegistration => (Registrations, Cancel),
        ListSchedules => (Schedules, List),
        CreateSchedule => (Schedules, Create),
        ListPlans => (EnrollmentPlans, List),
        CreatePlan => (EnrollmentPlans, Create),
        ListApplications => (EnrollmentApplications, List),
        SubmitApplication => (EnrollmentApplications, Create),
        ReviewApplication => (EnrollmentApplications, Update),
        ListPayments => (Payments, List),
        RecordPayment => (Payments, Create),
        ReadSettings => (SystemSettings, Read),
        UpdateSettings => (SystemSettings, Update),
    }
}

pub fn authorize(identity: &Identity, resource: Resource, action: Action) -> Result<(), ApiError> {
    if is_allowed(identity.role, resource, action) {
        return Ok(());
    }
    tracing::warn!(
        "Denied {} ({}) {:?} on {:?}",
        identity.username, identity.role, action, resource
    );
    Err(ApiError::insufficient_permissions())
}

/// The authenticated identity, proven to hold permission `P`
pub struct Authorized<P: Permission>(pub Identity, PhantomData<P>);

impl<P: Permission> Deref for Authorized<P> {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

#[async_trait]
impl<S: Send + Sync, P: Permission> FromRequestParts<S> for Authorized<P> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        authorize(&identity, P::RESOURCE, P::ACTION)?;
        Ok(Self(identity, PhantomData))
    }
}

/// Records that belong to a single user account
pub trait Owned {
    fn owner_id(&self) -> Id;
}

impl Owned for User {
    fn owner_id(&self) -> Id {
        self.id
    }
}

impl Owned for Student {
    fn owner_id(&self) -> Id {
        self.parent_id
    }
}

impl Owned for Registration {
    fn owner_id(&self) -> Id {
        self.parent_id
    }
}

/// Admins and principals pass; everyone else must own the record
pub fn ensure_owner(identity: &Identity, owner_id: Id) -> Result<(), ApiError> {
    if identity.role.bypasses_ownership() || identity.id == owner_id {
        return Ok(());
    }
    tracing::warn!("{} denied access to a record owned by {}", identity.username, owner_id);
    Err(ApiError::forbidden("You can only access your own records"))
}

pub fn ensure_owns<T: Owned>(identity: &Identity, record: &T) -> Result<(), ApiError> {
    ensure_owner(identity, record.owner_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn identity(id: Id, role: Role) -> Identity {
        Identity {
            id,
            username: format!("user{}", id),
            role,
        }
    }

    #[test]
    fn management_bypasses_ownership() {
        assert!(ensure_owner(&identity(1, Role::Admin), 99).is_ok());
        assert!(ensure_owner(&identity(2, Role::Principal), 99).is_ok());
    }

    #[test]
    fn others_must_own_the_record() {
        assert!(ensure_owner(&identity(5, Role::Parent), 5).is_ok());
        let err = ensure_owner(&identity(5, Role::Parent), 6).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert!(ensure_owner(&identity(3, Role::Teacher), 4).is_err());
    }

    #[test]
    fn role_gate_uses_permission_table() {
        let parent = identity(5, Role::Parent);
        assert!(authorize(&parent, Resource::SystemSettings, Action::Read).is_err());
        assert!(authorize(&parent, Resource::Activities, Action::Register).is_ok());
        assert_eq!(
            authorize(&parent, Resource::Users, Action::Create).unwrap_err().error_code(),
            "INSUFFICIENT_PERMISSIONS"
        );
    }

    #[tokio::test]
    async fn extractor_rejects_before_handler() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        parts.extensions.insert(identity(5, Role::Teacher));

        let denied = Authorized::<perm::DeleteStudent>::from_request_parts(&mut parts, &()).await;
        assert_eq!(denied.err().map(|e| e.error_code()), Some("INSUFFICIENT_PERMISSIONS"));

        let allowed = Authorized::<perm::ListClasses>::from_request_parts(&mut parts, &()).await;
        assert_eq!(allowed.ok().map(|a| a.id), Some(5));
    }
}
