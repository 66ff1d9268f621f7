use chrono::{DateTime, Utc};

use super::age::check_age;
use super::capacity::check_capacity;
use super::{Rule, RuleViolation};
use crate::database::models::{Activity, ActivityStatus, Student};

/// Snapshot taken under the registrations write lock
#[derive(Debug, Clone)]
pub struct RegistrationContext {
    pub activity: Activity,
    pub student: Student,
    /// Active registrations already held by the activity
    pub active_count: usize,
    pub already_registered: bool,
    pub now: DateTime<Utc>,
}

pub struct ActivityOpen;

impl Rule<RegistrationContext> for ActivityOpen {
    fn name(&self) -> &'static str {
        "activity_open"
    }

    fn check(&self, ctx: &RegistrationContext) -> Result<(), RuleViolation> {
        match ctx.activity.status {
            ActivityStatus::Open => Ok(()),
            ActivityStatus::PendingApproval => Err(RuleViolation::business(
                "Activity is awaiting approval and not open for registration",
            )),
            ActivityStatus::Cancelled | ActivityStatus::Finished => {
                Err(RuleViolation::business("Activity is not open for registration"))
            }
        }
    }
}

pub struct RegistrationDeadline;

impl Rule<RegistrationContext> for RegistrationDeadline {
    fn name(&self) -> &'static str {
        "registration_deadline"
    }

    fn check(&self, ctx: &RegistrationContext) -> Result<(), RuleViolation> {
        // without an explicit deadline registration closes when the activity starts
        let deadline = ctx.activity.registration_deadline.unwrap_or(ctx.activity.start_time);
        if ctx.now > deadline {
            return Err(RuleViolation::business("Registration deadline has passed"));
        }
        Ok(())
    }
}

pub struct NoDuplicateRegistration;

impl Rule<RegistrationContext> for NoDuplicateRegistration {
    fn name(&self) -> &'static str {
        "no_duplicate_registration"
    }

    fn check(&self, ctx: &RegistrationContext) -> Result<(), RuleViolation> {
        if ctx.already_registered {
            return Err(RuleViolation::business(
                "Student is already registered for this activity",
            ));
        }
        Ok(())
    }
}

pub struct ActivityCapacity;

impl Rule<RegistrationContext> for ActivityCapacity {
    fn name(&self) -> &'static str {
        "activity_capacity"
    }

    fn check(&self, ctx: &RegistrationContext) -> Result<(), RuleViolation> {
        check_capacity("Activity", ctx.active_count, 1, ctx.activity.capacity)
    }
}

pub struct AgeEligibility;

impl Rule<RegistrationContext> for AgeEligibility {
    fn name(&self) -> &'static str {
        "age_eligibility"
    }

    fn check(&self, ctx: &RegistrationContext) -> Result<(), RuleViolation> {
        // eligibility is judged on the day the activity takes place
        check_age(
            ctx.student.birth_date,
            ctx.activity.start_time.date_naive(),
            ctx.activity.min_age,
            ctx.activity.max_age,
        )
    }
}
