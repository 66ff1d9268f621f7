//! Business rules evaluated after validation.
//!
//! A [`RuleSet`] runs its rules in registration order and stops at the first
//! violation. Rule sets whose checks depend on other rows (capacity, duplicate
//! registration, schedule conflicts) are evaluated inside a guarded store write
//! so the check and the write cannot interleave with a concurrent request.

pub mod account;
pub mod age;
pub mod cancellation;
pub mod capacity;
pub mod error;
pub mod registration;
pub mod schedule;
pub mod status;

pub use error::RuleViolation;

use crate::database::models::ApplicationStatus;

/// A named check over a context `C`
pub trait Rule<C>: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &C) -> Result<(), RuleViolation>;
}

/// Ordered list of rules for one operation
pub struct RuleSet<C> {
    name: &'static str,
    rules: Vec<Box<dyn Rule<C>>>,
}

impl<C> RuleSet<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rules: Vec::new(),
        }
    }

    pub fn with(mut self, rule: impl Rule<C> + 'static) -> Self {
        tracing::debug!("Registered rule '{}' in set '{}'", rule.name(), self.name);
        self.rules.push(Box::new(rule));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn evaluate(&self, ctx: &C) -> Result<(), RuleViolation> {
        for rule in &self.rules {
            tracing::trace!("Evaluating rule '{}' in set '{}'", rule.name(), self.name);
            if let Err(violation) = rule.check(ctx) {
                tracing::warn!("Rule '{}' rejected '{}': {}", rule.name(), self.name, violation);
                return Err(violation);
            }
        }
        Ok(())
    }
}

/// Every rule set the handlers consult, built once at startup
pub struct RuleBook {
    pub registration: RuleSet<registration::RegistrationContext>,
    pub schedule: RuleSet<schedule::ScheduleContext>,
    pub transfer: RuleSet<account::TransferContext>,
    pub application: RuleSet<status::TransitionContext<ApplicationStatus>>,
}

impl RuleBook {
    pub fn standard() -> Self {
        Self {
            registration: RuleSet::new("activity_registration")
                .with(registration::ActivityOpen)
                .with(registration::RegistrationDeadline)
                .with(registration::NoDuplicateRegistration)
                .with(registration::ActivityCapacity)
                .with(registration::AgeEligibility),
            schedule: RuleSet::new("schedule_entry").with(schedule::NoScheduleConflict),
            transfer: RuleSet::new("student_transfer")
                .with(account::NotSameClass)
                .with(account::TargetClassCapacity),
            application: RuleSet::new("application_status").with(status::ForwardOnly),
        }
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::standard()
    }
}
