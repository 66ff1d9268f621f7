use super::{Rule, RuleViolation};
use crate::database::models::ApplicationStatus;

/// A status that moves forward through a fixed sequence
pub trait StatusFlow: Copy + PartialEq + Send + Sync {
    fn can_transition_to(&self, next: Self) -> bool;

    fn label(&self) -> &'static str;
}

impl StatusFlow for ApplicationStatus {
    fn can_transition_to(&self, next: Self) -> bool {
        use ApplicationStatus::*;

        match (*self, next) {
            // terminal
            (Rejected, _) | (Enrolled, _) => false,
            (_, Enrolled) => *self == Approved,
            (from, to) => to > from,
        }
    }

    fn label(&self) -> &'static str {
        ApplicationStatus::label(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<S> {
    pub from: S,
    pub to: S,
}

pub fn check_transition<S: StatusFlow>(from: S, to: S) -> Result<(), RuleViolation> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(RuleViolation::InvalidTransition {
            from: from.label().to_string(),
            to: to.label().to_string(),
        })
    }
}

pub struct ForwardOnly;

impl<S: StatusFlow> Rule<TransitionContext<S>> for ForwardOnly {
    fn name(&self) -> &'static str {
        "forward_only_status"
    }

    fn check(&self, ctx: &TransitionContext<S>) -> Result<(), RuleViolation> {
        check_transition(ctx.from, ctx.to)
    }
}
