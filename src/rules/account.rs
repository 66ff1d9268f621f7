use super::capacity::check_capacity;
use super::{Rule, RuleViolation};
use crate::database::models::{ClassRoom, Student};
use crate::types::Id;

pub fn ensure_not_self(actor_id: Id, target_id: Id) -> Result<(), RuleViolation> {
    if actor_id == target_id {
        return Err(RuleViolation::business("You cannot delete your own account"));
    }
    Ok(())
}

/// Refuse a delete while `count` records of kind `dependents` still reference it
pub fn ensure_no_dependents(subject: &str, dependents: &str, count: usize) -> Result<(), RuleViolation> {
    if count > 0 {
        return Err(RuleViolation::dependents(format!(
            "Cannot delete {}: {} associated {} exist",
            subject, count, dependents
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TransferContext {
    pub student: Student,
    pub target: ClassRoom,
    /// Students currently in the target class
    pub target_count: usize,
}

pub struct NotSameClass;

impl Rule<TransferContext> for NotSameClass {
    fn name(&self) -> &'static str {
        "not_same_class"
    }

    fn check(&self, ctx: &TransferContext) -> Result<(), RuleViolation> {
        if ctx.student.class_id == Some(ctx.target.id) {
            return Err(RuleViolation::business("Student is already in this class"));
        }
        Ok(())
    }
}

pub struct TargetClassCapacity;

impl Rule<TransferContext> for TargetClassCapacity {
    fn name(&self) -> &'static str {
        "target_class_capacity"
    }

    fn check(&self, ctx: &TransferContext) -> Result<(), RuleViolation> {
        check_capacity("Class", ctx.target_count, 1, ctx.target.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleting_self_is_refused() {
        assert!(ensure_not_self(1, 1).is_err());
        assert!(ensure_not_self(1, 2).is_ok());
    }

    #[test]
    fn dependents_are_a_foreign_key_style_violation() {
        let err = ensure_no_dependents("class", "students", 3).unwrap_err();
        assert!(matches!(err, RuleViolation::Dependents(_)));
        assert!(ensure_no_dependents("class", "students", 0).is_ok());
    }
}
