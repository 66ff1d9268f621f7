use super::RuleViolation;

/// `current + requested <= capacity`, reported against `subject` ("Activity", "Class")
pub fn check_capacity(subject: &str, current: usize, requested: usize, capacity: u32) -> Result<(), RuleViolation> {
    if current.saturating_add(requested) > capacity as usize {
        return Err(RuleViolation::business(format!("{} is at full capacity", subject)));
    }
    Ok(())
}

/// A class may not shrink below the students already assigned to it
pub fn check_capacity_shrink(new_capacity: u32, current: usize) -> Result<(), RuleViolation> {
    if (new_capacity as usize) < current {
        return Err(RuleViolation::business(
            "Capacity cannot be smaller than current student count",
        ));
    }
    Ok(())
}
