use chrono::{Datelike, NaiveDate};

use super::RuleViolation;

/// Completed years between `birth_date` and `on`. Zero for future birth dates.
pub fn age_on(birth_date: NaiveDate, on: NaiveDate) -> u32 {
    if birth_date > on {
        return 0;
    }
    let mut years = on.year() - birth_date.year();
    if (on.month(), on.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Inclusive bounds; either side may be open
pub fn check_age(
    birth_date: NaiveDate,
    on: NaiveDate,
    min: Option<u32>,
    max: Option<u32>,
) -> Result<(), RuleViolation> {
    let age = age_on(birth_date, on);
    let too_young = min.is_some_and(|min| age < min);
    let too_old = max.is_some_and(|max| age > max);

    if too_young || too_old {
        let range = match (min, max) {
            (Some(min), Some(max)) => format!("between {} and {}", min, max),
            (Some(min), None) => format!("at least {}", min),
            (None, Some(max)) => format!("at most {}", max),
            (None, None) => unreachable!("no bound can be violated"),
        };
        return Err(RuleViolation::business(format!(
            "Student age {} is not eligible, age must be {} years",
            age, range
        )));
    }
    Ok(())
}
