use super::{Rule, RuleViolation};
use crate::database::models::ScheduleEntry;

#[derive(Debug, Clone)]
pub struct ScheduleContext {
    pub candidate: ScheduleEntry,
    pub existing: Vec<ScheduleEntry>,
}

/// Half-open intervals `[start, end)`: touching endpoints do not overlap
pub fn overlaps(a: &ScheduleEntry, b: &ScheduleEntry) -> bool {
    a.start_time < b.end_time && b.start_time < a.end_time
}

pub struct NoScheduleConflict;

impl Rule<ScheduleContext> for NoScheduleConflict {
    fn name(&self) -> &'static str {
        "no_schedule_conflict"
    }

    fn check(&self, ctx: &ScheduleContext) -> Result<(), RuleViolation> {
        let candidate = &ctx.candidate;

        for other in ctx.existing.iter().filter(|o| o.id != candidate.id) {
            if !overlaps(candidate, other) {
                continue;
            }
            if other.teacher_id == candidate.teacher_id {
                return Err(RuleViolation::business(format!(
                    "Schedule conflict: teacher is already scheduled for '{}' at that time",
                    other.title
                )));
            }
            if other.room == candidate.room {
                return Err(RuleViolation::business(format!(
                    "Schedule conflict: room {} is already booked for '{}' at that time",
                    other.room, other.title
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn entry(id: i64, teacher_id: i64, room: &str, start: DateTime<Utc>, hours: i64) -> ScheduleEntry {
        ScheduleEntry {
            id,
            version: 1,
            title: format!("课程{}", id),
            teacher_id,
            room: room.to_string(),
            class_id: None,
            start_time: start,
            end_time: start + Duration::hours(hours),
        }
    }

    fn check(candidate: ScheduleEntry, existing: Vec<ScheduleEntry>) -> Result<(), RuleViolation> {
        NoScheduleConflict.check(&ScheduleContext { candidate, existing })
    }

    #[test]
    fn back_to_back_slots_do_not_conflict() {
        let t = Utc::now();
        let first = entry(1, 10, "A101", t, 1);
        let second = entry(0, 10, "A101", t + Duration::hours(1), 1);
        assert!(check(second, vec![first]).is_ok());
    }

    #[test]
    fn same_teacher_overlap_conflicts() {
        let t = Utc::now();
        let err = check(entry(0, 10, "B2", t + Duration::minutes(30), 1), vec![entry(1, 10, "A101", t, 1)])
            .unwrap_err();
        assert!(err.to_string().starts_with("Schedule conflict"));
    }

    #[test]
    fn same_room_overlap_conflicts() {
        let t = Utc::now();
        assert!(check(entry(0, 11, "A101", t, 2), vec![entry(1, 10, "A101", t + Duration::hours(1), 1)]).is_err());
    }

    #[test]
    fn different_teacher_and_room_may_overlap() {
        let t = Utc::now();
        assert!(check(entry(0, 11, "B2", t, 2), vec![entry(1, 10, "A101", t, 2)]).is_ok());
    }
}
