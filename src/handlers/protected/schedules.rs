// handlers/protected/schedules.rs - /api/schedules

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::utils::{field_error, page_request};
use crate::auth::Role;
use crate::database::models::ScheduleEntry;
use crate::error::ApiError;
use crate::middleware::{perm, ApiResponse, ApiResult, Authorized, ValidJson, ValidQuery};
use crate::rules::schedule::{overlaps, ScheduleContext};
use crate::state::AppState;
use crate::types::Id;
use crate::validation::{self, ensure_time_order, paginate, FieldRule, FieldType, PageQuery};

const CREATE_SCHEDULE: &[FieldRule] = &[
    FieldRule::required("title", FieldType::String).max(100.0),
    FieldRule::required("teacherId", FieldType::Integer).min(1.0),
    FieldRule::required("room", FieldType::String).max(50.0),
    FieldRule::optional("classId", FieldType::Integer).min(1.0),
    FieldRule::required("startTime", FieldType::DateTime),
    FieldRule::required("endTime", FieldType::DateTime),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSchedule {
    title: String,
    teacher_id: Id,
    room: String,
    class_id: Option<Id>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    pub teacher_id: Option<Id>,
    pub class_id: Option<Id>,
    pub room: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /api/schedules - teachers only see their own slots
pub async fn list(
    State(state): State<AppState>,
    auth: Authorized<perm::ListSchedules>,
    ValidQuery(query): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<ScheduleFilter>,
) -> ApiResult<Vec<ScheduleEntry>> {
    let request = page_request(&state, &query)?;
    let own = (auth.role == Role::Teacher).then_some(auth.id);
    let room = filter.room.as_deref();

    let mut entries = state
        .db
        .schedules
        .find(&|e: &ScheduleEntry| {
            own.map_or(true, |id| e.teacher_id == id)
                && filter.teacher_id.map_or(true, |id| e.teacher_id == id)
                && filter.class_id.map_or(true, |id| e.class_id == Some(id))
                && room.map_or(true, |r| e.room == r)
                && filter.from.map_or(true, |from| e.end_time > from)
                && filter.to.map_or(true, |to| e.start_time < to)
        })
        .await?;
    entries.sort_by_key(|e| (e.start_time, e.id));

    Ok(ApiResponse::page(paginate(entries, request)))
}

/// POST /api/schedules - rejects overlapping slots for the same teacher or room
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<perm::CreateSchedule>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<ScheduleEntry> {
    let input: CreateSchedule = validation::parse(CREATE_SCHEDULE, body)?;
    ensure_time_order(input.start_time, input.end_time, "endTime")?;

    match state.db.users.get(input.teacher_id).await? {
        Some(user) if user.role == Role::Teacher => {}
        _ => return Err(field_error("teacherId", "teacherId must reference a teacher account")),
    }
    if let Some(class_id) = input.class_id {
        if state.db.classes.get(class_id).await?.is_none() {
            return Err(field_error("classId", "classId does not reference an existing class"));
        }
    }

    let room = input.room.trim().to_string();
    if room.is_empty() {
        return Err(field_error("room", "room must not be empty"));
    }

    let entry = ScheduleEntry {
        id: 0,
        version: 0,
        title: input.title.trim().to_string(),
        teacher_id: input.teacher_id,
        room,
        class_id: input.class_id,
        start_time: input.start_time,
        end_time: input.end_time,
    };

    let rules = &state.rules.schedule;
    let entry = state
        .db
        .schedules
        .insert_guarded(entry, &|candidate, others| {
            let ctx = ScheduleContext {
                candidate: candidate.clone(),
                existing: others
                    .iter()
                    .filter(|o| overlaps(candidate, o))
                    .map(|o| (*o).clone())
                    .collect(),
            };
            rules.evaluate(&ctx)?;
            Ok(())
        })
        .await
        .map_err(ApiError::from)?;

    tracing::info!("{} scheduled '{}' in {} ({})", auth.username, entry.title, entry.room, entry.id);
    Ok(ApiResponse::created(entry).with_message("Schedule created"))
}
