// handlers/protected/activities.rs - /api/activities, registrations and feedback

use axum::extract::State;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::utils::{field_error, matches_search, page_request, parse_label};
use crate::auth::Role;
use crate::config::RulesConfig;
use crate::database::models::{
    Activity, ActivityStatus, ActivityView, Feedback, Registration, RegistrationStatus,
};
use crate::database::{Database, DatabaseError};
use crate::error::ApiError;
use crate::middleware::{ensure_owns, perm, ApiResponse, ApiResult, Authorized, ValidJson, ValidPath, ValidQuery};
use crate::rules::cancellation;
use crate::rules::registration::RegistrationContext;
use crate::state::AppState;
use crate::types::Id;
use crate::validation::{self, ensure_time_order, paginate, FieldRule, FieldType, Page, PageQuery};

/// Field rules for a new activity. Capacity bounds come from configuration.
fn create_rules(rules: &RulesConfig) -> Vec<FieldRule> {
    vec![
        FieldRule::required("title", FieldType::String).max(100.0),
        FieldRule::required("type", FieldType::String).max(30.0),
        FieldRule::optional("description", FieldType::String).max(1000.0),
        FieldRule::optional("location", FieldType::String).max(100.0),
        FieldRule::required("startTime", FieldType::DateTime).not_past(),
        FieldRule::required("endTime", FieldType::DateTime),
        FieldRule::required("capacity", FieldType::Integer)
            .range(rules.activity_min_capacity as f64, rules.activity_max_capacity as f64),
        FieldRule::optional("fee", FieldType::Number).min(0.0),
        FieldRule::optional("registrationDeadline", FieldType::DateTime).not_past(),
        FieldRule::optional("minAge", FieldType::Integer).range(0.0, 18.0),
        FieldRule::optional("maxAge", FieldType::Integer).range(0.0, 18.0),
    ]
}

const REGISTER: &[FieldRule] = &[FieldRule::required("studentId", FieldType::Integer).min(1.0)];

const FEEDBACK: &[FieldRule] = &[
    FieldRule::required("rating", FieldType::Integer).range(1.0, 5.0),
    FieldRule::optional("comment", FieldType::String).max(500.0),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateActivity {
    title: String,
    #[serde(rename = "type")]
    kind: String,
    description: Option<String>,
    location: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    capacity: u32,
    fee: Option<Decimal>,
    registration_deadline: Option<DateTime<Utc>>,
    min_age: Option<u32>,
    max_age: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    student_id: Id,
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    rating: u8,
    comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityFilter {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub search: Option<String>,
}

async fn view(db: &Database, activity: Activity) -> Result<ActivityView, ApiError> {
    let id = activity.id;
    let registered_count = db
        .registrations
        .count(&|r: &Registration| r.activity_id == id && r.is_active())
        .await?;
    Ok(ActivityView { activity, registered_count })
}

/// GET /api/activities - parents do not see activities awaiting approval
pub async fn list(
    State(state): State<AppState>,
    auth: Authorized<perm::ListActivities>,
    ValidQuery(query): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<ActivityFilter>,
) -> ApiResult<Vec<ActivityView>> {
    let request = page_request(&state, &query)?;
    let status: Option<ActivityStatus> = parse_label("status", filter.status.as_deref())?;
    let kind = filter.kind.as_deref();
    let search = filter.search.as_deref();
    let hide_pending = auth.role == Role::Parent;

    let mut activities = state
        .db
        .activities
        .find(&|a: &Activity| {
            !(hide_pending && a.status == ActivityStatus::PendingApproval)
                && status.map_or(true, |s| a.status == s)
                && kind.map_or(true, |k| a.kind == k)
                && matches_search(&a.title, search)
        })
        .await?;
    activities.sort_by_key(|a| (a.start_time, a.id));

    let page = paginate(activities, request);
    let registrations = state.db.registrations.find(&|r: &Registration| r.is_active()).await?;
    let items = page
        .items
        .into_iter()
        .map(|activity| {
            let registered_count = registrations.iter().filter(|r| r.activity_id == activity.id).count();
            ActivityView { activity, registered_count }
        })
        .collect();

    Ok(ApiResponse::page(Page {
        items,
        pagination: page.pagination,
    }))
}

/// POST /api/activities - fees above the approval threshold start as 待审核
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<perm::CreateActivity>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<ActivityView> {
    let input: CreateActivity = validation::parse(&create_rules(&state.config.rules), body)?;

    ensure_time_order(input.start_time, input.end_time, "endTime")?;
    if input.registration_deadline.is_some_and(|d| d > input.start_time) {
        return Err(field_error(
            "registrationDeadline",
            "Registration deadline must not be after start time",
        ));
    }
    if let (Some(min), Some(max)) = (input.min_age, input.max_age) {
        if min > max {
            return Err(field_error("maxAge", "maxAge must not be less than minAge"));
        }
    }

    let fee = input.fee.unwrap_or(Decimal::ZERO);
    let needs_approval = fee > state.config.rules.activity_fee_approval_threshold;
    let status = if needs_approval {
        ActivityStatus::PendingApproval
    } else {
        ActivityStatus::Open
    };

    let activity = state
        .db
        .activities
        .insert(Activity {
            id: 0,
            version: 0,
            title: input.title.trim().to_string(),
            kind: input.kind.trim().to_string(),
            description: input.description,
            location: input.location,
            start_time: input.start_time,
            end_time: input.end_time,
            capacity: input.capacity,
            fee,
            status,
            registration_deadline: input.registration_deadline,
            min_age: input.min_age,
            max_age: input.max_age,
            created_by: auth.id,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!("{} created activity {} ({:?})", auth.username, activity.id, activity.status);

    let message = if needs_approval {
        "Activity created and awaiting approval"
    } else {
        "Activity created"
    };
    Ok(ApiResponse::created(ActivityView { activity, registered_count: 0 }).with_message(message))
}

/// A registration withdrawn by the organiser: no fee, the whole amount back
fn full_refund(registration: Registration, now: DateTime<Utc>) -> Registration {
    let refund = registration.fee;
    Registration {
        status: RegistrationStatus::Cancelled,
        cancelled_at: Some(now),
        cancellation_fee: Some(Decimal::ZERO),
        refund: Some(refund),
        ..registration
    }
}

/// Refund every active registration of a cancelled activity. Repeats until a
/// pass finds nothing active, so rows that land or change mid-sweep are
/// picked up on the next pass.
async fn refund_active_registrations(db: &Database, id: Id, now: DateTime<Utc>) -> Result<usize, ApiError> {
    let mut refunded = 0;
    loop {
        let active = db
            .registrations
            .find(&|r: &Registration| r.activity_id == id && r.is_active())
            .await?;
        if active.is_empty() {
            return Ok(refunded);
        }

        for registration in active {
            let version = Some(registration.version);
            match db.registrations.update(full_refund(registration, now), version).await {
                Ok(_) => refunded += 1,
                Err(DatabaseError::VersionConflict { .. }) => {}
                Err(e) => {
                    tracing::error!("Refund for activity {} interrupted: {}", id, e);
                    return Err(DatabaseError::Aborted(format!("cancelling registrations of activity {}", id)).into());
                }
            }
        }
    }
}

/// GET /api/activities/:id
pub async fn get(
    State(state): State<AppState>,
    auth: Authorized<perm::ReadActivity>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<ActivityView> {
    let activity = state.db.activities.get_404(id).await?;
    if auth.role == Role::Parent && activity.status == ActivityStatus::PendingApproval {
        return Err(ApiError::not_found(format!("activities record {} not found", id)));
    }
    Ok(ApiResponse::success(view(&state.db, activity).await?))
}

/// PUT /api/activities/:id/approve - 待审核 -> 开放报名
pub async fn approve(
    State(state): State<AppState>,
    auth: Authorized<perm::ApproveActivity>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<ActivityView> {
    let activity = state.db.activities.get_404(id).await?;
    if activity.status != ActivityStatus::PendingApproval {
        return Err(ApiError::invalid_status_transition(
            "Only activities awaiting approval can be approved",
        ));
    }

    let version = Some(activity.version);
    let approved = Activity {
        status: ActivityStatus::Open,
        ..activity
    };
    let activity = state.db.activities.update(approved, version).await?;

    tracing::info!("{} approved activity {}", auth.username, activity.id);
    Ok(ApiResponse::success(view(&state.db, activity).await?).with_message("Activity approved"))
}

/// DELETE /api/activities/:id - cancels the activity and refunds every active registration in full
pub async fn cancel(
    State(state): State<AppState>,
    auth: Authorized<perm::CancelActivity>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<ActivityView> {
    let activity = state.db.activities.get_404(id).await?;
    match activity.status {
        ActivityStatus::Cancelled => return Err(ApiError::business_rule("Activity is already cancelled")),
        ActivityStatus::Finished => return Err(ApiError::business_rule("Finished activities cannot be cancelled")),
        ActivityStatus::PendingApproval | ActivityStatus::Open => {}
    }

    let version = Some(activity.version);
    let activity = state
        .db
        .activities
        .update(
            Activity {
                status: ActivityStatus::Cancelled,
                ..activity
            },
            version,
        )
        .await?;

    let refunded = refund_active_registrations(&state.db, id, Utc::now()).await?;

    tracing::info!("{} cancelled activity {} ({} registrations refunded)", auth.username, id, refunded);
    Ok(ApiResponse::success(view(&state.db, activity).await?).with_message("Activity cancelled"))
}

/// POST /api/activities/:id/register
///
/// Open status, deadline, duplicate, capacity and age rules are evaluated
/// inside the registrations write lock.
pub async fn register(
    State(state): State<AppState>,
    auth: Authorized<perm::RegisterActivity>,
    ValidPath(id): ValidPath<Id>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<Registration> {
    let request: RegisterRequest = validation::parse(REGISTER, body)?;

    let activity = state.db.activities.get_404(id).await?;
    let student = state.db.students.get_404(request.student_id).await?;
    ensure_owns(&auth, &student)?;

    let now = Utc::now();
    let registration = Registration {
        id: 0,
        version: 0,
        activity_id: activity.id,
        student_id: student.id,
        parent_id: student.parent_id,
        status: RegistrationStatus::Registered,
        fee: activity.fee,
        registered_at: now,
        cancelled_at: None,
        cancellation_fee: None,
        refund: None,
    };

    let rules = &state.rules.registration;
    let registration = state
        .db
        .registrations
        .insert_guarded(registration, &|_, others| {
            let held: Vec<&&Registration> = others
                .iter()
                .filter(|r| r.activity_id == activity.id && r.is_active())
                .collect();
            let ctx = RegistrationContext {
                activity: activity.clone(),
                student: student.clone(),
                active_count: held.len(),
                already_registered: held.iter().any(|r| r.student_id == student.id),
                now,
            };
            rules.evaluate(&ctx)?;
            Ok(())
        })
        .await?;

    // the activity may have been cancelled while the seat was being taken
    let latest = state.db.activities.get_404(id).await?;
    if latest.status != ActivityStatus::Open {
        let version = Some(registration.version);
        match state.db.registrations.update(full_refund(registration, Utc::now()), version).await {
            Ok(_) | Err(DatabaseError::VersionConflict { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::warn!("Withdrew registration for activity {} after it closed", id);
        return Err(ApiError::business_rule("Activity is not open for registration"));
    }

    tracing::info!("Student {} registered for activity {}", student.id, activity.id);
    Ok(ApiResponse::created(registration).with_message("Registration successful"))
}

/// POST /api/activities/:id/registrations/:rid/cancel - tiered cancellation fee
pub async fn cancel_registration(
    State(state): State<AppState>,
    auth: Authorized<perm::CancelRegistration>,
    ValidPath((id, registration_id)): ValidPath<(Id, Id)>,
) -> ApiResult<Registration> {
    let registration = state.db.registrations.get_404(registration_id).await?;
    if registration.activity_id != id {
        return Err(ApiError::not_found(format!(
            "registrations record {} not found",
            registration_id
        )));
    }
    ensure_owns(&auth, &registration)?;

    if !registration.is_active() {
        return Err(ApiError::business_rule("Registration is already cancelled"));
    }

    let activity = state.db.activities.get_404(id).await?;
    let now = Utc::now();
    let quote = cancellation::quote(registration.fee, activity.start_time, now)?;

    let version = Some(registration.version);
    let registration = state
        .db
        .registrations
        .update(
            Registration {
                status: RegistrationStatus::Cancelled,
                cancelled_at: Some(now),
                cancellation_fee: Some(quote.fee),
                refund: Some(quote.refund),
                ..registration
            },
            version,
        )
        .await?;

    let message = format!(
        "Registration cancelled, cancellation fee {}% ({}), refund {}",
        quote.rate_percent, quote.fee, quote.refund
    );
    Ok(ApiResponse::success(registration).with_message(message))
}

/// POST /api/activities/:id/feedback - one review per account, registered families only
pub async fn feedback(
    State(state): State<AppState>,
    auth: Authorized<perm::ReviewActivity>,
    ValidPath(id): ValidPath<Id>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<Feedback> {
    let request: FeedbackRequest = validation::parse(FEEDBACK, body)?;
    let activity = state.db.activities.get_404(id).await?;

    if auth.role == Role::Parent {
        let parent_id = auth.id;
        let attended = state
            .db
            .registrations
            .count(&|r: &Registration| r.activity_id == id && r.parent_id == parent_id && r.is_active())
            .await?;
        if attended == 0 {
            return Err(ApiError::business_rule(
                "Only families registered for this activity can leave feedback",
            ));
        }
    }

    let feedback = state
        .db
        .feedback
        .insert_guarded(
            Feedback {
                id: 0,
                version: 0,
                activity_id: activity.id,
                author_id: auth.id,
                rating: request.rating,
                comment: request.comment,
                created_at: Utc::now(),
            },
            &|candidate, others| {
                if others
                    .iter()
                    .any(|f| f.activity_id == candidate.activity_id && f.author_id == candidate.author_id)
                {
                    return Err(DatabaseError::Unique {
                        table: "activity_feedback",
                        message: "You have already reviewed this activity".to_string(),
                    });
                }
                Ok(())
            },
        )
        .await?;

    Ok(ApiResponse::created(feedback).with_message("Feedback submitted"))
}

/// GET /api/activities/:id/feedback
pub async fn list_feedback(
    State(state): State<AppState>,
    _auth: Authorized<perm::ReadActivity>,
    ValidPath(id): ValidPath<Id>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Vec<Feedback>> {
    let request = page_request(&state, &query)?;
    state.db.activities.get_404(id).await?;

    let feedback = state.db.feedback.find(&|f: &Feedback| f.activity_id == id).await?;
    Ok(ApiResponse::page(paginate(feedback, request)))
}
