// handlers/protected/enrollment.rs - /api/enrollment/plans and /api/enrollment/applications

use axum::extract::State;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::utils::{expected_version, field_error, matches_search, page_request, parse_label};
use crate::database::models::{ApplicationStatus, EnrollmentApplication, EnrollmentPlan};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{perm, ApiResponse, ApiResult, Authorized, ValidJson, ValidPath, ValidQuery};
use crate::rules::age::check_age;
use crate::rules::capacity::check_capacity;
use crate::rules::status::TransitionContext;
use crate::state::AppState;
use crate::types::Id;
use crate::validation::{self, paginate, FieldRule, FieldType, Format, PageQuery};

const APPLICATION_STATUSES: &[&str] = &["待审核", "需补充材料", "已通过", "已拒绝", "已入学"];

const CREATE_PLAN: &[FieldRule] = &[
    FieldRule::required("title", FieldType::String).max(100.0),
    FieldRule::required("year", FieldType::Integer).range(2000.0, 2100.0),
    FieldRule::required("capacity", FieldType::Integer).range(1.0, 1000.0),
    FieldRule::required("minAge", FieldType::Integer).range(0.0, 10.0),
    FieldRule::required("maxAge", FieldType::Integer).range(0.0, 10.0),
    FieldRule::required("deadline", FieldType::DateTime).not_past(),
];

const SUBMIT_APPLICATION: &[FieldRule] = &[
    FieldRule::required("enrollmentPlanId", FieldType::Integer).min(1.0),
    FieldRule::required("studentName", FieldType::String).max(50.0),
    FieldRule::required("birthDate", FieldType::Date).not_future(),
    FieldRule::required("parentName", FieldType::String).max(50.0),
    FieldRule::required("parentPhone", FieldType::String).format(Format::Phone),
];

const REVIEW_APPLICATION: &[FieldRule] = &[
    FieldRule::required("status", FieldType::String).one_of(APPLICATION_STATUSES),
    FieldRule::optional("reviewNote", FieldType::String).max(500.0),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlan {
    title: String,
    year: i32,
    capacity: u32,
    min_age: u32,
    max_age: u32,
    deadline: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitApplication {
    enrollment_plan_id: Id,
    student_name: String,
    birth_date: NaiveDate,
    parent_name: String,
    parent_phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewApplication {
    status: ApplicationStatus,
    review_note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    pub status: Option<String>,
    pub plan_id: Option<Id>,
    pub search: Option<String>,
}

/// Approved and enrolled applications hold a seat in their plan
fn holds_seat(status: ApplicationStatus) -> bool {
    matches!(status, ApplicationStatus::Approved | ApplicationStatus::Enrolled)
}

/// GET /api/enrollment/plans
pub async fn list_plans(
    State(state): State<AppState>,
    _auth: Authorized<perm::ListPlans>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Vec<EnrollmentPlan>> {
    let request = page_request(&state, &query)?;
    let mut plans = state.db.plans.all().await?;
    plans.sort_by(|a, b| b.year.cmp(&a.year).then(a.id.cmp(&b.id)));
    Ok(ApiResponse::page(paginate(plans, request)))
}

/// POST /api/enrollment/plans
pub async fn create_plan(
    State(state): State<AppState>,
    auth: Authorized<perm::CreatePlan>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<EnrollmentPlan> {
    let input: CreatePlan = validation::parse(CREATE_PLAN, body)?;
    if input.min_age > input.max_age {
        return Err(field_error("maxAge", "maxAge must not be less than minAge"));
    }

    let plan = state
        .db
        .plans
        .insert(EnrollmentPlan {
            id: 0,
            version: 0,
            title: input.title.trim().to_string(),
            year: input.year,
            capacity: input.capacity,
            min_age: input.min_age,
            max_age: input.max_age,
            deadline: input.deadline,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!("{} opened enrollment plan {} for {}", auth.username, plan.id, plan.year);
    Ok(ApiResponse::created(plan).with_message("Enrollment plan created"))
}

/// POST /api/enrollment/applications
pub async fn submit_application(
    State(state): State<AppState>,
    auth: Authorized<perm::SubmitApplication>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<EnrollmentApplication> {
    let input: SubmitApplication = validation::parse(SUBMIT_APPLICATION, body)?;

    let plan = match state.db.plans.get(input.enrollment_plan_id).await? {
        Some(plan) => plan,
        None => {
            return Err(field_error(
                "enrollmentPlanId",
                "enrollmentPlanId does not reference an existing plan",
            ))
        }
    };

    let now = Utc::now();
    if now > plan.deadline {
        return Err(ApiError::business_rule("Enrollment deadline has passed"));
    }
    // judged on September 1st of the intake year
    let intake = NaiveDate::from_ymd_opt(plan.year, 9, 1).unwrap_or_else(|| now.date_naive());
    check_age(input.birth_date, intake, Some(plan.min_age), Some(plan.max_age))?;

    let application = EnrollmentApplication {
        id: 0,
        version: 0,
        enrollment_plan_id: plan.id,
        student_name: input.student_name.trim().to_string(),
        birth_date: input.birth_date,
        parent_name: input.parent_name.trim().to_string(),
        parent_phone: input.parent_phone,
        status: ApplicationStatus::Pending,
        review_note: None,
        submitted_by: auth.id,
        submitted_at: now,
    };

    let application = state
        .db
        .applications
        .insert_guarded(application, &|candidate, others| {
            let duplicate = others.iter().any(|a| {
                a.enrollment_plan_id == candidate.enrollment_plan_id
                    && a.student_name == candidate.student_name
                    && a.birth_date == candidate.birth_date
                    && a.status != ApplicationStatus::Rejected
            });
            if duplicate {
                return Err(DatabaseError::Unique {
                    table: "enrollment_applications",
                    message: format!(
                        "An application for {} already exists in this plan",
                        candidate.student_name
                    ),
                });
            }
            Ok(())
        })
        .await?;

    tracing::info!("Application {} submitted to plan {}", application.id, plan.id);
    Ok(ApiResponse::created(application).with_message("Application submitted"))
}

/// GET /api/enrollment/applications
pub async fn list_applications(
    State(state): State<AppState>,
    _auth: Authorized<perm::ListApplications>,
    ValidQuery(query): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<ApplicationFilter>,
) -> ApiResult<Vec<EnrollmentApplication>> {
    let request = page_request(&state, &query)?;
    let status: Option<ApplicationStatus> = parse_label("status", filter.status.as_deref())?;
    let search = filter.search.as_deref();

    let applications = state
        .db
        .applications
        .find(&|a: &EnrollmentApplication| {
            status.map_or(true, |s| a.status == s)
                && filter.plan_id.map_or(true, |id| a.enrollment_plan_id == id)
                && (matches_search(&a.student_name, search) || matches_search(&a.parent_name, search))
        })
        .await?;

    Ok(ApiResponse::page(paginate(applications, request)))
}

/// PUT /api/enrollment/applications/:id/status
///
/// Moves forward only. An approval also takes a seat in the plan, checked
/// atomically against the other approved applications.
pub async fn review_application(
    State(state): State<AppState>,
    auth: Authorized<perm::ReviewApplication>,
    ValidPath(id): ValidPath<Id>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<EnrollmentApplication> {
    let version = expected_version(&body)?;
    let input: ReviewApplication = validation::parse(REVIEW_APPLICATION, body)?;

    let current = state.db.applications.get_404(id).await?;
    state.rules.application.evaluate(&TransitionContext {
        from: current.status,
        to: input.status,
    })?;

    // the transition was checked against this version; a concurrent review
    // that lands first turns this write into a conflict
    let version = Some(version.unwrap_or(current.version));

    let plan = state.db.plans.get_404(current.enrollment_plan_id).await?;
    let takes_seat = holds_seat(input.status) && !holds_seat(current.status);

    let from = current.status;
    let updated = EnrollmentApplication {
        status: input.status,
        review_note: input.review_note.or_else(|| current.review_note.clone()),
        ..current
    };

    let application = state
        .db
        .applications
        .update_guarded(updated, version, &|_, others| {
            if takes_seat {
                let seats = others
                    .iter()
                    .filter(|a| a.enrollment_plan_id == plan.id && holds_seat(a.status))
                    .count();
                check_capacity("Enrollment plan", seats, 1, plan.capacity)?;
            }
            Ok(())
        })
        .await?;

    tracing::info!(
        "{} moved application {} from {} to {}",
        auth.username,
        application.id,
        from.label(),
        application.status.label()
    );
    Ok(ApiResponse::success(application).with_message("Application status updated"))
}
