// handlers/protected/students.rs - /api/students

use axum::extract::State;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::{apply_patch, expected_version, field_error, matches_search, page_request, parse_label};
use crate::auth::Role;
use crate::database::models::{ClassRoom, Gender, Payment, Registration, Student, StudentStatus};
use crate::database::{Database, DatabaseError};
use crate::error::ApiError;
use crate::middleware::{ensure_owns, perm, ApiResponse, ApiResult, Authorized, Identity, ValidJson, ValidPath, ValidQuery};
use crate::rules::account::{ensure_no_dependents, TransferContext};
use crate::rules::age::age_on;
use crate::rules::capacity::check_capacity;
use crate::state::AppState;
use crate::types::Id;
use crate::validation::{self, paginate, FieldRule, FieldType, PageQuery};

const GENDERS: &[&str] = &["男", "女"];
const STATUSES: &[&str] = &["在读", "已毕业", "已退学"];

const CREATE_STUDENT: &[FieldRule] = &[
    FieldRule::required("name", FieldType::String).max(50.0),
    FieldRule::required("gender", FieldType::String).one_of(GENDERS),
    FieldRule::required("birthDate", FieldType::Date).not_future(),
    FieldRule::required("parentId", FieldType::Integer).min(1.0),
    FieldRule::optional("classId", FieldType::Integer).min(1.0),
    FieldRule::optional("status", FieldType::String).one_of(STATUSES),
];

const UPDATE_STUDENT: &[FieldRule] = &[
    FieldRule::optional("name", FieldType::String).max(50.0),
    FieldRule::optional("gender", FieldType::String).one_of(GENDERS),
    FieldRule::optional("birthDate", FieldType::Date).not_future(),
    FieldRule::optional("parentId", FieldType::Integer).min(1.0),
    FieldRule::optional("classId", FieldType::Integer).min(1.0),
    FieldRule::optional("status", FieldType::String).one_of(STATUSES),
];

const TRANSFER: &[FieldRule] = &[FieldRule::required("classId", FieldType::Integer).min(1.0)];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStudent {
    name: String,
    gender: Gender,
    birth_date: NaiveDate,
    parent_id: Id,
    class_id: Option<Id>,
    status: Option<StudentStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest {
    class_id: Id,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    pub class_id: Option<Id>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Parents see their own children, teachers the children of classes they
/// teach, management everyone.
pub(crate) async fn ensure_can_view(db: &Database, identity: &Identity, student: &Student) -> Result<(), ApiError> {
    match identity.role {
        Role::Admin | Role::Principal => Ok(()),
        Role::Parent => ensure_owns(identity, student),
        Role::Teacher => {
            let teaches = match student.class_id {
                Some(class_id) => db.classes.get(class_id).await?.is_some_and(|c| c.teacher_id == identity.id),
                None => false,
            };
            if teaches {
                Ok(())
            } else {
                Err(ApiError::forbidden("You can only access students in your own classes"))
            }
        }
    }
}

fn check_student_age(state: &AppState, birth_date: NaiveDate) -> Result<(), ApiError> {
    let rules = &state.config.rules;
    let age = age_on(birth_date, Utc::now().date_naive());
    if age < rules.student_min_age || age > rules.student_max_age {
        return Err(field_error(
            "birthDate",
            format!(
                "Student age must be between {} and {} years",
                rules.student_min_age, rules.student_max_age
            ),
        ));
    }
    Ok(())
}

async fn ensure_parent(db: &Database, parent_id: Id) -> Result<(), ApiError> {
    match db.users.get(parent_id).await? {
        Some(user) if user.role == Role::Parent => Ok(()),
        _ => Err(field_error("parentId", "parentId must reference a parent account")),
    }
}

async fn load_class(db: &Database, class_id: Id) -> Result<ClassRoom, ApiError> {
    db.classes
        .get(class_id)
        .await?
        .ok_or_else(|| field_error("classId", "classId must reference an existing class"))
}

/// Roster guard: the class the candidate is joining must have a free seat
fn class_seat_guard(class: &ClassRoom) -> impl Fn(&Student, &[&Student]) -> Result<(), DatabaseError> + Send + Sync + '_ {
    move |candidate, others| {
        if !candidate.is_active_in(class.id) {
            return Ok(());
        }
        let current = others.iter().filter(|s| s.is_active_in(class.id)).count();
        check_capacity("Class", current, 1, class.capacity)?;
        Ok(())
    }
}

/// GET /api/students
pub async fn list(
    State(state): State<AppState>,
    auth: Authorized<perm::ListStudents>,
    ValidQuery(query): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<StudentFilter>,
) -> ApiResult<Vec<Student>> {
    let request = page_request(&state, &query)?;
    let status: Option<StudentStatus> = parse_label("status", filter.status.as_deref())?;
    let search = filter.search.as_deref();

    // classes a teacher may see; empty for everyone else
    let taught: Vec<Id> = if auth.role == Role::Teacher {
        let teacher_id = auth.id;
        state
            .db
            .classes
            .find(&|c: &ClassRoom| c.teacher_id == teacher_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect()
    } else {
        Vec::new()
    };

    let role = auth.role;
    let viewer = auth.id;
    let students = state
        .db
        .students
        .find(&|s: &Student| {
            let visible = match role {
                Role::Admin | Role::Principal => true,
                Role::Parent => s.parent_id == viewer,
                Role::Teacher => s.class_id.is_some_and(|c| taught.contains(&c)),
            };
            visible
                && filter.class_id.map_or(true, |c| s.class_id == Some(c))
                && status.map_or(true, |st| s.status == st)
                && matches_search(&s.name, search)
        })
        .await?;

    Ok(ApiResponse::page(paginate(students, request)))
}

/// POST /api/students
pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<perm::CreateStudent>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<Student> {
    let input: CreateStudent = validation::parse(CREATE_STUDENT, body)?;
    check_student_age(&state, input.birth_date)?;
    ensure_parent(&state.db, input.parent_id).await?;

    let now = Utc::now();
    let student = Student {
        id: 0,
        version: 0,
        name: input.name.trim().to_string(),
        gender: input.gender,
        birth_date: input.birth_date,
        parent_id: input.parent_id,
        class_id: input.class_id,
        status: input.status.unwrap_or(StudentStatus::Enrolled),
        created_at: now,
        updated_at: now,
    };

    let student = match input.class_id {
        Some(class_id) => {
            let class = load_class(&state.db, class_id).await?;
            let guard = class_seat_guard(&class);
            state.db.students.insert_guarded(student, &guard).await?
        }
        None => state.db.students.insert(student).await?,
    };

    tracing::info!("Created student {} ({})", student.id, student.name);
    Ok(ApiResponse::created(student).with_message("Student created"))
}

/// GET /api/students/:id
pub async fn get(
    State(state): State<AppState>,
    auth: Authorized<perm::ReadStudent>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<Student> {
    let student = state.db.students.get_404(id).await?;
    ensure_can_view(&state.db, &auth, &student).await?;
    Ok(ApiResponse::success(student))
}

/// PUT /api/students/:id
pub async fn update(
    State(state): State<AppState>,
    _auth: Authorized<perm::UpdateStudent>,
    ValidPath(id): ValidPath<Id>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<Student> {
    validation::validate_partial(UPDATE_STUDENT, &body, Utc::now()).map_err(ApiError::validation)?;
    let version = expected_version(&body)?;

    let current = state.db.students.get_404(id).await?;
    let mut updated: Student = apply_patch(
        &current,
        &body,
        &["name", "gender", "birthDate", "parentId", "classId", "status"],
    )?;
    updated.name = updated.name.trim().to_string();
    updated.updated_at = Utc::now();

    if updated.birth_date != current.birth_date {
        check_student_age(&state, updated.birth_date)?;
    }
    if updated.parent_id != current.parent_id {
        ensure_parent(&state.db, updated.parent_id).await?;
    }

    let student = match updated.class_id {
        Some(class_id) if updated.class_id != current.class_id || current.status != updated.status => {
            let class = load_class(&state.db, class_id).await?;
            let guard = class_seat_guard(&class);
            state.db.students.update_guarded(updated, version, &guard).await?
        }
        _ => state.db.students.update(updated, version).await?,
    };

    Ok(ApiResponse::success(student).with_message("Student updated"))
}

/// DELETE /api/students/:id - refused while registrations or payments reference the student
pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<perm::DeleteStudent>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<Value> {
    let student = state.db.students.get_404(id).await?;

    let registrations = state.db.registrations.count(&|r: &Registration| r.student_id == id).await?;
    ensure_no_dependents("student", "registrations", registrations)?;
    let payments = state.db.payments.count(&|p: &Payment| p.student_id == id).await?;
    ensure_no_dependents("student", "payments", payments)?;

    state.db.students.delete(id).await?;
    tracing::info!("Deleted student {} ({})", student.id, student.name);
    Ok(ApiResponse::success(json!({ "id": id })).with_message("Student deleted"))
}

/// POST /api/students/:id/transfer
pub async fn transfer(
    State(state): State<AppState>,
    auth: Authorized<perm::TransferStudent>,
    ValidPath(id): ValidPath<Id>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<Student> {
    let version = expected_version(&body)?;
    let request: TransferRequest = validation::parse(TRANSFER, body)?;

    let student = state.db.students.get_404(id).await?;
    let target = load_class(&state.db, request.class_id).await?;

    let moved = Student {
        class_id: Some(target.id),
        updated_at: Utc::now(),
        ..student.clone()
    };

    let rules = &state.rules.transfer;
    let student = state
        .db
        .students
        .update_guarded(moved, version, &|_, others| {
            let ctx = TransferContext {
                student: student.clone(),
                target: target.clone(),
                target_count: others.iter().filter(|s| s.is_active_in(target.id)).count(),
            };
            rules.evaluate(&ctx)?;
            Ok(())
        })
        .await?;

    tracing::info!("{} moved student {} to class {}", auth.username, student.id, target.name);
    Ok(ApiResponse::success(student).with_message("Student transferred"))
}
