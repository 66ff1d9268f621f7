// handlers/protected/classes.rs - /api/classes and /api/teachers/:id/classes

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::{apply_patch, expected_version, field_error, matches_search, page_request, parse_label};
use crate::auth::Role;
use crate::database::models::{ClassRoom, ClassView, Grade, Student};
use crate::database::{Database, DatabaseError};
use crate::error::ApiError;
use crate::middleware::{ensure_owner, perm, ApiResponse, ApiResult, Authorized, ValidJson, ValidPath, ValidQuery};
use crate::rules::account::ensure_no_dependents;
use crate::rules::capacity::check_capacity_shrink;
use crate::state::AppState;
use crate::types::Id;
use crate::validation::{self, paginate, FieldRule, FieldType, Page, PageQuery};

const GRADES: &[&str] = &["小班", "中班", "大班"];

const CREATE_CLASS: &[FieldRule] = &[
    FieldRule::required("name", FieldType::String).max(50.0),
    FieldRule::required("grade", FieldType::String).one_of(GRADES),
    FieldRule::required("teacherId", FieldType::Integer).min(1.0),
    FieldRule::required("capacity", FieldType::Integer).range(1.0, 100.0),
];

const UPDATE_CLASS: &[FieldRule] = &[
    FieldRule::optional("name", FieldType::String).max(50.0),
    FieldRule::optional("grade", FieldType::String).one_of(GRADES),
    FieldRule::optional("teacherId", FieldType::Integer).min(1.0),
    FieldRule::optional("capacity", FieldType::Integer).range(1.0, 100.0),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClass {
    name: String,
    grade: Grade,
    teacher_id: Id,
    capacity: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClassFilter {
    pub grade: Option<String>,
    pub search: Option<String>,
}

async fn current_count(db: &Database, class_id: Id) -> Result<usize, ApiError> {
    Ok(db.students.count(&|s: &Student| s.is_active_in(class_id)).await?)
}

async fn view(db: &Database, class: ClassRoom) -> Result<ClassView, ApiError> {
    let current_count = current_count(db, class.id).await?;
    Ok(ClassView { class, current_count })
}

async fn views(db: &Database, classes: Vec<ClassRoom>) -> Result<Vec<ClassView>, ApiError> {
    let students = db.students.all().await?;
    Ok(classes
        .into_iter()
        .map(|class| {
            let current_count = students.iter().filter(|s| s.is_active_in(class.id)).count();
            ClassView { class, current_count }
        })
        .collect())
}

async fn ensure_teacher(db: &Database, teacher_id: Id) -> Result<(), ApiError> {
    match db.users.get(teacher_id).await? {
        Some(user) if user.role == Role::Teacher => Ok(()),
        _ => Err(field_error("teacherId", "teacherId must reference a teacher account")),
    }
}

fn unique_name(candidate: &ClassRoom, others: &[&ClassRoom]) -> Result<(), DatabaseError> {
    if others.iter().any(|c| c.name == candidate.name) {
        return Err(DatabaseError::Unique {
            table: "classes",
            message: format!("Class name '{}' already exists", candidate.name),
        });
    }
    Ok(())
}

/// GET /api/classes
pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<perm::ListClasses>,
    ValidQuery(query): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<ClassFilter>,
) -> ApiResult<Vec<ClassView>> {
    let request = page_request(&state, &query)?;
    let grade: Option<Grade> = parse_label("grade", filter.grade.as_deref())?;
    let search = filter.search.as_deref();

    let classes = state
        .db
        .classes
        .find(&|c: &ClassRoom| grade.map_or(true, |g| c.grade == g) && matches_search(&c.name, search))
        .await?;

    let page = paginate(classes, request);
    let items = views(&state.db, page.items).await?;
    Ok(ApiResponse::page(Page {
        items,
        pagination: page.pagination,
    }))
}

/// POST /api/classes
pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<perm::CreateClass>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<ClassView> {
    let input: CreateClass = validation::parse(CREATE_CLASS, body)?;
    ensure_teacher(&state.db, input.teacher_id).await?;

    let now = Utc::now();
    let class = ClassRoom {
        id: 0,
        version: 0,
        name: input.name.trim().to_string(),
        grade: input.grade,
        teacher_id: input.teacher_id,
        capacity: input.capacity,
        created_at: now,
        updated_at: now,
    };

    let class = state.db.classes.insert_guarded(class, &unique_name).await?;
    tracing::info!("Created class {} ({})", class.id, class.name);

    Ok(ApiResponse::created(ClassView { class, current_count: 0 }).with_message("Class created"))
}

/// GET /api/classes/:id
pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<perm::ReadClass>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<ClassView> {
    let class = state.db.classes.get_404(id).await?;
    Ok(ApiResponse::success(view(&state.db, class).await?))
}

/// PUT /api/classes/:id - capacity may not drop below the current roster
pub async fn update(
    State(state): State<AppState>,
    _auth: Authorized<perm::UpdateClass>,
    ValidPath(id): ValidPath<Id>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<ClassView> {
    validation::validate_partial(UPDATE_CLASS, &body, Utc::now()).map_err(ApiError::validation)?;
    let version = expected_version(&body)?;

    let current = state.db.classes.get_404(id).await?;
    let mut updated: ClassRoom = apply_patch(&current, &body, &["name", "grade", "teacherId", "capacity"])?;
    updated.name = updated.name.trim().to_string();
    updated.updated_at = Utc::now();

    if updated.teacher_id != current.teacher_id {
        ensure_teacher(&state.db, updated.teacher_id).await?;
    }

    let roster = current_count(&state.db, id).await?;
    check_capacity_shrink(updated.capacity, roster)?;

    let class = state.db.classes.update_guarded(updated, version, &unique_name).await?;
    Ok(ApiResponse::success(ClassView { class, current_count: roster }).with_message("Class updated"))
}

/// DELETE /api/classes/:id - refused while students are assigned
pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<perm::DeleteClass>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<Value> {
    let class = state.db.classes.get_404(id).await?;

    let assigned = state.db.students.count(&|s: &Student| s.class_id == Some(id)).await?;
    ensure_no_dependents("class", "students", assigned)?;

    state.db.classes.delete(id).await?;
    tracing::info!("Deleted class {} ({})", class.id, class.name);
    Ok(ApiResponse::success(json!({ "id": id })).with_message("Class deleted"))
}

/// GET /api/teachers/:id/classes - a teacher's own classes
pub async fn teacher_classes(
    State(state): State<AppState>,
    auth: Authorized<perm::ReadTeacher>,
    ValidPath(teacher_id): ValidPath<Id>,
) -> ApiResult<Vec<ClassView>> {
    ensure_owner(&auth, teacher_id)?;

    let teacher = state.db.users.get_404(teacher_id).await?;
    if teacher.role != Role::Teacher {
        return Err(ApiError::not_found(format!("teacher {} not found", teacher_id)));
    }

    let classes = state.db.classes.find(&|c: &ClassRoom| c.teacher_id == teacher_id).await?;
    Ok(ApiResponse::success(views(&state.db, classes).await?))
}
