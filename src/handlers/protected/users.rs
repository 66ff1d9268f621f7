// handlers/protected/users.rs - /api/users

use axum::extract::State;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::{apply_patch, expected_version, matches_search, page_request};
use crate::auth::{hash_password, Role};
use crate::database::models::{ClassRoom, Student, User};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{ensure_owner, perm, ApiResponse, ApiResult, Authorized, ValidJson, ValidPath, ValidQuery};
use crate::rules::account::{ensure_no_dependents, ensure_not_self};
use crate::state::AppState;
use crate::types::Id;
use crate::validation::{self, paginate, Format, FieldRule, FieldType, PageQuery};

const ROLES: &[&str] = &["admin", "principal", "teacher", "parent"];

const CREATE_USER: &[FieldRule] = &[
    FieldRule::required("username", FieldType::String).range(3.0, 50.0),
    FieldRule::required("password", FieldType::String).min(6.0),
    FieldRule::required("name", FieldType::String).max(50.0),
    FieldRule::required("email", FieldType::String).format(Format::Email),
    FieldRule::required("role", FieldType::String).one_of(ROLES),
    FieldRule::optional("phone", FieldType::String).format(Format::Phone),
    FieldRule::optional("salary", FieldType::Number).min(0.0),
];

const UPDATE_USER: &[FieldRule] = &[
    FieldRule::optional("password", FieldType::String).min(6.0),
    FieldRule::optional("name", FieldType::String).max(50.0),
    FieldRule::optional("email", FieldType::String).format(Format::Email),
    FieldRule::optional("role", FieldType::String).one_of(ROLES),
    FieldRule::optional("phone", FieldType::String).format(Format::Phone),
    FieldRule::optional("salary", FieldType::Number).min(0.0),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUser {
    username: String,
    password: String,
    name: String,
    email: String,
    role: Role,
    phone: Option<String>,
    salary: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<String>,
    pub search: Option<String>,
}

/// GET /api/users - admin only
pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<perm::ListUsers>,
    ValidQuery(query): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<UserFilter>,
) -> ApiResult<Vec<User>> {
    let request = page_request(&state, &query)?;
    let role = filter.role.as_deref().map(str::parse::<Role>).transpose().map_err(ApiError::bad_request)?;
    let search = filter.search.as_deref();

    let users = state
        .db
        .users
        .find(&|u: &User| {
            role.map_or(true, |r| u.role == r)
                && (matches_search(&u.name, search) || matches_search(&u.username, search))
        })
        .await?;

    Ok(ApiResponse::page(paginate(users, request)))
}

/// POST /api/users - admin only
pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<perm::CreateUser>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<User> {
    let input: CreateUser = validation::parse(CREATE_USER, body)?;
    let now = Utc::now();
    let username = input.username.trim().to_string();

    let password_hash =
        hash_password(&input.password).map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let user = User {
        id: 0,
        version: 0,
        password_hash,
        username,
        name: input.name.trim().to_string(),
        email: input.email.trim().to_string(),
        phone: input.phone,
        role: input.role,
        salary: input.salary,
        created_at: now,
        updated_at: now,
    };

    let user = state
        .db
        .users
        .insert_guarded(user, &|candidate, others| {
            if others.iter().any(|u| u.username == candidate.username) {
                return Err(DatabaseError::Unique {
                    table: "users",
                    message: format!("Username '{}' already exists", candidate.username),
                });
            }
            Ok(())
        })
        .await?;

    tracing::info!("Created {} account {}", user.role, user.username);
    Ok(ApiResponse::created(user).with_message("User created"))
}

/// GET /api/users/:id - self, or management
pub async fn get(
    State(state): State<AppState>,
    auth: Authorized<perm::ReadUser>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<User> {
    ensure_owner(&auth, id)?;
    let user = state.db.users.get_404(id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/:id - profile update. Role and salary need an admin.
pub async fn update(
    State(state): State<AppState>,
    auth: Authorized<perm::UpdateUser>,
    ValidPath(id): ValidPath<Id>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<User> {
    ensure_owner(&auth, id)?;
    validation::validate_partial(UPDATE_USER, &body, Utc::now()).map_err(ApiError::validation)?;
    let version = expected_version(&body)?;

    let current = state.db.users.get_404(id).await?;
    let mut updated: User = apply_patch(&current, &body, &["name", "email", "role", "phone", "salary"])?;
    // a full-profile PUT echoes role and salary back; only a change is privileged
    if !auth.is_admin() && (updated.role != current.role || updated.salary != current.salary) {
        return Err(ApiError::forbidden("Only administrators can change role or salary"));
    }

    updated.password_hash = match body.get("password").and_then(Value::as_str) {
        Some(password) => {
            hash_password(password).map_err(|e| ApiError::internal("Failed to hash password", e))?
        }
        None => current.password_hash.clone(),
    };
    updated.updated_at = Utc::now();

    let user = state.db.users.update(updated, version).await?;
    Ok(ApiResponse::success(user).with_message("User updated"))
}

/// DELETE /api/users/:id - admin only, never yourself
pub async fn delete(
    State(state): State<AppState>,
    auth: Authorized<perm::DeleteUser>,
    ValidPath(id): ValidPath<Id>,
) -> ApiResult<Value> {
    ensure_not_self(auth.id, id)?;
    let user = state.db.users.get_404(id).await?;

    match user.role {
        Role::Teacher => {
            let classes = state.db.classes.count(&|c: &ClassRoom| c.teacher_id == id).await?;
            ensure_no_dependents("teacher", "classes", classes)?;
        }
        Role::Parent => {
            let children = state.db.students.count(&|s: &Student| s.parent_id == id).await?;
            ensure_no_dependents("parent", "students", children)?;
        }
        Role::Admin | Role::Principal => {}
    }

    state.db.users.delete(id).await?;
    tracing::info!("{} deleted account {}", auth.username, user.username);
    Ok(ApiResponse::success(json!({ "id": id })).with_message("User deleted"))
}
