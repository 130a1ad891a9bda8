use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser, Role},
    error::{AppError, AppResult, ValidationErrors},
    models::{NewUser, User},
    numbering::is_unique_violation,
    schema::users,
    state::AppState,
    storage::{self, FileCategory},
    utils::{
        multipart::{FormData, UploadedFile},
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

use super::auth::revoke_all_refresh_tokens;

#[derive(Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
pub struct ListUsersParams {
    #[serde(flatten)]
    page: PageParams,
    role: Option<String>,
    status: Option<String>,
    search: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListUsersParams>,
) -> AppResult<Json<Envelope<Vec<UserResponse>>>> {
    user.require_role(Role::Admin)?;
    let mut conn = state.db()?;

    let build = || {
        let mut query = users::table.into_boxed();
        if let Some(role) = params.role.as_ref().filter(|s| !s.is_empty()) {
            query = query.filter(users::role.eq(role.clone()));
        }
        match params.status.as_deref() {
            Some("active") => query = query.filter(users::approved_at.is_not_null()),
            Some("inactive") => query = query.filter(users::approved_at.is_null()),
            _ => {}
        }
        if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                users::name
                    .ilike(pattern.clone())
                    .or(users::email.ilike(pattern)),
            );
        }
        query
    };

    let total: i64 = build().count().get_result(&mut conn)?;

    let mut query = build();
    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("name"), true) => query.order(users::name.desc()),
        (Some("name"), false) => query.order(users::name.asc()),
        (Some("email"), true) => query.order(users::email.desc()),
        (Some("email"), false) => query.order(users::email.asc()),
        (Some("role"), true) => query.order(users::role.desc()),
        (Some("role"), false) => query.order(users::role.asc()),
        (_, true) => query.order(users::created_at.desc()),
        (_, false) => query.order(users::created_at.asc()),
    };

    let rows: Vec<User> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let data = rows.into_iter().map(|row| to_response(&state, row)).collect();
    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        data,
        "users retrieved successfully",
        pagination,
    ))
}

pub async fn user_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    user.require_role(Role::Admin)?;
    let mut conn = state.db()?;

    let total: i64 = users::table.count().get_result(&mut conn)?;
    let active: i64 = users::table
        .filter(users::approved_at.is_not_null())
        .count()
        .get_result(&mut conn)?;

    let mut by_role = Vec::with_capacity(Role::ALL.len());
    for role in Role::ALL {
        let count: i64 = users::table
            .filter(users::role.eq(role.as_str()))
            .count()
            .get_result(&mut conn)?;
        by_role.push(json!({ "role": role.as_str(), "count": count }));
    }

    let recent: Vec<User> = users::table
        .order(users::created_at.desc())
        .limit(5)
        .load(&mut conn)?;
    let recent_registrations: Vec<serde_json::Value> = recent
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "name": row.name,
                "email": row.email,
                "created_at": row.created_at,
            })
        })
        .collect();

    let with_avatars: i64 = users::table
        .filter(users::avatar_path.is_not_null())
        .count()
        .get_result(&mut conn)?;

    let stats = json!({
        "total_users": total,
        "active_users": active,
        "inactive_users": total - active,
        "by_role": by_role,
        "recent_registrations": recent_registrations,
        "users_with_avatars": with_avatars,
        "users_without_avatars": total - with_avatars,
    });
    Ok(response::ok(stats, "user statistics retrieved successfully"))
}

pub async fn list_roles(
    State(_state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    user.require_role(Role::Admin)?;
    Ok(response::ok(
        json!({
            "Admin": "Administrator - Full system access",
            "Manager": "Manager - Limited administrative access",
            "User": "User - Basic access",
        }),
        "roles retrieved successfully",
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    user.require_role(Role::Admin)?;
    let mut conn = state.db()?;
    let row: User = users::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, row),
        "user retrieved successfully",
    ))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Envelope<UserResponse>>)> {
    user.require_role(Role::Admin)?;
    let form = FormData::read(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    let name = form.value("name").unwrap_or_default().trim().to_string();
    if name.is_empty() {
        errors.add("name", "name is required");
    }
    let email = form.value("email").unwrap_or_default().trim().to_lowercase();
    if !email.contains('@') {
        errors.add("email", "a valid email address is required");
    }
    let raw_password = form.value("password").unwrap_or_default();
    if raw_password.len() < 8 {
        errors.add("password", "password must be at least 8 characters");
    }
    let role = validate_role(form.value("role"), None, &mut errors);
    let avatar = validated_avatar(&form, &mut errors);
    errors.into_result()?;

    let avatar_path = match avatar {
        Some(file) => Some(store_avatar(&state, file).await?),
        None => None,
    };

    let new_user = NewUser {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: password::hash_password(raw_password)?,
        avatar_path: avatar_path.clone(),
        role,
        // Admin-provisioned accounts are active immediately.
        approved_at: Some(Utc::now().naive_utc()),
    };

    let mut conn = state.db()?;
    match diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(err) => {
            if let Some(path) = avatar_path {
                let _ = state.files.delete(&path).await;
            }
            if is_unique_violation(&err) {
                return Err(AppError::bad_request("email address is already registered"));
            }
            return Err(err.into());
        }
    }

    let created: User = users::table.find(new_user.id).first(&mut conn)?;
    tracing::info!(user_id = %created.id, email = %created.email, "user created");
    Ok(response::created(
        to_response(&state, created),
        "user created successfully",
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<UserResponse>>> {
    user.require_role(Role::Admin)?;
    let form = FormData::read(&mut multipart).await?;

    let mut conn = state.db()?;
    let existing: User = users::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let name = match form.value("name") {
        Some(value) if value.trim().is_empty() => {
            errors.add("name", "name cannot be empty");
            existing.name.clone()
        }
        Some(value) => value.trim().to_string(),
        None => existing.name.clone(),
    };
    let email = match form.value("email") {
        Some(value) if !value.contains('@') => {
            errors.add("email", "a valid email address is required");
            existing.email.clone()
        }
        Some(value) => value.trim().to_lowercase(),
        None => existing.email.clone(),
    };
    let role = validate_role(form.value("role"), Some(&existing.role), &mut errors);
    let avatar = validated_avatar(&form, &mut errors);
    errors.into_result()?;

    // Replacement order: new avatar first, row second, old file last.
    let new_avatar_path = match avatar {
        Some(file) => Some(store_avatar(&state, file).await?),
        None => None,
    };
    let avatar_for_row = new_avatar_path
        .clone()
        .or_else(|| existing.avatar_path.clone());

    let updated = diesel::update(users::table.find(id))
        .set((
            users::name.eq(&name),
            users::email.eq(&email),
            users::role.eq(&role),
            users::avatar_path.eq(&avatar_for_row),
        ))
        .execute(&mut conn);

    match updated {
        Ok(_) => {
            if new_avatar_path.is_some() {
                if let Some(old) = &existing.avatar_path {
                    let _ = state.files.delete(old).await;
                }
            }
        }
        Err(err) => {
            if let Some(path) = new_avatar_path {
                let _ = state.files.delete(&path).await;
            }
            if is_unique_violation(&err) {
                return Err(AppError::bad_request("email address is already registered"));
            }
            return Err(err.into());
        }
    }

    let row: User = users::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, row),
        "user updated successfully",
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    user.require_role(Role::Admin)?;
    let mut conn = state.db()?;
    let target: User = users::table.find(id).first(&mut conn)?;

    guard_last_admin(&mut conn, &target)?;

    revoke_all_refresh_tokens(&mut conn, id)?;
    diesel::delete(users::table.find(id)).execute(&mut conn)?;

    if let Some(path) = &target.avatar_path {
        let _ = state.files.delete(path).await;
    }

    tracing::info!(user_id = %id, "user deleted");
    Ok(response::message_only("user deleted successfully"))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<Envelope<()>>> {
    user.require_role(Role::Admin)?;
    if payload.new_password.len() < 8 {
        let mut errors = ValidationErrors::new();
        errors.add("new_password", "password must be at least 8 characters");
        errors.into_result()?;
    }

    let mut conn = state.db()?;
    users::table.find(id).first::<User>(&mut conn)?;

    let hash = password::hash_password(&payload.new_password)?;
    diesel::update(users::table.find(id))
        .set(users::password_hash.eq(hash))
        .execute(&mut conn)?;
    revoke_all_refresh_tokens(&mut conn, id)?;

    tracing::info!(user_id = %id, "password reset by administrator");
    Ok(response::message_only("password reset successfully"))
}

pub async fn approve_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    user.require_role(Role::Admin)?;
    let mut conn = state.db()?;
    let affected = diesel::update(users::table.find(id))
        .set(users::approved_at.eq(Some(Utc::now().naive_utc())))
        .execute(&mut conn)?;
    if affected == 0 {
        return Err(AppError::not_found("user not found"));
    }

    let row: User = users::table.find(id).first(&mut conn)?;
    tracing::info!(user_id = %id, "user approved");
    Ok(response::ok(
        to_response(&state, row),
        "user approved successfully",
    ))
}

pub async fn reject_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    user.require_role(Role::Admin)?;
    let mut conn = state.db()?;
    let affected = diesel::update(users::table.find(id))
        .set(users::approved_at.eq(None::<chrono::NaiveDateTime>))
        .execute(&mut conn)?;
    if affected == 0 {
        return Err(AppError::not_found("user not found"));
    }

    // An unapproved account can no longer hold live sessions.
    revoke_all_refresh_tokens(&mut conn, id)?;

    let row: User = users::table.find(id).first(&mut conn)?;
    tracing::info!(user_id = %id, "user rejected");
    Ok(response::ok(
        to_response(&state, row),
        "user rejected successfully",
    ))
}

#[derive(Deserialize)]
pub struct BulkUserRequest {
    pub user_ids: Vec<Uuid>,
}

/// Best-effort: each id is processed independently and failures are listed
/// in the response without aborting the rest of the batch.
pub async fn bulk_delete_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<BulkUserRequest>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    user.require_role(Role::Admin)?;
    require_ids(&payload.user_ids)?;

    let mut conn = state.db()?;
    let mut deleted_count = 0usize;
    let mut failed: Vec<serde_json::Value> = Vec::new();

    for id in &payload.user_ids {
        let target: User = match users::table.find(id).first(&mut conn) {
            Ok(target) => target,
            Err(_) => {
                failed.push(json!({ "user_id": id, "error": "user not found" }));
                continue;
            }
        };

        if let Err(err) = guard_last_admin(&mut conn, &target) {
            failed.push(json!({ "user_id": id, "error": err.message().to_string() }));
            continue;
        }

        if let Err(err) = revoke_all_refresh_tokens(&mut conn, *id)
            .map_err(AppError::from)
            .and_then(|_| {
                diesel::delete(users::table.find(id))
                    .execute(&mut conn)
                    .map_err(AppError::from)
            })
        {
            failed.push(json!({ "user_id": id, "error": err.message().to_string() }));
            continue;
        }

        if let Some(path) = &target.avatar_path {
            let _ = state.files.delete(path).await;
        }
        deleted_count += 1;
    }

    tracing::info!(deleted_count, failed = failed.len(), "bulk user deletion completed");
    Ok(response::ok(
        json!({ "deleted_count": deleted_count, "failed_deletions": failed }),
        format!("bulk deletion completed, {deleted_count} users deleted successfully"),
    ))
}

pub async fn bulk_approve_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<BulkUserRequest>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    user.require_role(Role::Admin)?;
    require_ids(&payload.user_ids)?;

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let mut approved_count = 0usize;
    let mut failed: Vec<serde_json::Value> = Vec::new();

    for id in &payload.user_ids {
        match diesel::update(users::table.find(id))
            .set(users::approved_at.eq(Some(now)))
            .execute(&mut conn)
        {
            Ok(0) => failed.push(json!({ "user_id": id, "error": "user not found" })),
            Ok(_) => approved_count += 1,
            Err(err) => failed.push(json!({ "user_id": id, "error": err.to_string() })),
        }
    }

    tracing::info!(approved_count, failed = failed.len(), "bulk user approval completed");
    Ok(response::ok(
        json!({ "approved_count": approved_count, "failed_approvals": failed }),
        format!("bulk approval completed, {approved_count} users approved successfully"),
    ))
}

fn require_ids(ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.add("user_ids", "at least one user id is required");
        errors.into_result()?;
    }
    Ok(())
}

/// The system must always keep at least one active administrator.
fn guard_last_admin(conn: &mut diesel::PgConnection, target: &User) -> AppResult<()> {
    if target.role == Role::Admin.as_str() {
        let admin_count: i64 = users::table
            .filter(users::role.eq(Role::Admin.as_str()))
            .count()
            .get_result(conn)?;
        if admin_count <= 1 {
            return Err(AppError::bad_request("cannot delete the last admin user"));
        }
    }
    Ok(())
}

fn validate_role(
    raw: Option<&str>,
    current: Option<&str>,
    errors: &mut ValidationErrors,
) -> String {
    match raw {
        None => match current {
            Some(role) => role.to_string(),
            None => {
                errors.add("role", "role is required");
                Role::User.as_str().to_string()
            }
        },
        Some(raw) => match Role::parse(raw) {
            Some(role) => role.as_str().to_string(),
            None => {
                errors.add("role", format!("unknown role {raw}"));
                Role::User.as_str().to_string()
            }
        },
    }
}

pub(crate) fn validated_avatar<'a>(
    form: &'a FormData,
    errors: &mut ValidationErrors,
) -> Option<&'a UploadedFile> {
    let file = form.file("avatar")?;
    for problem in storage::check_upload(FileCategory::Avatars, &file.original_name, file.size()) {
        errors.add("avatar", problem);
    }
    if !storage::looks_like_image(&file.bytes) {
        errors.add("avatar", "avatar must be a valid image");
    }
    Some(file)
}

pub(crate) async fn store_avatar(state: &AppState, file: &UploadedFile) -> AppResult<String> {
    let path = storage::build_storage_path(FileCategory::Avatars, &file.original_name, Utc::now());
    state.files.put(&path, file.bytes.clone()).await?;
    Ok(path)
}

pub(crate) fn to_response(state: &AppState, user: User) -> UserResponse {
    let avatar_url = user
        .avatar_path
        .as_deref()
        .map(|path| state.config.public_file_url(path));
    UserResponse { user, avatar_url }
}
