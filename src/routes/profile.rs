use axum::{
    extract::{Multipart, State},
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;

use crate::{
    auth::{password, AuthenticatedUser},
    error::{AppError, AppResult, ValidationErrors},
    models::User,
    numbering::is_unique_violation,
    schema::users,
    state::AppState,
    utils::{
        multipart::FormData,
        response::{self, Envelope},
    },
};

use super::auth::revoke_all_refresh_tokens;
use super::users::{store_avatar, to_response, validated_avatar, UserResponse};

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let mut conn = state.db()?;
    let row: User = users::table.find(user.user_id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, row),
        "profile retrieved successfully",
    ))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let form = FormData::read(&mut multipart).await?;

    let mut conn = state.db()?;
    let existing: User = users::table.find(user.user_id).first(&mut conn)?;

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
    let avatar = validated_avatar(&form, &mut errors);
    errors.into_result()?;

    // New avatar first, row second, old file last.
    let new_avatar_path = match avatar {
        Some(file) => Some(store_avatar(&state, file).await?),
        None => None,
    };
    let avatar_for_row = new_avatar_path
        .clone()
        .or_else(|| existing.avatar_path.clone());

    let updated = diesel::update(users::table.find(user.user_id))
        .set((
            users::name.eq(&name),
            users::email.eq(&email),
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

    let row: User = users::table.find(user.user_id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, row),
        "profile updated successfully",
    ))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<Envelope<()>>> {
    if payload.new_password.len() < 8 {
        let mut errors = ValidationErrors::new();
        errors.add("new_password", "password must be at least 8 characters");
        errors.into_result()?;
    }

    let mut conn = state.db()?;
    let row: User = users::table.find(user.user_id).first(&mut conn)?;

    let valid = password::verify_password(&payload.current_password, &row.password_hash)?;
    if !valid {
        return Err(AppError::bad_request("current password is incorrect"));
    }

    let hash = password::hash_password(&payload.new_password)?;
    diesel::update(users::table.find(user.user_id))
        .set(users::password_hash.eq(hash))
        .execute(&mut conn)?;

    // Every session is invalidated so the new password must be used.
    revoke_all_refresh_tokens(&mut conn, user.user_id)?;

    tracing::info!(user_id = %user.user_id, "password changed");
    Ok(response::message_only(
        "password changed successfully, please login again",
    ))
}
