use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::db::{CreateUserRequest, UpdateUserRequest, User, UserResponse, ADMIN_USERNAME};
use crate::AppState;

use super::auth::{hash_password, require_admin};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_password, validate_username};

/// Rules for editing an account. The built-in admin row may only be edited by
/// the admin session itself, keeps its name and keeps its admin flag.
fn check_can_update(actor: &User, target: &User, req: &UpdateUserRequest) -> Result<(), ApiError> {
    if !target.is_builtin_admin() {
        return Ok(());
    }

    if actor.username != ADMIN_USERNAME {
        return Err(ApiError::forbidden(
            "Only the admin account can change the admin account",
        ));
    }

    let mut builder = ValidationErrorBuilder::new();
    if req.username.as_deref().is_some_and(|name| name != ADMIN_USERNAME) {
        builder.add("username", "The admin account cannot be renamed");
    }
    if req.is_admin == Some(false) {
        builder.add("is_admin", "The admin account must stay an administrator");
    }
    builder.finish()
}

fn check_can_delete(actor: &User, target: &User) -> Result<(), ApiError> {
    if target.is_builtin_admin() {
        return Err(ApiError::forbidden("The admin account cannot be deleted"));
    }
    if actor.id == target.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    Ok(())
}

async fn find_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&user)?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_admin(&user)?;

    let username = req.username.trim();
    let mut builder = ValidationErrorBuilder::new();
    builder
        .check("username", validate_username(username))
        .check("password", validate_password(&req.password));
    builder.finish()?;

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let created: User = sqlx::query_as(
        "INSERT INTO users (username, password_hash, is_admin) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(username)
    .bind(&password_hash)
    .bind(req.is_admin)
    .fetch_one(&state.db)
    .await?;

    info!(by = %user.username, username = %created.username, is_admin = created.is_admin, "Created user");
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(&user)?;

    let target = find_user(&state, id).await?;
    check_can_update(&user, &target, &req)?;

    let username = req.username.as_deref().map(str::trim);
    let mut builder = ValidationErrorBuilder::new();
    if let Some(username) = username {
        builder.check("username", validate_username(username));
    }
    if let Some(password) = &req.password {
        builder.check("password", validate_password(password));
    }
    builder.finish()?;

    let password_hash = req
        .password
        .as_deref()
        .map(hash_password)
        .transpose()
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let mut tx = state.db.begin().await?;

    let updated: User = sqlx::query_as(
        r#"
        UPDATE users SET
            username = COALESCE(?, username),
            password_hash = COALESCE(?, password_hash),
            is_admin = COALESCE(?, is_admin)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(&password_hash)
    .bind(req.is_admin)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    // A changed password logs the account out everywhere except here
    if password_hash.is_some() && target.id != user.id {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(by = %user.username, user_id = id, "Updated user");
    Ok(Json(updated.into()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;

    let target = find_user(&state, id).await?;
    check_can_delete(&user, &target)?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!(by = %user.username, username = %target.username, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}
