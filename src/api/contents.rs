use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{Anchor, InsertContentRequest, PageContent, UpdateContentRequest};
use crate::ordering::{self, Direction, NewContent};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::pages::MoveResponse;
use super::uploads::read_file_field;
use super::validation::{
    validate_content_type, validate_link, validate_price, validate_text, MAX_TEXT_LENGTH,
    MAX_TITLE_LENGTH,
};

/// Check the editable fields of a section; `prefix` namespaces the field names
/// when several sections are validated together.
pub fn validate_content_update(
    builder: &mut ValidationErrorBuilder,
    prefix: &str,
    req: &UpdateContentRequest,
) {
    let field = |name: &str| format!("{}{}", prefix, name);

    builder
        .check(&field("title"), validate_text(&req.title, MAX_TITLE_LENGTH))
        .check(&field("content"), validate_text(&req.content, MAX_TEXT_LENGTH))
        .check(&field("link"), validate_link(&req.link))
        .check(&field("price"), validate_price(req.price))
        .check(&field("duration"), validate_text(&req.duration, MAX_TITLE_LENGTH))
        .check(
            &field("picture_text"),
            validate_text(&req.picture_text, MAX_TEXT_LENGTH),
        );

    if let Some(content_type) = &req.content_type {
        builder.check(&field("type"), validate_content_type(content_type));
    }
}

/// Write the given fields of one section, scoped by page. Returns `None` when
/// the section does not belong to the page. The position is left alone.
pub async fn apply_content_update(
    conn: &mut SqliteConnection,
    page_id: i64,
    content_id: i64,
    req: &UpdateContentRequest,
) -> Result<Option<PageContent>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE pagecontent SET
            title = COALESCE(?, title),
            content = COALESCE(?, content),
            link = COALESCE(?, link),
            price = COALESCE(?, price),
            duration = COALESCE(?, duration),
            pictureText = COALESCE(?, pictureText),
            type = COALESCE(?, type)
        WHERE id = ? AND pageId = ?
        RETURNING *
        "#,
    )
    .bind(&req.title)
    .bind(&req.content)
    .bind(&req.link)
    .bind(req.price)
    .bind(&req.duration)
    .bind(&req.picture_text)
    .bind(req.content_type.as_deref().map(str::trim))
    .bind(content_id)
    .bind(page_id)
    .fetch_optional(conn)
    .await
}

pub async fn insert_content(
    State(state): State<Arc<AppState>>,
    Path(page_id): Path<i64>,
    Json(req): Json<InsertContentRequest>,
) -> Result<(StatusCode, Json<PageContent>), ApiError> {
    validate_content_type(&req.content_type).map_err(|e| ApiError::validation_field("type", e))?;

    let new = NewContent::new(
        req.content_type.trim(),
        Anchor::from_param(req.anchor.as_deref()),
    );
    let content = ordering::insert_content(&state.db, page_id, new).await?;

    Ok((StatusCode::CREATED, Json(content)))
}

pub async fn update_content(
    State(state): State<Arc<AppState>>,
    Path((page_id, content_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Json<PageContent>, ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    validate_content_update(&mut builder, "", &req);
    builder.finish()?;

    let mut conn = state.db.acquire().await?;
    let content = apply_content_update(&mut conn, page_id, content_id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Content not found"))?;

    info!(page_id, content_id, "Updated content section");
    Ok(Json(content))
}

pub async fn delete_content(
    State(state): State<Arc<AppState>>,
    Path((page_id, content_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let image: Option<Option<String>> =
        sqlx::query_scalar("SELECT pictureText FROM pagecontent WHERE id = ? AND pageId = ?")
            .bind(content_id)
            .bind(page_id)
            .fetch_optional(&state.db)
            .await?;

    ordering::delete_content(&state.db, page_id, content_id).await?;

    if let Some(path) = image.flatten() {
        if let Err(e) = state.files.remove(&path).await {
            warn!(content_id, path = %path, error = %e, "Failed to remove section image");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn move_content(
    state: &AppState,
    page_id: i64,
    content_id: i64,
    direction: Direction,
) -> Result<Json<MoveResponse>, ApiError> {
    let outcome = ordering::move_content(&state.db, page_id, content_id, direction).await?;
    Ok(Json(outcome.into()))
}

pub async fn move_content_up(
    State(state): State<Arc<AppState>>,
    Path((page_id, content_id)): Path<(i64, i64)>,
) -> Result<Json<MoveResponse>, ApiError> {
    move_content(&state, page_id, content_id, Direction::Up).await
}

pub async fn move_content_down(
    State(state): State<Arc<AppState>>,
    Path((page_id, content_id)): Path<(i64, i64)>,
) -> Result<Json<MoveResponse>, ApiError> {
    move_content(&state, page_id, content_id, Direction::Down).await
}

/// Upload the picture of a section; the public path is stored in `pictureText`
pub async fn upload_content_image(
    State(state): State<Arc<AppState>>,
    Path((page_id, content_id)): Path<(i64, i64)>,
    mut multipart: Multipart,
) -> Result<Json<PageContent>, ApiError> {
    let previous: Option<Option<String>> =
        sqlx::query_scalar("SELECT pictureText FROM pagecontent WHERE id = ? AND pageId = ?")
            .bind(content_id)
            .bind(page_id)
            .fetch_optional(&state.db)
            .await?;
    let previous = previous.ok_or_else(|| ApiError::not_found("Content not found"))?;

    let file = read_file_field(&mut multipart).await?;
    let content = state
        .files
        .replace(previous.as_deref(), &file.filename, &file.data, |path| {
            set_content_image(&state.db, page_id, content_id, path)
        })
        .await?;

    Ok(Json(content))
}

async fn set_content_image(
    db: &SqlitePool,
    page_id: i64,
    content_id: i64,
    path: String,
) -> Result<PageContent, ApiError> {
    let content: PageContent = sqlx::query_as(
        "UPDATE pagecontent SET pictureText = ? WHERE id = ? AND pageId = ? RETURNING *",
    )
    .bind(&path)
    .bind(content_id)
    .bind(page_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::not_found("Content not found"))?;

    info!(page_id, content_id, path = %path, "Updated section image");
    Ok(content)
}
