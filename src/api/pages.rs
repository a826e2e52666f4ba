use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{
    CreatePageRequest, Page, PageContent, PageWithContents, SaveContentsRequest, UpdatePageRequest,
    User,
};
use crate::ordering::{self, Actor, Direction, MoveOutcome};
use crate::AppState;

use super::contents::{apply_content_update, validate_content_update};
use super::error::{ApiError, ValidationErrorBuilder};
use super::uploads::{read_file_field, UploadedFile};
use super::validation::{validate_page_title, validate_text, MAX_TEXT_LENGTH, MAX_TITLE_LENGTH};

/// Result of a move-up / move-down request
#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub outcome: MoveOutcome,
}

impl From<MoveOutcome> for MoveResponse {
    fn from(outcome: MoveOutcome) -> Self {
        Self { outcome }
    }
}

fn validate_page_fields(
    builder: &mut ValidationErrorBuilder,
    description: &Option<String>,
    menu_item: &Option<String>,
    menu_icon: &Option<String>,
    google_title: &Option<String>,
    google_description: &Option<String>,
) {
    builder
        .check("description", validate_text(description, MAX_TEXT_LENGTH))
        .check("menu_item", validate_text(menu_item, MAX_TITLE_LENGTH))
        .check("menu_icon", validate_text(menu_icon, MAX_TITLE_LENGTH))
        .check("google_title", validate_text(google_title, MAX_TITLE_LENGTH))
        .check("google_description", validate_text(google_description, 1000));
}

/// Load a page and its sections ordered by position
pub async fn load_page_with_contents(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<PageWithContents>, sqlx::Error> {
    let page: Option<Page> = sqlx::query_as("SELECT * FROM pages WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(page) = page else {
        return Ok(None);
    };

    let contents: Vec<PageContent> =
        sqlx::query_as("SELECT * FROM pagecontent WHERE pageId = ? ORDER BY position, id")
            .bind(id)
            .fetch_all(pool)
            .await?;

    Ok(Some(PageWithContents { page, contents }))
}

/// The site menu
pub async fn list_pages(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Page>>, ApiError> {
    let pages = sqlx::query_as::<_, Page>("SELECT * FROM pages ORDER BY display_order, id")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(pages))
}

pub async fn get_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PageWithContents>, ApiError> {
    let page = load_page_with_contents(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Page not found"))?;

    Ok(Json(page))
}

pub async fn create_page(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreatePageRequest>,
) -> Result<(StatusCode, Json<Page>), ApiError> {
    let actor = Actor::from(&user);
    actor.require_admin()?;

    let mut builder = ValidationErrorBuilder::new();
    builder.check("title", validate_page_title(&req.title));
    validate_page_fields(
        &mut builder,
        &req.description,
        &req.menu_item,
        &req.menu_icon,
        &req.google_title,
        &req.google_description,
    );
    builder.finish()?;

    let page = ordering::create_page(&state.db, &actor, &req).await?;

    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn update_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePageRequest>,
) -> Result<Json<Page>, ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    if let Some(title) = &req.title {
        builder.check("title", validate_page_title(title));
    }
    validate_page_fields(
        &mut builder,
        &req.description,
        &req.menu_item,
        &req.menu_icon,
        &req.google_title,
        &req.google_description,
    );
    builder.finish()?;

    let page: Page = sqlx::query_as(
        r#"
        UPDATE pages SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            menu_item = COALESCE(?, menu_item),
            menu_icon = COALESCE(?, menu_icon),
            google_title = COALESCE(?, google_title),
            google_description = COALESCE(?, google_description),
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(req.title.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(&req.menu_item)
    .bind(&req.menu_icon)
    .bind(&req.google_title)
    .bind(&req.google_description)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Page not found"))?;

    info!(page_id = id, "Updated page");
    Ok(Json(page))
}

pub async fn delete_page(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let actor = Actor::from(&user);
    actor.require_admin()?;

    let images: Vec<Option<String>> =
        sqlx::query_scalar("SELECT pictureText FROM pagecontent WHERE pageId = ?")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    let page = ordering::delete_page(&state.db, &actor, id).await?;

    for path in page.banner_path.iter().chain(images.iter().flatten()) {
        if let Err(e) = state.files.remove(path).await {
            warn!(page_id = id, path = %path, error = %e, "Failed to remove page upload");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn move_page(
    state: &AppState,
    user: &User,
    id: i64,
    direction: Direction,
) -> Result<Json<MoveResponse>, ApiError> {
    let outcome = ordering::move_page(&state.db, &Actor::from(user), id, direction).await?;
    Ok(Json(outcome.into()))
}

pub async fn move_page_up(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<Json<MoveResponse>, ApiError> {
    move_page(&state, &user, id, Direction::Up).await
}

pub async fn move_page_down(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<Json<MoveResponse>, ApiError> {
    move_page(&state, &user, id, Direction::Down).await
}

/// Save the page header and its sections in one go. Sections that do not
/// belong to the page are skipped; positions are never touched here.
pub async fn save_contents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SaveContentsRequest>,
) -> Result<Json<PageWithContents>, ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    if let Some(title) = &req.title {
        builder.check("title", validate_page_title(title));
    }
    builder.check("description", validate_text(&req.description, MAX_TEXT_LENGTH));
    for (index, section) in req.contents.iter().enumerate() {
        validate_content_update(&mut builder, &format!("contents[{}].", index), &section.fields);
    }
    builder.finish()?;

    let mut tx = state.db.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE pages SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.title.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Page not found"));
    }

    let mut saved = 0;
    for section in &req.contents {
        match apply_content_update(&mut tx, id, section.id, &section.fields).await? {
            Some(_) => saved += 1,
            None => warn!(page_id = id, content_id = section.id, "Skipping section of another page"),
        }
    }

    tx.commit().await?;
    info!(page_id = id, sections = saved, "Saved page contents");

    let page = load_page_with_contents(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Page not found"))?;

    Ok(Json(page))
}

pub async fn upload_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Page>, ApiError> {
    let previous: Option<Option<String>> =
        sqlx::query_scalar("SELECT banner_path FROM pages WHERE id = ?")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let previous = previous.ok_or_else(|| ApiError::not_found("Page not found"))?;

    let file = read_file_field(&mut multipart).await?;
    let page = store_banner(&state, id, previous.as_deref(), &file).await?;

    Ok(Json(page))
}

async fn store_banner(
    state: &AppState,
    id: i64,
    previous: Option<&str>,
    file: &UploadedFile,
) -> Result<Page, ApiError> {
    state
        .files
        .replace(previous, &file.filename, &file.data, |path| {
            set_banner_path(&state.db, id, path)
        })
        .await
}

async fn set_banner_path(db: &SqlitePool, id: i64, path: String) -> Result<Page, ApiError> {
    let page: Page = sqlx::query_as(
        "UPDATE pages SET banner_path = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(&path)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::not_found("Page not found"))?;

    info!(page_id = id, path = %path, "Updated page banner");
    Ok(page)
}
