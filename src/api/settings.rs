use axum::{
    extract::{Multipart, State},
    Json,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::db::{load_or_create_settings, UpdateSettingsRequest, User, WebsiteSettings};
use crate::AppState;

use super::auth::require_admin;
use super::error::{ApiError, ValidationErrorBuilder};
use super::uploads::read_file_field;
use super::validation::{
    validate_color, validate_font_size, validate_menu_alignment, validate_text, MAX_TEXT_LENGTH,
    MAX_TITLE_LENGTH,
};

fn validate_settings(req: &UpdateSettingsRequest) -> Result<(), ApiError> {
    let mut builder = ValidationErrorBuilder::new();

    builder.check("site_title", validate_text(&req.site_title, MAX_TITLE_LENGTH));

    for (field, color) in [
        ("header_bg", &req.header_bg),
        ("header_text_color", &req.header_text_color),
        ("menu_bg", &req.menu_bg),
        ("menu_text_color", &req.menu_text_color),
        ("site_bg", &req.site_bg),
        ("site_text_color", &req.site_text_color),
        ("footer_bg", &req.footer_bg),
        ("footer_text_color", &req.footer_text_color),
    ] {
        builder.check(field, validate_color(color));
    }

    builder.check("menu_alignment", validate_menu_alignment(&req.menu_alignment));

    for (field, size) in [
        ("font_page_title", req.font_page_title),
        ("font_alinea_title", req.font_alinea_title),
        ("font_website_text", req.font_website_text),
        ("font_slideshow_footer", req.font_slideshow_footer),
    ] {
        builder.check(field, validate_font_size(size));
    }

    for (field, text) in [
        ("footer_contact", &req.footer_contact),
        ("footer_opening_hours", &req.footer_opening_hours),
        ("footer_social", &req.footer_social),
    ] {
        builder.check(field, validate_text(text, MAX_TEXT_LENGTH));
    }

    builder.finish()
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WebsiteSettings>, ApiError> {
    let settings = load_or_create_settings(&state.db).await?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<WebsiteSettings>, ApiError> {
    require_admin(&user)?;
    validate_settings(&req)?;

    let current = load_or_create_settings(&state.db).await?;

    let settings: WebsiteSettings = sqlx::query_as(
        r#"
        UPDATE websitesettings SET
            site_title = COALESCE(?, site_title),
            header_bg = COALESCE(?, header_bg),
            header_text_color = COALESCE(?, header_text_color),
            menu_bg = COALESCE(?, menu_bg),
            menu_text_color = COALESCE(?, menu_text_color),
            menu_alignment = COALESCE(?, menu_alignment),
            site_bg = COALESCE(?, site_bg),
            site_text_color = COALESCE(?, site_text_color),
            footer_bg = COALESCE(?, footer_bg),
            footer_text_color = COALESCE(?, footer_text_color),
            font_page_title = COALESCE(?, font_page_title),
            font_alinea_title = COALESCE(?, font_alinea_title),
            font_website_text = COALESCE(?, font_website_text),
            font_slideshow_footer = COALESCE(?, font_slideshow_footer),
            footer_contact = COALESCE(?, footer_contact),
            footer_opening_hours = COALESCE(?, footer_opening_hours),
            footer_social = COALESCE(?, footer_social)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&req.site_title)
    .bind(&req.header_bg)
    .bind(&req.header_text_color)
    .bind(&req.menu_bg)
    .bind(&req.menu_text_color)
    .bind(&req.menu_alignment)
    .bind(&req.site_bg)
    .bind(&req.site_text_color)
    .bind(&req.footer_bg)
    .bind(&req.footer_text_color)
    .bind(req.font_page_title)
    .bind(req.font_alinea_title)
    .bind(req.font_website_text)
    .bind(req.font_slideshow_footer)
    .bind(&req.footer_contact)
    .bind(&req.footer_opening_hours)
    .bind(&req.footer_social)
    .bind(current.id)
    .fetch_one(&state.db)
    .await?;

    info!(by = %user.username, "Updated website settings");
    Ok(Json(settings))
}

pub async fn upload_logo(
    State(state): State<Arc<AppState>>,
    user: User,
    mut multipart: Multipart,
) -> Result<Json<WebsiteSettings>, ApiError> {
    require_admin(&user)?;

    let current = load_or_create_settings(&state.db).await?;
    let file = read_file_field(&mut multipart).await?;
    let settings = state
        .files
        .replace(
            current.logo_path.as_deref(),
            &file.filename,
            &file.data,
            |path| set_logo_path(&state.db, current.id, path),
        )
        .await?;

    Ok(Json(settings))
}

async fn set_logo_path(db: &SqlitePool, id: i64, path: String) -> Result<WebsiteSettings, ApiError> {
    let settings: WebsiteSettings =
        sqlx::query_as("UPDATE websitesettings SET logo_path = ? WHERE id = ? RETURNING *")
            .bind(&path)
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| ApiError::not_found("Settings not found"))?;

    info!(path = %path, "Updated site logo");
    Ok(settings)
}
