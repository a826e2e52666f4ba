//! Site-wide theming settings, stored as a single row.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WebsiteSettings {
    pub id: i64,
    pub logo_path: Option<String>,
    pub site_title: Option<String>,
    pub header_bg: Option<String>,
    pub header_text_color: Option<String>,
    pub menu_bg: Option<String>,
    pub menu_text_color: Option<String>,
    /// left, center or right
    pub menu_alignment: Option<String>,
    pub site_bg: Option<String>,
    pub site_text_color: Option<String>,
    pub footer_bg: Option<String>,
    pub footer_text_color: Option<String>,
    /// Font sizes in pixels
    pub font_page_title: Option<i64>,
    pub font_alinea_title: Option<i64>,
    pub font_website_text: Option<i64>,
    pub font_slideshow_footer: Option<i64>,
    pub footer_contact: Option<String>,
    pub footer_opening_hours: Option<String>,
    pub footer_social: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub site_title: Option<String>,
    pub header_bg: Option<String>,
    pub header_text_color: Option<String>,
    pub menu_bg: Option<String>,
    pub menu_text_color: Option<String>,
    pub menu_alignment: Option<String>,
    pub site_bg: Option<String>,
    pub site_text_color: Option<String>,
    pub footer_bg: Option<String>,
    pub footer_text_color: Option<String>,
    pub font_page_title: Option<i64>,
    pub font_alinea_title: Option<i64>,
    pub font_website_text: Option<i64>,
    pub font_slideshow_footer: Option<i64>,
    pub footer_contact: Option<String>,
    pub footer_opening_hours: Option<String>,
    pub footer_social: Option<String>,
}

/// Load the settings row, inserting the defaults first if it does not exist yet.
pub async fn load_or_create_settings(pool: &SqlitePool) -> Result<WebsiteSettings, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, WebsiteSettings>(
        "SELECT * FROM websitesettings ORDER BY id LIMIT 1",
    )
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(settings) = existing {
        return Ok(settings);
    }

    let settings = sqlx::query_as::<_, WebsiteSettings>(
        r#"
        INSERT INTO websitesettings (
            site_title, header_bg, header_text_color, menu_bg, menu_text_color,
            menu_alignment, site_bg, site_text_color, footer_bg, footer_text_color,
            font_page_title, font_alinea_title, font_website_text, font_slideshow_footer,
            footer_contact, footer_opening_hours, footer_social
        )
        VALUES ('My Website', '#ffffff', '#222222', '#333333', '#ffffff',
                'center', '#f5f5f5', '#333333', '#222222', '#ffffff',
                36, 24, 16, 14,
                '', '', '')
        RETURNING *
        "#,
    )
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Created default website settings");
    Ok(settings)
}
