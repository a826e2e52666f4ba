//! Page models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::page_content::{PageContent, UpdateContentRequest};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Label shown in the site menu
    pub menu_item: Option<String>,
    pub menu_icon: Option<String>,
    /// SEO title
    pub google_title: Option<String>,
    /// SEO description
    pub google_description: Option<String>,
    pub banner_path: Option<String>,
    pub display_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Page with its content sections, ordered by position, for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWithContents {
    #[serde(flatten)]
    pub page: Page,
    pub contents: Vec<PageContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePageRequest {
    pub title: String,
    pub description: Option<String>,
    pub menu_item: Option<String>,
    pub menu_icon: Option<String>,
    pub google_title: Option<String>,
    pub google_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub menu_item: Option<String>,
    pub menu_icon: Option<String>,
    pub google_title: Option<String>,
    pub google_description: Option<String>,
}

/// One section in a bulk save, identified by id
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSectionUpdate {
    pub id: i64,
    #[serde(flatten)]
    pub fields: UpdateContentRequest,
}

/// Save the page header and every listed section in one request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveContentsRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub contents: Vec<ContentSectionUpdate>,
}
