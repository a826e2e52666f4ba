//! Page content sections (hero banners, text blocks, pricing items).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Title given to a freshly inserted section
pub const DEFAULT_CONTENT_TITLE: &str = "Nieuwe alinea";

/// Body given to a freshly inserted section
pub const DEFAULT_CONTENT_BODY: &str = "Replace this text...";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PageContent {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<String>,
    #[sqlx(rename = "pictureText")]
    pub picture_text: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub content_type: String,
    #[sqlx(rename = "pageId")]
    pub page_id: i64,
    pub position: i64,
    pub created: String,
}

/// Where a new section goes in the page's list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    #[default]
    Bottom,
}

impl Anchor {
    /// Parse a request parameter; absent or unrecognised values mean bottom.
    pub fn from_param(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

impl std::str::FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            _ => Err(format!("Unknown anchor: {}", s)),
        }
    }
}

/// Request to add a section to a page
#[derive(Debug, Clone, Deserialize)]
pub struct InsertContentRequest {
    #[serde(rename = "type")]
    pub content_type: String,
    /// Anything other than a string is treated as absent
    #[serde(default, deserialize_with = "string_or_none")]
    pub anchor: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

/// Editable fields of a section. Position is not editable here; it only
/// changes through insert, delete and move.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<String>,
    pub picture_text: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}
