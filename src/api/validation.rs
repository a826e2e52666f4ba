//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TEXT_LENGTH: usize = 100_000;
pub const MIN_FONT_SIZE: i64 = 8;
pub const MAX_FONT_SIZE: i64 = 96;

lazy_static! {
    /// Regex for validating CSS hex colors (#rgb or #rrggbb)
    static ref COLOR_REGEX: Regex = Regex::new(
        r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$"
    ).unwrap();

    /// Regex for validating usernames (2-50 chars, starting with alphanumeric)
    static ref USERNAME_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9_.-]{1,49}$"
    ).unwrap();

    /// Regex for validating content section types (e.g. text, image, price-list)
    static ref CONTENT_TYPE_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9_-]{0,49}$"
    ).unwrap();
}

/// Validate a page title
pub fn validate_page_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title is too long (max {} characters)",
            MAX_TITLE_LENGTH
        ));
    }

    Ok(())
}

/// Validate the length of an optional free-text field
pub fn validate_text(value: &Option<String>, max: usize) -> Result<(), String> {
    match value {
        Some(v) if v.chars().count() > max => {
            Err(format!("Value is too long (max {} characters)", max))
        }
        _ => Ok(()),
    }
}

/// Validate a content section type
pub fn validate_content_type(content_type: &str) -> Result<(), String> {
    if content_type.trim().is_empty() {
        return Err("Content type is required".to_string());
    }

    if !CONTENT_TYPE_REGEX.is_match(content_type.trim()) {
        return Err(
            "Content type must be alphanumeric with dashes or underscores (max 50 characters)"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate a section link (optional field)
pub fn validate_link(link: &Option<String>) -> Result<(), String> {
    if let Some(l) = link {
        if l.len() > 2048 {
            return Err("Link is too long (max 2048 characters)".to_string());
        }

        if l.trim().to_lowercase().starts_with("javascript:") {
            return Err("Link scheme is not allowed".to_string());
        }
    }
    Ok(())
}

/// Validate a section price (optional field)
pub fn validate_price(price: Option<f64>) -> Result<(), String> {
    match price {
        Some(p) if !p.is_finite() => Err("Price must be a number".to_string()),
        Some(p) if p < 0.0 => Err("Price cannot be negative".to_string()),
        _ => Ok(()),
    }
}

/// Validate a color (optional field)
pub fn validate_color(color: &Option<String>) -> Result<(), String> {
    match color {
        Some(c) if !COLOR_REGEX.is_match(c) => {
            Err("Color must be a hex value like #fff or #ffffff".to_string())
        }
        _ => Ok(()),
    }
}

/// Validate the menu alignment (optional field)
pub fn validate_menu_alignment(alignment: &Option<String>) -> Result<(), String> {
    match alignment.as_deref() {
        None | Some("left") | Some("center") | Some("right") => Ok(()),
        Some(_) => Err("Menu alignment must be one of: left, center, right".to_string()),
    }
}

/// Validate a font size in pixels (optional field)
pub fn validate_font_size(size: Option<i64>) -> Result<(), String> {
    match size {
        Some(s) if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&s) => Err(format!(
            "Font size must be between {} and {}",
            MIN_FONT_SIZE, MAX_FONT_SIZE
        )),
        _ => Ok(()),
    }
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 2-50 characters of letters, digits, dots, dashes or underscores"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 5 {
        return Err("Password must be at least 5 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_page_title() {
        assert!(validate_page_title("Home").is_ok());
        assert!(validate_page_title("Prijzen & tarieven").is_ok());

        assert!(validate_page_title("").is_err());
        assert!(validate_page_title("   ").is_err());
        assert!(validate_page_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text(&None, 10).is_ok());
        assert!(validate_text(&Some("short".to_string()), 10).is_ok());
        assert!(validate_text(&Some("much too long".to_string()), 10).is_err());
    }

    #[test]
    fn test_validate_content_type() {
        assert!(validate_content_type("text").is_ok());
        assert!(validate_content_type("price-list").is_ok());
        assert!(validate_content_type("image_left").is_ok());

        assert!(validate_content_type("").is_err());
        assert!(validate_content_type("two words").is_err());
        assert!(validate_content_type("<script>").is_err());
    }

    #[test]
    fn test_validate_link() {
        assert!(validate_link(&None).is_ok());
        assert!(validate_link(&Some("https://example.com".to_string())).is_ok());
        assert!(validate_link(&Some("/contact".to_string())).is_ok());

        assert!(validate_link(&Some("JavaScript:alert(1)".to_string())).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(None).is_ok());
        assert!(validate_price(Some(0.0)).is_ok());
        assert!(validate_price(Some(12.5)).is_ok());

        assert!(validate_price(Some(-1.0)).is_err());
        assert!(validate_price(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color(&None).is_ok());
        assert!(validate_color(&Some("#fff".to_string())).is_ok());
        assert!(validate_color(&Some("#A1B2C3".to_string())).is_ok());

        assert!(validate_color(&Some("fff".to_string())).is_err());
        assert!(validate_color(&Some("#ffff".to_string())).is_err());
        assert!(validate_color(&Some("red".to_string())).is_err());
    }

    #[test]
    fn test_validate_menu_alignment() {
        assert!(validate_menu_alignment(&None).is_ok());
        assert!(validate_menu_alignment(&Some("left".to_string())).is_ok());
        assert!(validate_menu_alignment(&Some("right".to_string())).is_ok());

        assert!(validate_menu_alignment(&Some("justify".to_string())).is_err());
        assert!(validate_menu_alignment(&Some("Center".to_string())).is_err());
    }

    #[test]
    fn test_validate_font_size() {
        assert!(validate_font_size(None).is_ok());
        assert!(validate_font_size(Some(8)).is_ok());
        assert!(validate_font_size(Some(96)).is_ok());

        assert!(validate_font_size(Some(7)).is_err());
        assert!(validate_font_size(Some(97)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("admin").is_ok());
        assert!(validate_username("jan.de-vries").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("a").is_err());
        assert!(validate_username(".hidden").is_err());
        assert!(validate_username("with space").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("admin").is_ok());
        assert!(validate_password("abcd").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }
}
