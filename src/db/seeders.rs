//! Database seeders for built-in data
//!
//! Fills an empty installation with a few sample pages and sections so the
//! site has something to render on first start.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Seed sample pages and content (only when the tables are empty)
pub async fn seed_sample_content(pool: &SqlitePool) -> Result<()> {
    let page_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages")
        .fetch_one(pool)
        .await?;

    if page_count == 0 {
        info!("Seeding sample pages...");
        let now = chrono::Utc::now().to_rfc3339();

        // (title, description, menu label, SEO title, SEO description)
        let pages: [(&str, &str, &str, &str, &str); 3] = [
            ("Welcome", "Welcome to our website", "Home", "Welcome Page", "Welcome to our site"),
            ("Contact", "Contact us", "Contact", "Contact Us", "Get in touch"),
            ("News", "Latest news", "News", "News", "Stay updated"),
        ];

        for (order, (title, description, menu_item, google_title, google_description)) in
            pages.iter().enumerate()
        {
            sqlx::query(
                r#"
                INSERT INTO pages (title, description, menu_item, google_title, google_description,
                                   display_order, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(title)
            .bind(description)
            .bind(menu_item)
            .bind(google_title)
            .bind(google_description)
            .bind(order as i64 + 1)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;
        }
    }

    let content_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pagecontent")
        .fetch_one(pool)
        .await?;

    let first_page: Option<i64> =
        sqlx::query_scalar("SELECT id FROM pages ORDER BY display_order, id LIMIT 1")
            .fetch_optional(pool)
            .await?;

    if let (0, Some(page_id)) = (content_count, first_page) {
        info!(page_id, "Seeding sample content sections...");
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO pagecontent (title, content, link, price, duration, pictureText, type, pageId, position, created)
            VALUES ('Hero Section', 'Welcome to our amazing website!', 'https://example.com', 0.0, 'N/A', 'Hero image', 'hero', ?1, 1, ?2),
                   ('About Us', 'We are a great company.', NULL, NULL, NULL, NULL, 'text', ?1, 2, ?2)
            "#,
        )
        .bind(page_id)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(())
}
