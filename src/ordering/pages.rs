//! Page ordering in the site menu.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::db::{CreatePageRequest, Page};

use super::plan::{self, Plan, Slot};
use super::{Actor, Direction, MoveOutcome, OrderingError};

async fn load_slots(conn: &mut SqliteConnection) -> Result<Vec<Slot>, sqlx::Error> {
    sqlx::query_as::<_, Slot>("SELECT id, display_order AS rank FROM pages ORDER BY display_order, id")
        .fetch_all(conn)
        .await
}

async fn write_slots(conn: &mut SqliteConnection, slots: &[Slot]) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    for slot in slots {
        sqlx::query("UPDATE pages SET display_order = ?, updated_at = ? WHERE id = ?")
            .bind(slot.rank)
            .bind(&now)
            .bind(slot.id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Create a page at the end of the menu. Admin only.
pub async fn create_page(
    pool: &SqlitePool,
    actor: &Actor,
    req: &CreatePageRequest,
) -> Result<Page, OrderingError> {
    actor.require_admin()?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(OrderingError::Validation {
            field: "title",
            message: "Page title is required".to_string(),
        });
    }

    let mut tx = pool.begin().await?;

    let slots = load_slots(&mut tx).await?;
    let display_order = plan::next_rank(&slots);
    let now = chrono::Utc::now().to_rfc3339();

    let page = sqlx::query_as::<_, Page>(
        r#"
        INSERT INTO pages (title, description, menu_item, menu_icon, google_title, google_description,
                           display_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(&req.description)
    .bind(&req.menu_item)
    .bind(&req.menu_icon)
    .bind(&req.google_title)
    .bind(&req.google_description)
    .bind(display_order)
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(page_id = page.id, display_order, user = %actor.username, "Created page");
    Ok(page)
}

/// Delete a page together with its sections. Admin only.
///
/// Display orders of the remaining pages are left as they are; the menu is
/// ordered by rank, not by contiguity.
pub async fn delete_page(
    pool: &SqlitePool,
    actor: &Actor,
    page_id: i64,
) -> Result<Page, OrderingError> {
    actor.require_admin()?;

    let mut tx = pool.begin().await?;

    let page = sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE id = ?")
        .bind(page_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(OrderingError::NotFound("Page"))?;

    let removed = sqlx::query("DELETE FROM pagecontent WHERE pageId = ?")
        .bind(page_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM pages WHERE id = ?")
        .bind(page_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(page_id, sections = removed, user = %actor.username, "Deleted page");
    Ok(page)
}

/// Swap a page with its neighbour in the menu. Admin only.
pub async fn move_page(
    pool: &SqlitePool,
    actor: &Actor,
    page_id: i64,
    direction: Direction,
) -> Result<MoveOutcome, OrderingError> {
    actor.require_admin()?;

    let mut tx = pool.begin().await?;

    let slots = load_slots(&mut tx).await?;

    match plan::plan_sequence_swap(&slots, page_id, direction) {
        Plan::Missing => Err(OrderingError::NotFound("Page")),
        Plan::Unchanged => {
            debug!(page_id, ?direction, "Page already at the edge of the menu");
            Ok(MoveOutcome::Unchanged)
        }
        Plan::Apply(changes) => {
            write_slots(&mut tx, &changes).await?;
            tx.commit().await?;

            info!(
                page_id,
                ?direction,
                written = changes.len(),
                user = %actor.username,
                "Moved page"
            );
            Ok(MoveOutcome::Moved)
        }
    }
}
