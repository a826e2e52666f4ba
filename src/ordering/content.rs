//! Section ordering within a single page.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::db::{Anchor, PageContent, DEFAULT_CONTENT_BODY, DEFAULT_CONTENT_TITLE};

use super::plan::{self, Plan, Slot};
use super::{Direction, MoveOutcome, OrderingError};

/// A section to add to a page
#[derive(Debug, Clone)]
pub struct NewContent {
    pub content_type: String,
    pub anchor: Anchor,
}

impl NewContent {
    pub fn new(content_type: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            content_type: content_type.into(),
            anchor,
        }
    }
}

async fn page_exists(conn: &mut SqliteConnection, page_id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM pages WHERE id = ?")
        .bind(page_id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

async fn load_slots(conn: &mut SqliteConnection, page_id: i64) -> Result<Vec<Slot>, sqlx::Error> {
    sqlx::query_as::<_, Slot>(
        "SELECT id, position AS rank FROM pagecontent WHERE pageId = ? ORDER BY position, id",
    )
    .bind(page_id)
    .fetch_all(conn)
    .await
}

async fn write_slots(
    conn: &mut SqliteConnection,
    page_id: i64,
    slots: &[Slot],
) -> Result<(), sqlx::Error> {
    for slot in slots {
        sqlx::query("UPDATE pagecontent SET position = ? WHERE id = ? AND pageId = ?")
            .bind(slot.rank)
            .bind(slot.id)
            .bind(page_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Add a section to the top or bottom of a page.
pub async fn insert_content(
    pool: &SqlitePool,
    page_id: i64,
    new: NewContent,
) -> Result<PageContent, OrderingError> {
    let content_type = new.content_type.trim();
    if content_type.is_empty() {
        return Err(OrderingError::Validation {
            field: "type",
            message: "Content type is required".to_string(),
        });
    }

    let mut tx = pool.begin().await?;

    if !page_exists(&mut tx, page_id).await? {
        return Err(OrderingError::NotFound("Page"));
    }

    let slots = load_slots(&mut tx, page_id).await?;

    let position = match new.anchor {
        Anchor::Bottom => plan::next_rank(&slots),
        Anchor::Top => {
            write_slots(&mut tx, page_id, &plan::plan_shift_for_top(&slots)).await?;
            1
        }
    };

    let content = sqlx::query_as::<_, PageContent>(
        r#"
        INSERT INTO pagecontent (title, content, type, pageId, position, created)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(DEFAULT_CONTENT_TITLE)
    .bind(DEFAULT_CONTENT_BODY)
    .bind(content_type)
    .bind(page_id)
    .bind(position)
    .bind(chrono::Utc::now().to_rfc3339())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        page_id,
        content_id = content.id,
        position,
        anchor = %new.anchor,
        "Inserted content section"
    );
    Ok(content)
}

/// Remove a section and close the gap it leaves.
pub async fn delete_content(
    pool: &SqlitePool,
    page_id: i64,
    content_id: i64,
) -> Result<(), OrderingError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM pagecontent WHERE id = ? AND pageId = ?")
        .bind(content_id)
        .bind(page_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(OrderingError::NotFound("Content"));
    }

    let remaining = load_slots(&mut tx, page_id).await?;
    let changes = plan::plan_resequence(&remaining);
    write_slots(&mut tx, page_id, &changes).await?;

    tx.commit().await?;

    info!(
        page_id,
        content_id,
        renumbered = changes.len(),
        "Deleted content section"
    );
    Ok(())
}

/// Swap a section with its neighbour above or below.
pub async fn move_content(
    pool: &SqlitePool,
    page_id: i64,
    content_id: i64,
    direction: Direction,
) -> Result<MoveOutcome, OrderingError> {
    let mut tx = pool.begin().await?;

    let slots = load_slots(&mut tx, page_id).await?;

    match plan::plan_exact_swap(&slots, content_id, direction) {
        Plan::Missing => Err(OrderingError::NotFound("Content")),
        Plan::Unchanged => {
            debug!(page_id, content_id, ?direction, "Content already at the edge");
            Ok(MoveOutcome::Unchanged)
        }
        Plan::Apply(changes) => {
            write_slots(&mut tx, page_id, &changes).await?;
            tx.commit().await?;

            info!(page_id, content_id, ?direction, "Moved content section");
            Ok(MoveOutcome::Moved)
        }
    }
}
