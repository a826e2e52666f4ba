mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_sample_content;

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open (creating if needed) the database file under `data_dir` and migrate it.
pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("folio.db");
    info!("Initializing database at {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// A migrated in-memory database. Backed by a single connection that is never
/// recycled, since every SQLite memory connection is its own database.
pub async fn open_in_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Pages, content sections, users and sessions
    execute_sql(pool, include_str!("../../migrations/001_initial.sql"))
        .await
        .context("Migration 001 failed")?;

    // Migration 002: Menu ordering for pages
    let has_display_order: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info('pages') WHERE name = 'display_order'",
    )
    .fetch_optional(pool)
    .await?;
    if has_display_order.is_none() {
        execute_sql(pool, include_str!("../../migrations/002_display_order.sql"))
            .await
            .context("Migration 002 failed")?;
    }

    // Migration 003: Website settings
    let has_settings_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='websitesettings'",
    )
    .fetch_optional(pool)
    .await?;
    if has_settings_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/003_website_settings.sql"))
            .await
            .context("Migration 003 failed")?;
    }

    info!("Migrations completed");
    Ok(())
}
