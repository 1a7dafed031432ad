//! Database access for vellum-of

pub mod order_store;

pub use order_store::{NewOrder, OrderStore, StoreError};

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize vellum-of specific tables
///
/// Creates the orders table if it does not exist. `draft_content` holds the
/// pipeline's in-flight working copy and is cleared by the completion write;
/// it never appears in the public order payload.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            customer_name TEXT NOT NULL,
            customer_email TEXT NOT NULL,
            tier TEXT NOT NULL,
            niche TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending_form',
            progress INTEGER NOT NULL DEFAULT 0,
            ebook_content TEXT,
            draft_content TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (orders)");

    Ok(())
}
