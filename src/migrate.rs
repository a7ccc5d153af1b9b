use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the clips schema. Idempotent; shared by `clipvault init`,
/// the serve startup path, and the test fixtures.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clips (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            storage_path TEXT NOT NULL,
            thumbnail_url TEXT,
            ai_summary TEXT NOT NULL,
            ai_tags TEXT NOT NULL,
            ai_category TEXT,
            extracted_text TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_clips_created_at ON clips(created_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_clips_file_type ON clips(file_type)")
        .execute(pool)
        .await?;

    Ok(())
}

/// `clipvault init` entry point: open (or create) the database and migrate.
pub async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    run_migrations(&pool).await?;
    pool.close().await;
    Ok(())
}
