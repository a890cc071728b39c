use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Open the database and bring the schema up to date.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema creation on an existing pool.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Create articles table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL,
            title TEXT NOT NULL,
            published TEXT,
            doc_type TEXT,
            topics TEXT,
            organisations TEXT,
            status TEXT,
            image_url TEXT,
            raw_text TEXT NOT NULL,
            is_pdf INTEGER NOT NULL DEFAULT 0,
            summary TEXT,
            context TEXT,
            translation TEXT,
            translation_lang TEXT,
            saved INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            summary_feedback TEXT,
            content_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_saved ON articles(saved)")
        .execute(pool)
        .await?;

    Ok(())
}
