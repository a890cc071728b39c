//! CLI commands over stored articles.
//!
//! Each command opens the database, runs one [`ArticleStore`] operation and
//! prints the result. The AI commands (`summarize`, `translate`, `context`)
//! write their output back through `update_field`.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::ai::{create_service, document_context};
use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::Article;
use crate::store::{ArticleQuery, ArticleStore, SqliteStore};

async fn open_store(config: &Config) -> Result<(SqlitePool, SqliteStore)> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    Ok((pool.clone(), SqliteStore::new(pool)))
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// `presspaper list`
pub async fn run_list(config: &Config, query: &ArticleQuery) -> Result<()> {
    let (pool, store) = open_store(config).await?;
    let articles = store.query(query).await?;
    pool.close().await;

    if articles.is_empty() {
        println!("No articles.");
        return Ok(());
    }

    for article in &articles {
        let marker = if article.saved { "*" } else { " " };
        println!("{} [{}] {}", marker, article.id, article.title);
        println!(
            "    {} | {}",
            article.category,
            article.published.as_deref().unwrap_or("undated")
        );
        if let Some(ref topics) = article.topics {
            println!("    topics: {}", topics);
        }
        println!("    url: {}", article.url);
        println!();
    }
    println!("{} article(s)", articles.len());

    Ok(())
}

/// `presspaper get <id>`
pub async fn run_get(config: &Config, id: i64) -> Result<()> {
    let (pool, store) = open_store(config).await?;
    let article = store.get(id).await;
    pool.close().await;
    print_article(&article?);
    Ok(())
}

fn print_article(a: &Article) {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("--- Article ---");
    println!("id:            {}", a.id);
    println!("title:         {}", a.title);
    println!("url:           {}", a.url);
    println!("category:      {}", a.category);
    println!("published:     {}", or_dash(&a.published));
    println!("topics:        {}", or_dash(&a.topics));
    println!("organisations: {}", or_dash(&a.organisations));
    if let Some(ref image) = a.image_url {
        println!("image_url:     {}", image);
    }
    println!("pdf:           {}", a.is_pdf);
    println!("saved:         {}", a.saved);
    println!("created_at:    {}", format_ts_iso(a.created_at));
    println!("updated_at:    {}", format_ts_iso(a.updated_at));
    println!();

    for (label, value) in [
        ("Context", &a.context),
        ("Summary", &a.summary),
        ("Notes", &a.notes),
    ] {
        if let Some(text) = value {
            println!("--- {} ---", label);
            println!("{}", text);
            println!();
        }
    }
    if let Some(ref translation) = a.translation {
        println!(
            "--- Translation ({}) ---",
            a.translation_lang.as_deref().unwrap_or("?")
        );
        println!("{}", translation);
        println!();
    }

    println!("--- Text ---");
    println!("{}", a.raw_text);
}

/// `presspaper save <id>`
pub async fn run_toggle_saved(config: &Config, id: i64) -> Result<()> {
    let (pool, store) = open_store(config).await?;
    let saved = store.toggle_saved(id).await;
    pool.close().await;
    println!("article {} saved: {}", id, saved?);
    Ok(())
}

/// `presspaper set <id> <field> <value>`
pub async fn run_set(
    config: &Config,
    id: i64,
    field: &str,
    value: &str,
    lang: Option<&str>,
) -> Result<()> {
    let (pool, store) = open_store(config).await?;
    let result = store.update_field(id, field, value, lang).await;
    pool.close().await;
    result?;
    println!("article {}: {} updated", id, field);
    println!("ok");
    Ok(())
}

/// `presspaper distinct <column>`
pub async fn run_distinct(config: &Config, column: &str) -> Result<()> {
    let (pool, store) = open_store(config).await?;
    let values = store.distinct_values(column).await;
    pool.close().await;
    for value in values? {
        println!("{}", value);
    }
    Ok(())
}

/// `presspaper summarize <id>`
pub async fn run_summarize(config: &Config, id: i64) -> Result<()> {
    let service = create_service(&config.ai)?;
    let (pool, store) = open_store(config).await?;

    let result = async {
        let article = store.get(id).await?;
        let summary = service.summarize(&article.raw_text).await?;
        store.update_field(id, "summary", &summary, None).await?;
        Ok::<_, anyhow::Error>(summary)
    }
    .await;
    pool.close().await;

    println!("{}", result?);
    Ok(())
}

/// `presspaper translate <id> --lang <language>`
pub async fn run_translate(config: &Config, id: i64, lang: &str) -> Result<()> {
    let service = create_service(&config.ai)?;
    let (pool, store) = open_store(config).await?;

    let result = async {
        let article = store.get(id).await?;
        let translation = service.translate(&article.raw_text, lang).await?;
        store
            .update_field(id, "translation", &translation, Some(lang))
            .await?;
        Ok::<_, anyhow::Error>(translation)
    }
    .await;
    pool.close().await;

    println!("{}", result?);
    Ok(())
}

/// `presspaper context <id>`
pub async fn run_context(config: &Config, id: i64) -> Result<()> {
    let (pool, store) = open_store(config).await?;

    let result = async {
        let article = store.get(id).await?;
        let context = document_context(&article);
        store.update_field(id, "context", &context, None).await?;
        Ok::<_, anyhow::Error>(context)
    }
    .await;
    pool.close().await;

    println!("{}", result?);
    Ok(())
}
