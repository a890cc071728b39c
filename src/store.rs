//! Article storage.
//!
//! The [`ArticleStore`] trait is the keyed upsert store the pipeline writes to
//! and the CLI/server read from. [`SqliteStore`] implements it on top of the
//! `articles` table created by [`crate::migrate`].
//!
//! # Field ownership
//!
//! | Owner | Columns |
//! |-------|---------|
//! | Pipeline (overwritten by [`upsert`](ArticleStore::upsert)) | category, title, published, doc_type, topics, organisations, status, image_url, raw_text, is_pdf |
//! | Reader / AI (written only via [`update_field`](ArticleStore::update_field) and [`toggle_saved`](ArticleStore::toggle_saved)) | summary, context, translation, translation_lang, saved, notes, summary_feedback |

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::StoreError;
use crate::models::{Article, ArticleContent};

/// Default row cap for [`ArticleQuery`].
pub const DEFAULT_QUERY_LIMIT: i64 = 200;
/// Maximum number of values returned by `distinct_values`.
pub const DISTINCT_LIMIT: usize = 50;

/// What an upsert did to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    /// Content changed since the last ingestion.
    Updated,
    /// Same content as before; only `updated_at` moved.
    Unchanged,
}

/// Filters for [`ArticleStore::query`]. Empty filters match everything.
#[derive(Debug, Clone)]
pub struct ArticleQuery {
    pub category: Option<String>,
    /// Case-insensitive substring of the title.
    pub keyword: Option<String>,
    /// Match articles tagged with ANY of these (substring, case-insensitive).
    pub topics: Vec<String>,
    /// Match articles from ANY of these (substring, case-insensitive).
    pub organisations: Vec<String>,
    pub saved_only: bool,
    pub limit: i64,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            category: None,
            keyword: None,
            topics: Vec::new(),
            organisations: Vec::new(),
            saved_only: false,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Reader/AI-owned text columns that `update_field` may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    Summary,
    Context,
    Translation,
    Notes,
    SummaryFeedback,
}

impl EditableField {
    pub fn column(self) -> &'static str {
        match self {
            EditableField::Summary => "summary",
            EditableField::Context => "context",
            EditableField::Translation => "translation",
            EditableField::Notes => "notes",
            EditableField::SummaryFeedback => "summary_feedback",
        }
    }
}

impl FromStr for EditableField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(EditableField::Summary),
            "context" => Ok(EditableField::Context),
            "translation" => Ok(EditableField::Translation),
            "notes" => Ok(EditableField::Notes),
            "summary_feedback" => Ok(EditableField::SummaryFeedback),
            other => Err(StoreError::InvalidField(other.to_string())),
        }
    }
}

/// Comma-joined columns that `distinct_values` can explode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctColumn {
    Topics,
    Organisations,
}

impl DistinctColumn {
    pub fn column(self) -> &'static str {
        match self {
            DistinctColumn::Topics => "topics",
            DistinctColumn::Organisations => "organisations",
        }
    }
}

impl FromStr for DistinctColumn {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topics" => Ok(DistinctColumn::Topics),
            "organisations" => Ok(DistinctColumn::Organisations),
            other => Err(StoreError::InvalidColumn(other.to_string())),
        }
    }
}

/// Keyed article storage.
///
/// Implementations must be `Send + Sync`; the pipeline writes from
/// concurrently processed links.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert or update by URL. Only pipeline-owned columns are written on
    /// conflict.
    async fn upsert(&self, article: &ArticleContent) -> Result<UpsertOutcome, StoreError>;

    /// Filtered listing, newest published first (undated last), then most
    /// recently updated.
    async fn query(&self, query: &ArticleQuery) -> Result<Vec<Article>, StoreError>;

    async fn get(&self, id: i64) -> Result<Article, StoreError>;

    /// Flip `saved` and return the new value.
    async fn toggle_saved(&self, id: i64) -> Result<bool, StoreError>;

    /// Write one reader/AI-owned field. Writing `translation` also sets
    /// `translation_lang`, clearing it when no language is given.
    async fn update_field(
        &self,
        id: i64,
        field: &str,
        value: &str,
        translation_lang: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Distinct individual values of a comma-joined column, first-seen order.
    async fn distinct_values(&self, column: &str) -> Result<Vec<String>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}

/// SHA-256 over the pipeline-owned fields; detects real content changes.
pub fn content_hash(article: &ArticleContent) -> String {
    let mut hasher = Sha256::new();
    let fields = [
        Some(article.category.as_str()),
        Some(article.title.as_str()),
        article.published.as_deref(),
        article.doc_type.as_deref(),
        article.topics.as_deref(),
        article.organisations.as_deref(),
        article.status.as_deref(),
        article.image_url.as_deref(),
        Some(article.raw_text.as_str()),
    ];
    for field in fields {
        match field {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    hasher.update([article.is_pdf as u8]);
    format!("{:x}", hasher.finalize())
}

/// Split comma-joined values, trim, drop empties, dedupe keeping first-seen order.
pub fn explode_distinct<'a, I>(values: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for joined in values {
        for part in joined.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if seen.insert(part.to_string()) {
                out.push(part.to_string());
                if out.len() >= limit {
                    return out;
                }
            }
        }
    }
    out
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

const ARTICLE_COLUMNS: &str = "id, url, category, title, published, doc_type, topics, \
     organisations, status, image_url, raw_text, is_pdf, summary, context, translation, \
     translation_lang, saved, notes, summary_feedback, created_at, updated_at";

fn row_to_article(row: &SqliteRow) -> Result<Article, sqlx::Error> {
    Ok(Article {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        category: row.try_get("category")?,
        title: row.try_get("title")?,
        published: row.try_get("published")?,
        doc_type: row.try_get("doc_type")?,
        topics: row.try_get("topics")?,
        organisations: row.try_get("organisations")?,
        status: row.try_get("status")?,
        image_url: row.try_get("image_url")?,
        raw_text: row.try_get("raw_text")?,
        is_pdf: row.try_get("is_pdf")?,
        summary: row.try_get("summary")?,
        context: row.try_get("context")?,
        translation: row.try_get("translation")?,
        translation_lang: row.try_get("translation_lang")?,
        saved: row.try_get("saved")?,
        notes: row.try_get("notes")?,
        summary_feedback: row.try_get("summary_feedback")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Append `AND (col LIKE ? OR col LIKE ? ...)` for a non-empty value list.
fn push_any_like(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, values: &[String]) {
    let values: Vec<&String> = values.iter().filter(|v| !v.trim().is_empty()).collect();
    if values.is_empty() {
        return;
    }
    builder.push(" AND (");
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(column);
        builder.push(" LIKE ");
        builder.push_bind(like_pattern(value));
        builder.push(" ESCAPE '\\'");
    }
    builder.push(")");
}

/// SQLite implementation of [`ArticleStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn upsert(&self, article: &ArticleContent) -> Result<UpsertOutcome, StoreError> {
        let hash = content_hash(article);
        let now = chrono::Utc::now().timestamp();

        let previous: Option<String> =
            sqlx::query_scalar("SELECT content_hash FROM articles WHERE url = ?")
                .bind(&article.url)
                .fetch_optional(&self.pool)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO articles (url, category, title, published, doc_type, topics,
                                  organisations, status, image_url, raw_text, is_pdf,
                                  content_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                category = excluded.category,
                title = excluded.title,
                published = excluded.published,
                doc_type = excluded.doc_type,
                topics = excluded.topics,
                organisations = excluded.organisations,
                status = excluded.status,
                image_url = excluded.image_url,
                raw_text = excluded.raw_text,
                is_pdf = excluded.is_pdf,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&article.url)
        .bind(&article.category)
        .bind(&article.title)
        .bind(&article.published)
        .bind(&article.doc_type)
        .bind(&article.topics)
        .bind(&article.organisations)
        .bind(&article.status)
        .bind(&article.image_url)
        .bind(&article.raw_text)
        .bind(article.is_pdf)
        .bind(&hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(match previous {
            None => UpsertOutcome::Inserted,
            Some(old) if old == hash => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        })
    }

    async fn query(&self, query: &ArticleQuery) -> Result<Vec<Article>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles WHERE 1=1", ARTICLE_COLUMNS));

        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            builder.push(" AND category = ");
            builder.push_bind(category.to_string());
        }
        if query.saved_only {
            builder.push(" AND saved = 1");
        }
        if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            builder.push(" AND title LIKE ");
            builder.push_bind(like_pattern(keyword));
            builder.push(" ESCAPE '\\'");
        }
        push_any_like(&mut builder, "topics", &query.topics);
        push_any_like(&mut builder, "organisations", &query.organisations);

        builder.push(" ORDER BY published DESC NULLS LAST, updated_at DESC, id DESC LIMIT ");
        builder.push_bind(query.limit.max(0));

        let rows = builder.build().fetch_all(&self.pool).await?;
        let articles = rows
            .iter()
            .map(row_to_article)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    async fn get(&self, id: i64) -> Result<Article, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;
        Ok(row_to_article(&row)?)
    }

    async fn toggle_saved(&self, id: i64) -> Result<bool, StoreError> {
        let saved: Option<bool> = sqlx::query_scalar(
            "UPDATE articles SET saved = 1 - saved, updated_at = ? WHERE id = ? RETURNING saved",
        )
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        saved.ok_or(StoreError::NotFound(id))
    }

    async fn update_field(
        &self,
        id: i64,
        field: &str,
        value: &str,
        translation_lang: Option<&str>,
    ) -> Result<(), StoreError> {
        let field: EditableField = field.parse()?;
        let now = chrono::Utc::now().timestamp();

        // Column names come from the closed EditableField set, never from input.
        let result = match field {
            // The language always describes the current translation.
            EditableField::Translation => {
                sqlx::query(
                    "UPDATE articles SET translation = ?, translation_lang = ?, updated_at = ? WHERE id = ?",
                )
                .bind(value)
                .bind(translation_lang)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            _ => {
                sqlx::query(&format!(
                    "UPDATE articles SET {} = ?, updated_at = ? WHERE id = ?",
                    field.column()
                ))
                .bind(value)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn distinct_values(&self, column: &str) -> Result<Vec<String>, StoreError> {
        let column: DistinctColumn = column.parse()?;
        let values: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT {col} FROM articles WHERE {col} IS NOT NULL AND {col} != '' \
             ORDER BY updated_at DESC, id DESC",
            col = column.column()
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(explode_distinct(values.iter().map(String::as_str), DISTINCT_LIMIT))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
