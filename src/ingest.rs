//! Ingestion pipeline orchestration.
//!
//! One run walks `COLLECT → (per link: EXTRACT → CLASSIFY → PERSIST)`:
//! collect candidate links from every category listing, extract each link,
//! drop junk, tag topics and upsert by URL. Re-running is idempotent.
//!
//! Links are processed through a bounded stream (`pipeline.concurrency`,
//! default 1). Each link yields one [`LinkOutcome`] and the run summary is
//! folded from those, so concurrent links never share counters. Runs
//! themselves are serialized by a lock, so the scheduler and an on-demand
//! trigger never overlap.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::collect::collect_links;
use crate::config::Config;
use crate::db;
use crate::extract::extract;
use crate::fetch::{create_fetcher, Fetcher};
use crate::migrate;
use crate::models::{ArticleContent, LinkCandidate, RunSummary};
use crate::store::{ArticleStore, SqliteStore, UpsertOutcome};
use crate::topics::guess_topics;

/// What happened to one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Stored(UpsertOutcome),
    Skipped(String),
}

/// Owns the collaborators for ingestion runs.
pub struct Pipeline {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArticleStore>,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, fetcher: Arc<dyn Fetcher>, store: Arc<dyn ArticleStore>) -> Self {
        Self {
            config,
            fetcher,
            store,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one full ingestion pass.
    ///
    /// Fails only when collection as a whole fails (every listing page
    /// unreachable). Per-link problems are counted as skips.
    #[instrument(level = "info", skip(self), fields(fetcher = self.fetcher.name()))]
    pub async fn run(&self, max_pages_each: u32) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().await;

        let links = collect_links(
            self.fetcher.as_ref(),
            &self.config.source,
            self.config.collect.min_title_chars,
            max_pages_each,
        )
        .await?;

        let total_links = links.len() as u64;
        let concurrency = self.config.pipeline.concurrency.max(1);

        let outcomes: Vec<LinkOutcome> = stream::iter(links)
            .map(|link| self.process_link(link))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut summary = RunSummary {
            total_links,
            ..RunSummary::default()
        };
        let (mut inserted, mut updated, mut unchanged) = (0u64, 0u64, 0u64);
        for outcome in &outcomes {
            match outcome {
                LinkOutcome::Stored(how) => {
                    summary.kept += 1;
                    match how {
                        UpsertOutcome::Inserted => inserted += 1,
                        UpsertOutcome::Updated => updated += 1,
                        UpsertOutcome::Unchanged => unchanged += 1,
                    }
                }
                LinkOutcome::Skipped(_) => summary.skipped += 1,
            }
        }

        info!(
            kept = summary.kept,
            skipped = summary.skipped,
            total_links = summary.total_links,
            inserted,
            updated,
            unchanged,
            "Pipeline run complete"
        );
        Ok(summary)
    }

    /// Extract, classify and persist one link.
    async fn process_link(&self, link: LinkCandidate) -> LinkOutcome {
        let result = extract(self.fetcher.as_ref(), &link.url, &self.config.extract).await;

        if let Some(reason) = &result.junk_reason {
            if reason.is_hard() {
                debug!(url = %link.url, %reason, "Skipping junk");
                return LinkOutcome::Skipped(reason.to_string());
            }
        }

        let text = result.text.trim();
        if text.is_empty() {
            let reason = result
                .junk_reason
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "empty".to_string());
            debug!(url = %link.url, %reason, "Skipping empty extraction");
            return LinkOutcome::Skipped(reason);
        }

        let topics = guess_topics(&link.title, text, self.config.pipeline.max_topics);
        let metadata = result.metadata;
        let article = ArticleContent {
            url: link.url,
            category: link.category,
            title: link.title,
            published: metadata.published,
            doc_type: metadata.doc_type,
            topics: if topics.is_empty() {
                None
            } else {
                Some(topics.join(", "))
            },
            organisations: Some(
                metadata
                    .organisation
                    .unwrap_or_else(|| self.config.extract.default_organisation.clone()),
            ),
            status: metadata.status,
            image_url: metadata.image_url,
            raw_text: text.to_string(),
            is_pdf: result.is_pdf,
        };

        match self.store.upsert(&article).await {
            Ok(outcome) => {
                debug!(url = %article.url, ?outcome, "Stored article");
                LinkOutcome::Stored(outcome)
            }
            Err(e) => {
                warn!(error = %e, url = %article.url, "Upsert failed; skipping link");
                LinkOutcome::Skipped(format!("store: {}", e))
            }
        }
    }
}

/// CLI entry point: one run against the configured site and database.
pub async fn run_once(config: &Config, max_pages_each: Option<u32>) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;

    let fetcher = create_fetcher(config)?;
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let pipeline = Pipeline::new(Arc::new(config.clone()), fetcher, store);

    let max_pages = max_pages_each.unwrap_or(config.source.max_pages_each);
    let summary = pipeline.run(max_pages).await?;

    println!("run (max pages per category: {})", max_pages);
    println!("  links collected: {}", summary.total_links);
    println!("  kept: {}", summary.kept);
    println!("  skipped: {}", summary.skipped);
    println!("ok");

    pool.close().await;
    Ok(())
}
