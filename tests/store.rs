//! Integration tests for the SQLite article store.

use presspaper::config::Config;
use presspaper::db;
use presspaper::error::StoreError;
use presspaper::migrate;
use presspaper::models::ArticleContent;
use presspaper::store::{ArticleQuery, ArticleStore, SqliteStore, UpsertOutcome};
use tempfile::TempDir;

async fn open() -> (TempDir, SqliteStore) {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_toml_str(
        &format!("[db]\npath = \"{}/store.sqlite\"\n", tmp.path().display()),
        |_| None,
    )
    .unwrap();
    let pool = db::connect(&config).await.unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    // Migrations must be re-runnable.
    migrate::migrate_pool(&pool).await.unwrap();
    (tmp, SqliteStore::new(pool))
}

fn article(slug: &str, title: &str) -> ArticleContent {
    ArticleContent {
        url: format!("https://www.gov.wales/{}", slug),
        category: "Announcements".to_string(),
        title: title.to_string(),
        published: None,
        doc_type: None,
        topics: None,
        organisations: Some("Welsh Government".to_string()),
        status: None,
        image_url: None,
        raw_text: format!("Body of {}", title),
        is_pdf: false,
    }
}

/// Three articles: two dated, one undated, with distinct topics.
async fn seed(store: &SqliteStore) -> (i64, i64, i64) {
    let mut old = article("old", "Older bus announcement");
    old.published = Some("2024-01-10".to_string());
    old.topics = Some("Transport, Public sector".to_string());

    let mut new = article("new", "Newer school funding");
    new.published = Some("2024-06-01".to_string());
    new.topics = Some("Education and skills".to_string());
    new.category = "Publications".to_string();

    let mut undated = article("undated", "Undated housing note");
    undated.topics = Some("Housing, Transport".to_string());
    undated.organisations = Some("Senedd Cymru".to_string());

    for a in [&old, &new, &undated] {
        assert_eq!(store.upsert(a).await.unwrap(), UpsertOutcome::Inserted);
    }

    let id = |rows: &[presspaper::models::Article], url: &str| {
        rows.iter().find(|a| a.url == url).unwrap().id
    };
    let all = store.query(&ArticleQuery::default()).await.unwrap();
    (
        id(&all, &old.url),
        id(&all, &new.url),
        id(&all, &undated.url),
    )
}

fn titles(rows: &[presspaper::models::Article]) -> Vec<&str> {
    rows.iter().map(|a| a.title.as_str()).collect()
}

#[tokio::test]
async fn upsert_reports_inserted_updated_unchanged() {
    let (_tmp, store) = open().await;
    let mut a = article("a", "First title");

    assert_eq!(store.upsert(&a).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.upsert(&a).await.unwrap(), UpsertOutcome::Unchanged);
    a.title = "Second title".to_string();
    assert_eq!(store.upsert(&a).await.unwrap(), UpsertOutcome::Updated);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn query_orders_dated_newest_first_and_undated_last() {
    let (_tmp, store) = open().await;
    seed(&store).await;

    let rows = store.query(&ArticleQuery::default()).await.unwrap();
    assert_eq!(
        titles(&rows),
        vec![
            "Newer school funding",
            "Older bus announcement",
            "Undated housing note"
        ]
    );
}

#[tokio::test]
async fn query_filters_combine() {
    let (_tmp, store) = open().await;
    let (old_id, _, _) = seed(&store).await;

    let by_category = store
        .query(&ArticleQuery {
            category: Some("Publications".to_string()),
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&by_category), vec!["Newer school funding"]);

    let by_keyword = store
        .query(&ArticleQuery {
            keyword: Some("BUS".to_string()),
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&by_keyword), vec!["Older bus announcement"]);

    // Topics match ANY of the requested values.
    let by_topics = store
        .query(&ArticleQuery {
            topics: vec!["housing".to_string(), "education".to_string()],
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(
        titles(&by_topics),
        vec!["Newer school funding", "Undated housing note"]
    );

    let by_org = store
        .query(&ArticleQuery {
            organisations: vec!["senedd".to_string()],
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&by_org), vec!["Undated housing note"]);

    store.toggle_saved(old_id).await.unwrap();
    let saved = store
        .query(&ArticleQuery {
            saved_only: true,
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&saved), vec!["Older bus announcement"]);

    let limited = store
        .query(&ArticleQuery {
            limit: 1,
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn keyword_wildcards_are_literal() {
    let (_tmp, store) = open().await;
    store
        .upsert(&article("pct", "Rates rise by 5% this year"))
        .await
        .unwrap();
    store
        .upsert(&article("plain", "Rates rise by 5 points"))
        .await
        .unwrap();

    let rows = store
        .query(&ArticleQuery {
            keyword: Some("5%".to_string()),
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["Rates rise by 5% this year"]);
}

#[tokio::test]
async fn toggle_saved_flips_and_reports() {
    let (_tmp, store) = open().await;
    let (id, _, _) = seed(&store).await;

    assert!(store.toggle_saved(id).await.unwrap());
    assert!(!store.toggle_saved(id).await.unwrap());
    assert!(matches!(
        store.toggle_saved(9999).await,
        Err(StoreError::NotFound(9999))
    ));
}

#[tokio::test]
async fn update_field_accepts_only_reader_fields() {
    let (_tmp, store) = open().await;
    let (id, _, _) = seed(&store).await;

    store
        .update_field(id, "translation", "Cyhoeddiad bws", Some("Welsh"))
        .await
        .unwrap();
    store
        .update_field(id, "summary_feedback", "useful", None)
        .await
        .unwrap();
    let a = store.get(id).await.unwrap();
    assert_eq!(a.translation.as_deref(), Some("Cyhoeddiad bws"));
    assert_eq!(a.translation_lang.as_deref(), Some("Welsh"));
    assert_eq!(a.summary_feedback.as_deref(), Some("useful"));

    // A translation written without a language drops the old label.
    store
        .update_field(id, "translation", "Annonce de bus", None)
        .await
        .unwrap();
    let a = store.get(id).await.unwrap();
    assert_eq!(a.translation.as_deref(), Some("Annonce de bus"));
    assert_eq!(a.translation_lang, None);

    let err = store
        .update_field(id, "title", "Hijacked", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidField(ref f) if f == "title"));
    assert_eq!(store.get(id).await.unwrap().title, "Older bus announcement");

    assert!(matches!(
        store.update_field(9999, "notes", "x", None).await,
        Err(StoreError::NotFound(9999))
    ));
}

#[tokio::test]
async fn distinct_values_split_and_dedupe() {
    let (_tmp, store) = open().await;
    seed(&store).await;

    let mut topics = store.distinct_values("topics").await.unwrap();
    topics.sort();
    assert_eq!(
        topics,
        vec![
            "Education and skills",
            "Housing",
            "Public sector",
            "Transport"
        ]
    );

    let orgs = store.distinct_values("organisations").await.unwrap();
    assert_eq!(orgs.len(), 2);
    assert!(orgs.contains(&"Senedd Cymru".to_string()));

    assert!(matches!(
        store.distinct_values("title").await,
        Err(StoreError::InvalidColumn(_))
    ));
}

#[tokio::test]
async fn get_missing_article_is_not_found() {
    let (_tmp, store) = open().await;
    assert!(matches!(store.get(42).await, Err(StoreError::NotFound(42))));
}
