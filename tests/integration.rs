//! End-to-end tests for the `presspaper` binary.
//!
//! Articles are seeded through the library, then read and edited through
//! the CLI. Nothing here touches the network.

use presspaper::config::Config;
use presspaper::models::ArticleContent;
use presspaper::store::{ArticleStore, SqliteStore};
use presspaper::{db, migrate};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/presspaper.sqlite"

[ai]
provider = "extractive"
"#,
        root.display()
    );

    let config_path = config_dir.join("presspaper.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_presspaper(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_presspaper"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("PRESSPAPER_DB_PATH")
        .env_remove("INGEST_INTERVAL_MINUTES")
        .env_remove("OPENAI_API_KEY")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run presspaper binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Insert one article through the library and return its id.
async fn seed_article(config_path: &Path) -> i64 {
    let content = fs::read_to_string(config_path).unwrap();
    let config = Config::from_toml_str(&content, |_| None).unwrap();
    let pool = db::connect(&config).await.unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    let store = SqliteStore::new(pool.clone());

    store
        .upsert(&ArticleContent {
            url: "https://www.gov.wales/rural-bus-fund".to_string(),
            category: "Announcements".to_string(),
            title: "New rural bus fund opens".to_string(),
            published: Some("2024-05-02".to_string()),
            doc_type: None,
            topics: Some("Transport, Public sector".to_string()),
            organisations: Some("Welsh Government".to_string()),
            status: None,
            image_url: None,
            raw_text: "A fund for rural bus routes opens today.".to_string(),
            is_pdf: false,
        })
        .await
        .unwrap();

    let id: i64 = sqlx::query_scalar("SELECT id FROM articles LIMIT 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    pool.close().await;
    id
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_presspaper(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_presspaper(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_presspaper(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_database_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("presspaper.toml");
    fs::write(&config_path, "[schedule]\ninterval_minutes = 5\n").unwrap();

    let (_, stderr, success) = run_presspaper(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("no database configured"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_list_and_get() {
    let (_tmp, config_path) = setup_test_env();
    let id = seed_article(&config_path).await;

    let (stdout, stderr, success) =
        run_presspaper(&config_path, &["list", "--topic", "transport"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("New rural bus fund opens"));
    assert!(stdout.contains("1 article(s)"));

    let (stdout, _, _) = run_presspaper(&config_path, &["list", "--topic", "housing"]);
    assert!(stdout.contains("No articles."));

    let (stdout, _, success) = run_presspaper(&config_path, &["get", &id.to_string()]);
    assert!(success);
    assert!(stdout.contains("url:           https://www.gov.wales/rural-bus-fund"));
    assert!(stdout.contains("A fund for rural bus routes opens today."));
}

#[tokio::test]
async fn test_save_and_set_fields() {
    let (_tmp, config_path) = setup_test_env();
    let id = seed_article(&config_path).await;
    let id = id.to_string();

    let (stdout, _, success) = run_presspaper(&config_path, &["save", &id]);
    assert!(success);
    assert!(stdout.contains("saved: true"));

    let (stdout, _, success) =
        run_presspaper(&config_path, &["set", &id, "notes", "keep an eye on this"]);
    assert!(success);
    assert!(stdout.contains("ok"));

    let (_, stderr, success) = run_presspaper(&config_path, &["set", &id, "title", "nope"]);
    assert!(!success);
    assert!(stderr.contains("invalid field"), "stderr: {}", stderr);

    let (stdout, _, _) = run_presspaper(&config_path, &["list", "--saved"]);
    assert!(stdout.contains("New rural bus fund opens"));

    let (stdout, _, _) = run_presspaper(&config_path, &["get", &id]);
    assert!(stdout.contains("keep an eye on this"));
}

#[tokio::test]
async fn test_distinct_topics() {
    let (_tmp, config_path) = setup_test_env();
    seed_article(&config_path).await;

    let (stdout, _, success) = run_presspaper(&config_path, &["distinct", "topics"]);
    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["Transport", "Public sector"]);
}

#[tokio::test]
async fn test_summary_and_context_are_persisted() {
    let (_tmp, config_path) = setup_test_env();
    let id = seed_article(&config_path).await.to_string();

    // Short text comes back unchanged from the extractive provider.
    let (stdout, stderr, success) = run_presspaper(&config_path, &["summarize", &id]);
    assert!(success, "summarize failed: {}", stderr);
    assert!(stdout.contains("A fund for rural bus routes opens today."));

    let (stdout, _, success) = run_presspaper(&config_path, &["context", &id]);
    assert!(success);
    assert!(stdout.contains("**Topics:** Transport, Public sector"));

    let (stdout, _, success) =
        run_presspaper(&config_path, &["translate", &id, "--lang", "Welsh"]);
    assert!(success);
    assert!(stdout.contains("Translation unavailable"));

    let (stdout, _, _) = run_presspaper(&config_path, &["get", &id]);
    assert!(stdout.contains("--- Summary ---"));
    assert!(stdout.contains("--- Context ---"));
    assert!(stdout.contains("--- Translation (Welsh) ---"));
}
