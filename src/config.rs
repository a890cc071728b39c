//! TOML configuration parsing and validation.
//!
//! Every section is optional and falls back to defaults that target
//! gov.wales, except the database location, which must come from either
//! `[db].path` or the `PRESSPAPER_DB_PATH` environment variable.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const ENV_DB_PATH: &str = "PRESSPAPER_DB_PATH";
pub const ENV_INTERVAL_MINUTES: &str = "INGEST_INTERVAL_MINUTES";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DbConfig {
    pub path: Option<PathBuf>,
}

/// One listing category: display name plus listing path under `base_url`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    pub name: String,
    pub path: String,
}

impl CategoryConfig {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
        }
    }
}

/// Which [`crate::fetch::Fetcher`] strategy to construct.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Http,
    Browser,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages_each: u32,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default)]
    pub fetcher: FetcherKind,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_fetch_timeout(),
            max_pages_each: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            fetcher: FetcherKind::default(),
            categories: default_categories(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.gov.wales".to_string()
}
fn default_user_agent() -> String {
    "PressPaper/1.0 (+contact: presspaper)".to_string()
}
fn default_fetch_timeout() -> u64 {
    25
}
fn default_max_pages() -> u32 {
    2
}
fn default_page_delay_ms() -> u64 {
    200
}
fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new("Announcements", "/announcements"),
        CategoryConfig::new("Consultations", "/consultations"),
        CategoryConfig::new("Publications", "/publications"),
        CategoryConfig::new("Statistics and Research", "/statistics-and-research"),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectConfig {
    #[serde(default = "default_min_title_chars")]
    pub min_title_chars: usize,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            min_title_chars: default_min_title_chars(),
        }
    }
}

fn default_min_title_chars() -> usize {
    12
}

/// Junk-threshold profile for the HTML extractor.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Short pages survive when they carry a real `<h1>`.
    #[default]
    Lenient,
    /// Higher size floor and no heading carve-out.
    Strict,
}

/// What to do with documents served as PDF.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PdfPolicy {
    #[default]
    Parse,
    Skip,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default)]
    pub strictness: Strictness,
    #[serde(default)]
    pub pdf_policy: PdfPolicy,
    #[serde(default = "default_organisation")]
    pub default_organisation: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            pdf_policy: PdfPolicy::default(),
            default_organisation: default_organisation(),
        }
    }
}

fn default_organisation() -> String {
    "Welsh Government".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_topics: default_max_topics(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_max_topics() -> usize {
    3
}
fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_schedule_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: default_schedule_enabled(),
            interval_minutes: default_interval_minutes(),
        }
    }
}

fn default_schedule_enabled() -> bool {
    true
}
fn default_interval_minutes() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_url")]
    pub url: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_ai_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            model: default_ai_model(),
            url: default_ai_url(),
            timeout_secs: default_ai_timeout(),
            max_retries: default_ai_retries(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_ai_provider() -> String {
    "disabled".to_string()
}
fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_ai_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_ai_timeout() -> u64 {
    60
}
fn default_ai_retries() -> u32 {
    3
}
fn default_max_input_chars() -> usize {
    9000
}

impl Config {
    /// Database file location. Only `None` before validation.
    pub fn db_path(&self) -> Result<&Path, ConfigError> {
        self.db
            .path
            .as_deref()
            .ok_or(ConfigError::MissingDatabase)
    }

    /// Parse and validate a config document, applying overrides from `env`.
    ///
    /// `env` is injected so tests do not have to mutate process state.
    pub fn from_toml_str<F>(content: &str, env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = toml::from_str(content)?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = env(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            self.db.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = env(ENV_INTERVAL_MINUTES) {
            let minutes = raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a whole number of minutes, got '{}'",
                    ENV_INTERVAL_MINUTES, raw
                ))
            })?;
            self.schedule.interval_minutes = minutes;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.db_path()?;

        if url::Url::parse(&self.source.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "source.base_url is not an absolute URL: {}",
                self.source.base_url
            )));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "source.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.source.categories.is_empty() {
            return Err(ConfigError::Invalid(
                "source.categories must not be empty".to_string(),
            ));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.concurrency must be >= 1".to_string(),
            ));
        }
        if self.schedule.interval_minutes == 0 {
            return Err(ConfigError::Invalid(
                "schedule.interval_minutes must be >= 1".to_string(),
            ));
        }

        match self.ai.provider.as_str() {
            "disabled" | "openai" | "extractive" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown ai provider: '{}'. Must be disabled, openai, or extractive.",
                    other
                )))
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    Config::from_toml_str(&content, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn minimal_config_gets_gov_wales_defaults() {
        let config = Config::from_toml_str("[db]\npath = \"/tmp/p.sqlite\"\n", no_env).unwrap();
        assert_eq!(config.source.base_url, "https://www.gov.wales");
        assert_eq!(config.source.categories.len(), 4);
        assert_eq!(config.source.categories[3].path, "/statistics-and-research");
        assert_eq!(config.schedule.interval_minutes, 15);
        assert_eq!(config.pipeline.max_topics, 3);
        assert_eq!(config.extract.strictness, Strictness::Lenient);
        assert_eq!(config.extract.pdf_policy, PdfPolicy::Parse);
    }

    #[test]
    fn missing_database_is_fatal() {
        let err = Config::from_toml_str("", no_env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabase));
    }

    #[test]
    fn env_supplies_database_and_interval() {
        let env = |key: &str| match key {
            ENV_DB_PATH => Some("/var/lib/presspaper.sqlite".to_string()),
            ENV_INTERVAL_MINUTES => Some("5".to_string()),
            _ => None,
        };
        let config = Config::from_toml_str("", env).unwrap();
        assert_eq!(
            config.db_path().unwrap(),
            Path::new("/var/lib/presspaper.sqlite")
        );
        assert_eq!(config.schedule.interval_minutes, 5);
    }

    #[test]
    fn bad_interval_env_is_rejected() {
        let env = |key: &str| match key {
            ENV_DB_PATH => Some("/tmp/x.sqlite".to_string()),
            ENV_INTERVAL_MINUTES => Some("soon".to_string()),
            _ => None,
        };
        let err = Config::from_toml_str("", env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn strict_mode_and_pdf_skip_parse() {
        let config = Config::from_toml_str(
            r#"
[db]
path = "/tmp/p.sqlite"

[extract]
strictness = "strict"
pdf_policy = "skip"

[source]
fetcher = "browser"
categories = [{ name = "News", path = "/news" }]
"#,
            no_env,
        )
        .unwrap();
        assert_eq!(config.extract.strictness, Strictness::Strict);
        assert_eq!(config.extract.pdf_policy, PdfPolicy::Skip);
        assert_eq!(config.source.fetcher, FetcherKind::Browser);
        assert_eq!(config.source.categories, vec![CategoryConfig::new("News", "/news")]);
    }

    #[test]
    fn unknown_ai_provider_is_rejected() {
        let err = Config::from_toml_str(
            "[db]\npath = \"/tmp/p.sqlite\"\n[ai]\nprovider = \"magic\"\n",
            no_env,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown ai provider"));
    }
}
