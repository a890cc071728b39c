//! Typed errors for the ingestion pipeline and the article store.
//!
//! Library-level failures are strongly typed so callers can decide between
//! skip-and-continue (network trouble on one link) and hard failure (a bad
//! field name, a missing database). Application glue wraps these in
//! `anyhow::Error`.

use thiserror::Error;

/// A fetch that did not produce a usable response.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request exceeded the configured timeout.
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// DNS, TLS, or socket-level failure.
    #[error("connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The response started but the body could not be read.
    #[error("failed reading body of {url}: {message}")]
    Body { url: String, message: String },

    /// The fetch strategy itself could not be initialised (e.g. no browser).
    #[error("fetcher unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Short machine-friendly cause, used in `request_failed:<cause>` reasons.
    pub fn cause(&self) -> String {
        match self {
            FetchError::Timeout { .. } => "timeout".to_string(),
            FetchError::Connect { message, .. } => format!("connect: {}", message),
            FetchError::Status { status, .. } => format!("status {}", status),
            FetchError::Body { message, .. } => format!("body: {}", message),
            FetchError::Unavailable(message) => format!("unavailable: {}", message),
        }
    }
}

/// Failure of the link collection step as a whole.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Every listing page of every category failed to load.
    #[error("all {attempted} listing pages were unreachable")]
    AllListingsFailed { attempted: usize },
}

/// Errors raised by [`crate::store::ArticleStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `update_field` was asked to write a column it does not own.
    #[error("invalid field: '{0}' (allowed: summary, context, translation, notes, summary_feedback)")]
    InvalidField(String),

    /// `distinct_values` was asked for a column other than topics/organisations.
    #[error("invalid column: '{0}' (allowed: topics, organisations)")]
    InvalidColumn(String),

    #[error("article not found: {0}")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Startup configuration problems. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// No `[db].path` in the file and no `PRESSPAPER_DB_PATH` in the environment.
    #[error("no database configured: set [db].path or PRESSPAPER_DB_PATH")]
    MissingDatabase,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_cause_is_compact() {
        let err = FetchError::Status {
            url: "https://example.org/a".to_string(),
            status: 503,
        };
        assert_eq!(err.cause(), "status 503");
        assert_eq!(
            FetchError::Timeout {
                url: "x".to_string()
            }
            .cause(),
            "timeout"
        );
    }

    #[test]
    fn invalid_field_message_names_the_field() {
        let err = StoreError::InvalidField("title".to_string());
        assert!(err.to_string().contains("'title'"));
    }
}
