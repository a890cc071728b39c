//! Core data models used throughout PressPaper.
//!
//! These types represent the links, extraction results, and stored articles
//! that flow through the collect → extract → classify → persist pipeline.

use serde::Serialize;
use std::fmt;

/// A candidate article link discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCandidate {
    pub category: String,
    pub title: String,
    /// Absolute URL.
    pub url: String,
}

/// Metadata pulled from a document alongside its text.
///
/// Fields stay `None` unless the document states them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractMetadata {
    pub published: Option<String>,
    pub organisation: Option<String>,
    pub topics: Option<String>,
    pub doc_type: Option<String>,
    pub status: Option<String>,
    pub image_url: Option<String>,
}

/// Why an extraction was flagged as junk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JunkReason {
    /// The fetch failed; carries the short cause.
    RequestFailed(String),
    /// PDF parsed but produced no text.
    PdfEmpty,
    /// PDF parser rejected the document.
    PdfFailed,
    /// PDF seen while the PDF policy is `skip`.
    PdfSkipped,
    /// HTML below the lenient size floor with no qualifying heading.
    TooSmall,
    /// HTML below the strict size floor.
    HtmlEmptyOrTooSmall,
}

impl JunkReason {
    /// Reasons that always end in a skip, regardless of any leftover text.
    pub fn is_hard(&self) -> bool {
        !matches!(self, JunkReason::RequestFailed(_))
    }
}

impl fmt::Display for JunkReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JunkReason::RequestFailed(cause) => write!(f, "request_failed:{}", cause),
            JunkReason::PdfEmpty => write!(f, "pdf_empty"),
            JunkReason::PdfFailed => write!(f, "pdf_failed"),
            JunkReason::PdfSkipped => write!(f, "pdf_skipped"),
            JunkReason::TooSmall => write!(f, "too_small"),
            JunkReason::HtmlEmptyOrTooSmall => write!(f, "html_empty_or_too_small"),
        }
    }
}

/// Output of the content extractor for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    pub metadata: ExtractMetadata,
    pub is_pdf: bool,
    pub junk_reason: Option<JunkReason>,
}

impl ExtractionResult {
    pub fn kept(text: String, metadata: ExtractMetadata, is_pdf: bool) -> Self {
        Self {
            text,
            metadata,
            is_pdf,
            junk_reason: None,
        }
    }

    pub fn junk(text: String, metadata: ExtractMetadata, is_pdf: bool, reason: JunkReason) -> Self {
        Self {
            text,
            metadata,
            is_pdf,
            junk_reason: Some(reason),
        }
    }

    pub fn is_junk(&self) -> bool {
        self.junk_reason.is_some()
    }
}

/// Pipeline-owned fields of an article, written on every ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub url: String,
    pub category: String,
    pub title: String,
    pub published: Option<String>,
    pub doc_type: Option<String>,
    /// Comma-joined topic labels.
    pub topics: Option<String>,
    pub organisations: Option<String>,
    pub status: Option<String>,
    pub image_url: Option<String>,
    pub raw_text: String,
    pub is_pdf: bool,
}

/// A persisted article: pipeline content plus reader/AI-owned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub category: String,
    pub title: String,
    pub published: Option<String>,
    pub doc_type: Option<String>,
    pub topics: Option<String>,
    pub organisations: Option<String>,
    pub status: Option<String>,
    pub image_url: Option<String>,
    pub raw_text: String,
    pub is_pdf: bool,
    pub summary: Option<String>,
    pub context: Option<String>,
    pub translation: Option<String>,
    pub translation_lang: Option<String>,
    pub saved: bool,
    pub notes: Option<String>,
    pub summary_feedback: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

/// Counters reported by one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub kept: u64,
    pub skipped: u64,
    pub total_links: u64,
}
