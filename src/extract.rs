//! Content extraction for fetched documents (HTML and PDF).
//!
//! [`extract`] never fails: network errors, parser failures and thin pages
//! all come back as an [`ExtractionResult`] carrying a [`JunkReason`], and the
//! pipeline decides what to skip.
//!
//! # Junk sizing
//!
//! | Strictness | Min fragment | Min text | Heading carve-out | Reason |
//! |------------|--------------|----------|-------------------|--------|
//! | lenient | 20 | 80 | `<h1>` of 8+ chars keeps the page | `too_small` |
//! | strict | 25 | 250 | none | `html_empty_or_too_small` |

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::{ExtractConfig, PdfPolicy, Strictness};
use crate::fetch::Fetcher;
use crate::html::{clean_text, inside_stripped, primary_region, visible_text};
use crate::models::{ExtractMetadata, ExtractionResult, JunkReason};

pub const MIME_PDF: &str = "application/pdf";

/// Minimum length of the page heading for the lenient carve-out.
const MIN_HEADING_CHARS: usize = 8;

static BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, p, li").expect("valid selector"));
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid selector"));
static TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("valid selector"));
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("valid selector"));

struct Sizing {
    min_fragment: usize,
    min_text: usize,
    heading_carve_out: bool,
    reason: JunkReason,
}

impl Sizing {
    fn for_strictness(strictness: Strictness) -> Self {
        match strictness {
            Strictness::Lenient => Sizing {
                min_fragment: 20,
                min_text: 80,
                heading_carve_out: true,
                reason: JunkReason::TooSmall,
            },
            Strictness::Strict => Sizing {
                min_fragment: 25,
                min_text: 250,
                heading_carve_out: false,
                reason: JunkReason::HtmlEmptyOrTooSmall,
            },
        }
    }
}

/// PDF when the content type says so or, lacking a usable header, the URL
/// path ends in `.pdf`.
pub fn is_pdf_response(content_type: Option<&str>, url: &str) -> bool {
    if content_type.is_some_and(|ct| ct.contains(MIME_PDF)) {
        return true;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// Extract article text and metadata from an HTML document.
pub fn extract_html(html: &str, config: &ExtractConfig) -> ExtractionResult {
    let sizing = Sizing::for_strictness(config.strictness);
    let document = Html::parse_document(html);
    let region = primary_region(&document);

    let fragments: Vec<String> = region
        .select(&BLOCKS)
        .filter(|el| !inside_stripped(*el, region))
        .map(visible_text)
        .filter(|t| t.chars().count() >= sizing.min_fragment)
        .collect();
    let text = fragments.join("\n\n");

    let metadata = ExtractMetadata {
        published: document
            .select(&TIME)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        organisation: Some(config.default_organisation.clone()),
        image_url: document
            .select(&OG_IMAGE)
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        ..Default::default()
    };

    if text.chars().count() >= sizing.min_text {
        return ExtractionResult::kept(text, metadata, false);
    }

    if sizing.heading_carve_out {
        let heading = region
            .select(&H1)
            .filter(|el| !inside_stripped(*el, region))
            .map(visible_text)
            .find(|h| h.chars().count() >= MIN_HEADING_CHARS);
        if let Some(heading) = heading {
            let text = if text.is_empty() { heading } else { text };
            return ExtractionResult::kept(text, metadata, false);
        }
    }

    ExtractionResult::junk(text, metadata, false, sizing.reason)
}

fn pages_to_text(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| clean_text(p))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Extract text from PDF bytes, page by page.
pub fn extract_pdf(bytes: &[u8]) -> ExtractionResult {
    let metadata = ExtractMetadata::default();

    // pdf-extract panics on some malformed inputs; treat that as a parse failure.
    let parsed = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    let pages = match parsed {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            debug!(error = %e, "PDF parse failed");
            return ExtractionResult::junk(String::new(), metadata, true, JunkReason::PdfFailed);
        }
        Err(_) => {
            warn!("PDF parser panicked");
            return ExtractionResult::junk(String::new(), metadata, true, JunkReason::PdfFailed);
        }
    };

    let text = pages_to_text(&pages);
    if text.is_empty() {
        return ExtractionResult::junk(text, metadata, true, JunkReason::PdfEmpty);
    }
    ExtractionResult::kept(text, metadata, true)
}

/// Fetch `url` and extract it. Never returns an error.
pub async fn extract(fetcher: &dyn Fetcher, url: &str, config: &ExtractConfig) -> ExtractionResult {
    let page = match fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => {
            return ExtractionResult::junk(
                String::new(),
                ExtractMetadata::default(),
                false,
                JunkReason::RequestFailed(e.cause()),
            );
        }
    };

    if is_pdf_response(page.content_type.as_deref(), url) {
        return match config.pdf_policy {
            PdfPolicy::Parse => {
                let mut result = extract_pdf(&page.body);
                result.metadata.organisation = Some(config.default_organisation.clone());
                result
            }
            PdfPolicy::Skip => ExtractionResult::junk(
                String::new(),
                ExtractMetadata::default(),
                true,
                JunkReason::PdfSkipped,
            ),
        };
    }

    extract_html(&page.text(), config)
}
