//! Link discovery across paginated category listings.
//!
//! For every configured category the collector requests
//! `{base_url}{path}?page=N` for `N in 0..max_pages_each`, pulls every anchor
//! out of the page's `<main>` region, filters navigation and boilerplate, and
//! returns the survivors deduplicated by absolute URL (first occurrence wins).
//!
//! A listing page that fails to load is logged and skipped. Only when every
//! single listing request fails does collection report an error.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{CategoryConfig, SourceConfig};
use crate::error::CollectError;
use crate::fetch::Fetcher;
use crate::html::{primary_region, visible_text};
use crate::models::LinkCandidate;

/// Path fragments that mark site furniture rather than publications.
pub const JUNK_URL_BITS: &[&str] = &[
    "/rss",
    "/cookies",
    "/privacy",
    "/terms",
    "/accessibility",
    "/sitemap",
    "/search",
    "/newsletter",
    "/node/",
];

const JUNK_TITLE_PATTERNS: &[&str] = &[
    r"^home$",
    r"^rss$",
    r"^newsletter.*",
    r"sign up",
    r"subscribe",
    r"clear filters",
    r"skip to",
    r"previous page",
    r"next page",
    r"^page\s*\d+$",
    r"^\d+$",
    r"report anything wrong",
    r"share this page",
    r"share on (facebook|twitter|x|linkedin|whatsapp)",
    r"about consultations",
    r"about statistics and research",
    r"how we use your data",
    r"terms and conditions",
    r"accessibility",
    r"^view all",
];

static JUNK_TITLES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    JUNK_TITLE_PATTERNS
        .iter()
        .map(|pat| (*pat, Regex::new(pat).expect("valid junk title pattern")))
        .collect()
});

static ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Why a link looks like navigation or boilerplate, if it does.
///
/// Returns `url:<fragment>` or `title:<pattern>`; `None` for real content.
pub fn looks_like_junk(title: &str, url: &str) -> Option<String> {
    let t = title.trim().to_lowercase();
    let u = url.trim().to_lowercase();

    if let Some(bit) = JUNK_URL_BITS.iter().find(|bit| u.contains(*bit)) {
        return Some(format!("url:{}", bit));
    }

    JUNK_TITLES
        .iter()
        .find(|(_, re)| re.is_match(&t))
        .map(|(pat, _)| format!("title:{}", pat))
}

/// Resolve an anchor href against the site origin.
///
/// Accepts root-relative paths and absolute URLs on the same origin.
/// Fragments are dropped so `/a#top` and `/a` collapse to one link.
fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let root_relative = href.starts_with('/') && !href.starts_with("//");
    let mut resolved = if root_relative {
        base.join(href).ok()?
    } else {
        let absolute = Url::parse(href).ok()?;
        if absolute.origin() != base.origin() {
            return None;
        }
        absolute
    };
    resolved.set_fragment(None);
    Some(resolved)
}

/// True when `url` points back at the category listing (pagination, tabs).
fn is_listing_link(url: &Url, category: &CategoryConfig) -> bool {
    url.path().trim_end_matches('/') == category.path.trim_end_matches('/')
}

/// Extract candidate links from one listing page.
pub fn parse_listing(
    html: &str,
    base: &Url,
    category: &CategoryConfig,
    min_title_chars: usize,
) -> Vec<LinkCandidate> {
    let document = Html::parse_document(html);
    let region = primary_region(&document);

    let mut out = Vec::new();
    for anchor in region.select(&ANCHORS) {
        let href = anchor.value().attr("href").unwrap_or_default();
        let title = visible_text(anchor);
        if href.trim().is_empty() || title.is_empty() {
            continue;
        }
        if title.chars().count() < min_title_chars {
            continue;
        }

        let Some(url) = resolve_href(base, href) else {
            continue;
        };
        if is_listing_link(&url, category) {
            continue;
        }

        let url = url.to_string();
        if let Some(reason) = looks_like_junk(&title, &url) {
            debug!(%url, %reason, "Dropping junk link");
            continue;
        }

        out.push(LinkCandidate {
            category: category.name.clone(),
            title,
            url,
        });
    }
    out
}

/// Deduplicate by URL, keeping the first occurrence and its order.
pub fn dedup_links(links: Vec<LinkCandidate>) -> Vec<LinkCandidate> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

fn listing_url(base: &Url, category: &CategoryConfig, page: u32) -> String {
    format!(
        "{}{}?page={}",
        base.as_str().trim_end_matches('/'),
        category.path,
        page
    )
}

/// Walk every category listing and return deduplicated candidates.
#[instrument(level = "info", skip_all, fields(fetcher = fetcher.name(), max_pages_each))]
pub async fn collect_links(
    fetcher: &dyn Fetcher,
    source: &SourceConfig,
    min_title_chars: usize,
    max_pages_each: u32,
) -> Result<Vec<LinkCandidate>, CollectError> {
    // Config validation guarantees an absolute base URL.
    let base = match Url::parse(&source.base_url) {
        Ok(base) => base,
        Err(_) => return Err(CollectError::AllListingsFailed { attempted: 0 }),
    };
    let delay = Duration::from_millis(source.page_delay_ms);

    let mut all = Vec::new();
    let mut attempted = 0usize;
    let mut failed = 0usize;

    for category in &source.categories {
        for page in 0..max_pages_each {
            if attempted > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempted += 1;

            let url = listing_url(&base, category, page);
            debug!(%url, category = %category.name, "Fetching listing page");

            match fetcher.fetch(&url).await {
                Ok(listing) => {
                    let links = parse_listing(&listing.text(), &base, category, min_title_chars);
                    debug!(%url, count = links.len(), "Parsed listing page");
                    all.extend(links);
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, %url, "Listing page failed; continuing");
                }
            }
        }
    }

    if attempted > 0 && failed == attempted {
        return Err(CollectError::AllListingsFailed { attempted });
    }

    let unique = dedup_links(all);
    info!(
        links = unique.len(),
        pages = attempted,
        failed_pages = failed,
        "Collected candidate links"
    );
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.gov.wales").unwrap()
    }

    fn announcements() -> CategoryConfig {
        CategoryConfig::new("Announcements", "/announcements")
    }

    const LISTING: &str = r##"
<html><body>
<header><a href="/">Home</a></header>
<main>
  <a href="#main-content">Skip to main content</a>
  <a href="/new-funding-for-rural-bus-services">New funding for rural bus services</a>
  <a href="/rss/announcements">RSS feed for announcements</a>
  <a href="/announcements?page=1">Next page of announcements</a>
  <a href="https://www.gov.wales/written-statement-school-budgets">Written statement: school budgets</a>
  <a href="https://twitter.com/share?u=x">Share this page on Twitter</a>
  <a href="/short">Short</a>
  <a href="/newsletter-sign-up">Sign up to our newsletter today</a>
  <a href="/view-all">View all announcements here</a>
  <a href="/cookies">Cookies on this website</a>
  <a href=""> Empty href link text </a>
  <a href="/image-only"><img src="x.png"></a>
</main>
</body></html>
"##;

    #[test]
    fn parse_listing_keeps_only_content_links() {
        let links = parse_listing(LISTING, &base(), &announcements(), 12);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.gov.wales/new-funding-for-rural-bus-services",
                "https://www.gov.wales/written-statement-school-budgets",
            ]
        );
        assert!(links.iter().all(|l| l.category == "Announcements"));
        assert_eq!(links[0].title, "New funding for rural bus services");
    }

    #[test]
    fn looks_like_junk_reports_the_rule() {
        assert_eq!(
            looks_like_junk("Anything at all here", "https://x.org/privacy-notice"),
            Some("url:/privacy".to_string())
        );
        assert_eq!(
            looks_like_junk("Page 3", "https://x.org/a"),
            Some(r"title:^page\s*\d+$".to_string())
        );
        assert_eq!(
            looks_like_junk("View all consultations", "https://x.org/a"),
            Some("title:^view all".to_string())
        );
        assert_eq!(looks_like_junk("Budget 2025 published", "https://x.org/budget"), None);
    }

    #[test]
    fn resolve_href_rejects_foreign_and_relative_links() {
        let b = base();
        assert!(resolve_href(&b, "/a").is_some());
        assert!(resolve_href(&b, "https://www.gov.wales/b#frag")
            .map(|u| u.fragment().is_none())
            .unwrap());
        assert!(resolve_href(&b, "https://example.org/a").is_none());
        assert!(resolve_href(&b, "//example.org/a").is_none());
        assert!(resolve_href(&b, "relative/path").is_none());
        assert!(resolve_href(&b, "mailto:someone@gov.wales").is_none());
    }

    #[test]
    fn dedup_keeps_first_title() {
        let link = |title: &str, url: &str| LinkCandidate {
            category: "Publications".to_string(),
            title: title.to_string(),
            url: url.to_string(),
        };
        let deduped = dedup_links(vec![
            link("First title wins", "https://x.org/a"),
            link("Another article", "https://x.org/b"),
            link("Second title loses", "https://x.org/a"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "First title wins");
        assert_eq!(deduped[1].url, "https://x.org/b");
    }

    #[test]
    fn listing_url_appends_page_offset() {
        let url = listing_url(&base(), &announcements(), 0);
        assert_eq!(url, "https://www.gov.wales/announcements?page=0");
    }
}
