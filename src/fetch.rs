//! Page fetching strategies.
//!
//! The pipeline only depends on the [`Fetcher`] trait. Two strategies exist:
//!
//! | Strategy | When | Module item |
//! |----------|------|-------------|
//! | Plain HTTP | listing pages render server-side (default) | [`HttpFetcher`] |
//! | Headless Chromium | links only appear after scripts run | `BrowserFetcher` (feature `browser`) |
//!
//! The strategy is picked once at construction by [`create_fetcher`]. Neither
//! strategy retries; a failed fetch is reported to the caller as a
//! [`FetchError`] and the caller decides whether it is a skip or an abort.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, FetcherKind, SourceConfig};
use crate::error::FetchError;

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    /// Raw `Content-Type` header, lower-cased.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Retrieves a URL and returns its bytes, content type and status.
///
/// Implementations must be `Send + Sync`; the pipeline shares one fetcher
/// across concurrently processed links.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short name for logs (`"http"`, `"browser"`, ...).
    fn name(&self) -> &str;

    /// Fetch `url`. Non-2xx responses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Plain HTTP fetcher backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(source: &SourceConfig) -> Result<Self, FetchError> {
        Self::new(&source.user_agent, Duration::from_secs(source.timeout_secs))
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Connect {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Build the fetcher selected by `[source].fetcher`.
pub fn create_fetcher(config: &Config) -> Result<Arc<dyn Fetcher>, FetchError> {
    match config.source.fetcher {
        FetcherKind::Http => Ok(Arc::new(HttpFetcher::from_config(&config.source)?)),
        #[cfg(feature = "browser")]
        FetcherKind::Browser => Ok(Arc::new(browser::BrowserFetcher::from_config(
            &config.source,
        ))),
        #[cfg(not(feature = "browser"))]
        FetcherKind::Browser => Err(FetchError::Unavailable(
            "source.fetcher = \"browser\" requires building with --features browser".to_string(),
        )),
    }
}

#[cfg(feature = "browser")]
pub mod browser {
    //! Headless Chromium fetcher for listings that render links client-side.

    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tracing::{debug, info};

    use super::{FetchedPage, Fetcher};
    use crate::config::SourceConfig;
    use crate::error::FetchError;

    /// Renders pages in a lazily launched headless Chromium.
    ///
    /// The browser is shared; pages are opened one at a time.
    pub struct BrowserFetcher {
        browser: Mutex<Option<Browser>>,
        user_agent: String,
        timeout: Duration,
    }

    impl BrowserFetcher {
        pub fn from_config(source: &SourceConfig) -> Self {
            Self {
                browser: Mutex::new(None),
                user_agent: source.user_agent.clone(),
                timeout: Duration::from_secs(source.timeout_secs),
            }
        }

        async fn launch(&self) -> Result<Browser, FetchError> {
            info!("Launching headless browser");
            let config = BrowserConfig::builder()
                .arg(format!("--user-agent={}", self.user_agent))
                .arg("--no-sandbox")
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .build()
                .map_err(FetchError::Unavailable)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| FetchError::Unavailable(e.to_string()))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        }

        async fn render(browser: &Browser, url: &str) -> Result<String, FetchError> {
            let connect = |e: chromiumoxide::error::CdpError| FetchError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            };
            let page = browser.new_page(url).await.map_err(connect)?;
            page.wait_for_navigation().await.map_err(connect)?;
            let html = page.content().await.map_err(connect)?;
            if let Err(e) = page.close().await {
                debug!(error = %e, %url, "Failed to close browser tab");
            }
            Ok(html)
        }
    }

    #[async_trait]
    impl Fetcher for BrowserFetcher {
        fn name(&self) -> &str {
            "browser"
        }

        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            let mut guard = self.browser.lock().await;
            if guard.is_none() {
                *guard = Some(self.launch().await?);
            }
            let browser = guard
                .as_ref()
                .ok_or_else(|| FetchError::Unavailable("browser did not start".to_string()))?;

            let html = tokio::time::timeout(self.timeout, Self::render(browser, url))
                .await
                .map_err(|_| FetchError::Timeout {
                    url: url.to_string(),
                })??;

            Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: html.into_bytes(),
            })
        }
    }
}
