use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::types::MAX_CONTENT_CHARS;

pub const SESSION_UNAVAILABLE: &str =
    "Browsing session not available - content extraction skipped";
pub const NO_CONTENT: &str = "Content could not be extracted";

const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(15);
const SETTLE_DELAY: Duration = Duration::from_secs(2);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
/// Render width for HTML; whitespace is collapsed afterwards, so this only
/// needs to be wide enough to avoid hyphenation.
const RENDER_WIDTH: usize = 10_000;

/// Page text for a URL. Never fails: errors come back as descriptive text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> String;
}

/// The one browsing session of a run. Released when dropped.
struct BrowserSession {
    client: reqwest::Client,
}

impl BrowserSession {
    fn open(page_load_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(page_load_timeout)
            .build()
            .context("Failed to create browsing session")?;
        Ok(Self { client })
    }

    /// Load a page, returning its content type and raw body.
    async fn navigate(&self, url: &str) -> Result<(String, Vec<u8>)> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("navigation failed")?
            .error_for_status()
            .context("page returned an error status")?;

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp.bytes().await.context("failed to read page body")?;
        Ok((content_type, body.to_vec()))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("Browsing session released");
    }
}

/// Fetches visible page text through a single, exclusively-owned session.
pub struct ContentFetcher {
    session: Option<BrowserSession>,
    clock: Arc<dyn Clock>,
    page_load_timeout: Duration,
    settle_delay: Duration,
}

impl ContentFetcher {
    /// Open the browsing session. If that fails the fetcher still works, but
    /// every fetch returns [`SESSION_UNAVAILABLE`].
    pub fn open(clock: Arc<dyn Clock>) -> Self {
        Self::with_timeouts(clock, PAGE_LOAD_TIMEOUT, SETTLE_DELAY)
    }

    pub fn with_timeouts(
        clock: Arc<dyn Clock>,
        page_load_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        let session = match BrowserSession::open(page_load_timeout) {
            Ok(session) => {
                info!("Browsing session initialized");
                Some(session)
            }
            Err(e) => {
                warn!("Could not initialize browsing session: {:#}", e);
                warn!("Content extraction will be skipped");
                None
            }
        };
        Self {
            session,
            clock,
            page_load_timeout,
            settle_delay,
        }
    }

    /// A fetcher with no session at all.
    pub fn unavailable(clock: Arc<dyn Clock>) -> Self {
        Self {
            session: None,
            clock,
            page_load_timeout: PAGE_LOAD_TIMEOUT,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Release the session now rather than at drop.
    pub fn close(mut self) {
        if self.session.take().is_some() {
            info!("Browsing session closed");
        }
    }

    async fn extract(&self, session: &BrowserSession, url: &str) -> Result<String> {
        let (content_type, body) =
            tokio::time::timeout(self.page_load_timeout, session.navigate(url))
                .await
                .with_context(|| {
                    format!(
                        "page load timed out after {}s",
                        self.page_load_timeout.as_secs_f64()
                    )
                })??;

        self.clock.sleep(self.settle_delay).await;

        Ok(render_text(&content_type, &body))
    }
}

#[async_trait]
impl PageFetcher for ContentFetcher {
    async fn fetch(&self, url: &str) -> String {
        let Some(session) = &self.session else {
            return SESSION_UNAVAILABLE.to_string();
        };

        match self.extract(session, url).await {
            Ok(text) => {
                let content = normalize_text(&text);
                if content.is_empty() {
                    NO_CONTENT.to_string()
                } else {
                    content
                }
            }
            Err(e) => {
                warn!(url, "Content extraction failed: {:#}", e);
                let detail: String = format!("{:#}", e).chars().take(100).collect();
                format!("Error extracting content: {}", detail)
            }
        }
    }
}

/// Convert a page body to text: HTML is rendered, anything else is taken as-is.
fn render_text(content_type: &str, body: &[u8]) -> String {
    let looks_like_html = content_type.contains("html")
        || (content_type.is_empty()
            && String::from_utf8_lossy(&body[..body.len().min(512)])
                .to_ascii_lowercase()
                .contains("<html"));
    if looks_like_html {
        html2text::from_read(body, RENDER_WIDTH)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).to_string())
    } else {
        String::from_utf8_lossy(body).to_string()
    }
}

/// Collapse all whitespace runs to single spaces and cap the length at
/// [`MAX_CONTENT_CHARS`] characters.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_CONTENT_CHARS)
        .collect()
}
