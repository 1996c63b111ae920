//! Policy document retrieval and HTML-to-text extraction.
//!
//! The pipeline only ever sees plain text: the fetcher downloads the policy
//! page and scrubs markup, navigation, and scripting before handing the
//! document to the fingerprinter and chunker. Output contract: plain text
//! with paragraphs separated by blank lines.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

/// Errors from policy retrieval. Terminal for the current request.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {status} fetching policy")]
    Status { status: u16 },
}

/// Retrieves a policy document as normalized plain text.
#[async_trait]
pub trait PolicyFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Per-request timeout.
    pub timeout: Duration,

    /// User-Agent header; some policy pages refuse requests without one.
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
        }
    }
}

/// HTTP policy fetcher backed by reqwest.
pub struct HttpFetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { config, client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(FetcherConfig::default())
    }
}

#[async_trait]
impl PolicyFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.config.timeout)
                } else {
                    FetchError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        tracing::debug!(url, bytes = html.len(), "fetched policy document");

        Ok(extract_text(&html))
    }
}

lazy_static! {
    /// Comments go first so commented-out markup never reaches later passes.
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("invalid regex");

    /// Whole subtrees with no text content worth classifying.
    static ref DROP_SUBTREES: Regex = Regex::new(
        r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<nav\b.*?</nav\s*>|<header\b.*?</header\s*>|<footer\b.*?</footer\s*>|<head\b.*?</head\s*>"
    )
    .expect("invalid regex");

    /// Block-level boundaries become paragraph breaks.
    static ref BLOCK_BREAK: Regex = Regex::new(
        r"(?i)</(?:p|div|section|article|li|ul|ol|tr|table|blockquote|h[1-6])\s*>|<br\s*/?>"
    )
    .expect("invalid regex");

    static ref ANY_TAG: Regex = Regex::new(r"<[^>]*>").expect("invalid regex");

    static ref HORIZONTAL_WS: Regex = Regex::new(r"[ \t\r\x0b\x0c]+").expect("invalid regex");

    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").expect("invalid regex");
}

/// Scrub HTML down to classification-ready plain text.
///
/// Pure function: drops script/style/nav/header/footer/head subtrees and
/// comments, turns block boundaries into paragraph breaks, strips remaining
/// tags, decodes common entities, and normalizes whitespace while keeping
/// blank-line paragraph separation.
pub fn extract_text(html: &str) -> String {
    let text = COMMENT.replace_all(html, " ");
    let text = DROP_SUBTREES.replace_all(&text, " ");
    let text = BLOCK_BREAK.replace_all(&text, "\n\n");
    let text = ANY_TAG.replace_all(&text, " ");

    let text = decode_entities(&text);

    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");

    text.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}
