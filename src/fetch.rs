//! Linked-content fetching.
//!
//! Each harvested link is fetched with a browser-like header set, gated on
//! status, content type, and size, and reduced to plain text with page
//! chrome stripped. Every failure is captured into a
//! [`LinkFetchResult`]; nothing escapes [`LinkFetcher::fetch`].
//!
//! [`LinkFetcher::fetch_all`] runs up to `fetch.max_links` fetches
//! concurrently and returns one result per link in input order, whatever
//! order they complete in.

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::QuoteError;
use crate::html::html_to_text_without_boilerplate;
use crate::models::LinkFetchResult;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// HTTP client for linked pages. Built once and shared by every request.
pub struct LinkFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl LinkFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        headers.insert(header::DNT, HeaderValue::from_static("1"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetches the first `max_links` links concurrently.
    ///
    /// Results are positionally matched to `links`. One link failing or
    /// timing out has no effect on the others.
    pub async fn fetch_all(&self, links: &[String]) -> Vec<LinkFetchResult> {
        let selected = &links[..links.len().min(self.config.max_links)];
        if selected.is_empty() {
            return Vec::new();
        }

        info!(
            found = links.len(),
            fetching = selected.len(),
            "Found links, fetching content"
        );

        let results = join_all(selected.iter().map(|url| self.fetch(url))).await;

        let fetched = results.iter().filter(|r| r.contributes()).count();
        info!(
            fetched,
            total = links.len(),
            "Fetched linked content"
        );
        results
    }

    /// Fetches one link. Never fails; errors land in the result.
    pub async fn fetch(&self, url: &str) -> LinkFetchResult {
        let limit = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(limit, self.fetch_text(url)).await {
            Ok(Ok(text)) => LinkFetchResult::success(url, text),
            Ok(Err(QuoteError::LinkFetchFailed { url, message })) => {
                LinkFetchResult::failure(url, message)
            }
            Ok(Err(other)) => LinkFetchResult::failure(url, other.to_string()),
            Err(_) => {
                warn!(url, "Request timeout");
                LinkFetchResult::failure(url, self.timeout_message())
            }
        }
    }

    fn timeout_message(&self) -> String {
        format!("Request timed out after {}s", self.config.timeout_secs)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, QuoteError> {
        let fail = |message: String| QuoteError::LinkFetchFailed {
            url: url.to_string(),
            message,
        };

        let mut response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(url, "Request timeout");
                fail(self.timeout_message())
            } else {
                warn!(url, error = %e, "Failed to fetch");
                fail(format!("Network error: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "HTTP error");
            return Err(fail(format!("HTTP error {}", status)));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let is_html = content_type.contains("text/html");
        if !is_html && !content_type.contains("text/plain") {
            info!(url, content_type = %content_type, "Skipping non-text content");
            return Err(fail(format!("Skipped non-text content: {}", content_type)));
        }

        let max = self.config.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > max {
                warn!(url, bytes = len, "Content too large");
                return Err(fail(format!("Content too large: {} bytes", len)));
            }
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                fail(self.timeout_message())
            } else {
                fail(format!("Failed to read body: {}", e))
            }
        })? {
            if body.len() as u64 + chunk.len() as u64 > max {
                warn!(url, limit = max, "Content too large");
                return Err(fail(format!("Content too large: over {} bytes", max)));
            }
            body.extend_from_slice(&chunk);
        }

        let raw = String::from_utf8_lossy(&body);
        let text = if is_html {
            html_to_text_without_boilerplate(&raw)
        } else {
            raw.into_owned()
        };

        let chars = text.trim().chars().count();
        if chars < self.config.min_content_chars {
            info!(url, chars, "Content too short, skipping");
            return Err(fail(format!("Content too short ({} characters)", chars)));
        }

        debug!(url, chars, "Fetched linked content");
        Ok(text)
    }
}
