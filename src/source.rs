//! Template sources — where fragment markup comes from.
//!
//! The controller only needs `retrieve(path) -> body | failure`. A source
//! reports exactly one outcome per call and does not retry; the controller
//! surfaces failures verbatim.

#[cfg(test)]
#[path = "source_test.rs"]
mod source_test;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::SourceConfig;

// =============================================================================
// ERROR
// =============================================================================

/// A failed retrieval. Displays `detail` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct FetchError {
    /// Response body, status text, or transport error text.
    pub detail: String,
    /// HTTP status when the server answered; `None` for transport failures.
    pub status: Option<u16>,
}

impl FetchError {
    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self { detail: detail.into(), status: None }
    }

    #[must_use]
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self { detail: detail.into(), status: Some(status) }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Fragment retrieval. Enables swapping HTTP for in-memory templates in tests.
#[async_trait::async_trait]
pub trait TemplateSource: Send + Sync {
    /// Fetch the markup stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] carrying the failure detail when the
    /// template cannot be retrieved.
    async fn retrieve(&self, path: &str) -> Result<String, FetchError>;
}

// =============================================================================
// HTTP
// =============================================================================

pub struct HttpSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// # Errors
    ///
    /// Returns a transport [`FetchError`] if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| FetchError::transport(format!("HTTP client build failed: {e}")))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    /// # Errors
    ///
    /// See [`HttpSource::new`].
    pub fn from_env() -> Result<Self, FetchError> {
        Self::new(&SourceConfig::from_env())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined onto the base.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if self.base_url.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl TemplateSource for HttpSource {
    async fn retrieve(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "fetching template");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FetchError::transport(e.to_string()))?;
        if !status.is_success() {
            let detail = if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_owned()
            } else {
                body
            };
            return Err(FetchError::status(status.as_u16(), detail));
        }

        tracing::debug!(%url, bytes = body.len(), "template fetched");
        Ok(body)
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// Fixed path → outcome table. Unknown paths fail like an HTTP 404.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: HashMap<String, Result<String, FetchError>>,
    requests: AtomicUsize,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_template(mut self, path: &str, markup: &str) -> Self {
        self.entries.insert(path.to_owned(), Ok(markup.to_owned()));
        self
    }

    #[must_use]
    pub fn with_failure(mut self, path: &str, error: FetchError) -> Self {
        self.entries.insert(path.to_owned(), Err(error));
        self
    }

    /// Number of `retrieve` calls so far.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl TemplateSource for MemorySource {
    async fn retrieve(&self, path: &str) -> Result<String, FetchError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match self.entries.get(path) {
            Some(outcome) => outcome.clone(),
            None => Err(FetchError::status(404, "Not Found")),
        }
    }
}
