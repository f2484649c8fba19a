//! Pagination driver shared by paging sources.
//!
//! Requests pages starting at 1 until the provider-reported total is
//! covered, pausing between pages to respect provider rate limits. A
//! retryable error repeats the same page after a backoff; any other error
//! abandons the query, yielding whatever was already gathered.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::traits::{AnalyzerError, RawArtifact};

/// One page of provider results plus the provider-reported total count.
#[derive(Debug, Clone)]
pub struct Page {
    pub artifacts: Vec<RawArtifact>,
    /// Total result count across all pages, as reported by the provider.
    pub total: usize,
}

/// A source that exposes its results page by page.
#[async_trait]
pub trait PagedSource: Send + Sync {
    /// Results per page; used to decide when the total is covered.
    fn page_size(&self) -> usize;

    /// Fetch one page. Pages are numbered from 1.
    async fn fetch_page(&self, page: usize) -> Result<Page, AnalyzerError>;
}

/// Drives a [`PagedSource`] to completion.
#[derive(Debug, Clone)]
pub struct Pager {
    /// Pause between consecutive pages.
    interval: Duration,
    /// Backoff before retrying a rate-limited page, unless the provider
    /// names its own retry-after.
    backoff: Duration,
    /// Retry budget per page.
    max_retries: u32,
}

impl Pager {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            backoff: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Collect every page the source will yield.
    ///
    /// Never fails: a fatal provider error (or an exhausted retry budget)
    /// ends collection with the artifacts gathered so far.
    pub async fn collect<S: PagedSource + ?Sized>(&self, source: &S) -> Vec<RawArtifact> {
        let mut collected = Vec::new();
        let mut page = 1usize;
        let mut retries = 0u32;

        loop {
            match source.fetch_page(page).await {
                Ok(result) => {
                    retries = 0;
                    let total = result.total;
                    collected.extend(result.artifacts);

                    if total <= page * source.page_size() {
                        break;
                    }
                    page += 1;

                    if !self.interval.is_zero() {
                        tokio::time::sleep(self.interval).await;
                    }
                }
                Err(AnalyzerError::RateLimited { retry_after_secs })
                    if retries < self.max_retries =>
                {
                    retries += 1;
                    let pause = retry_after_secs
                        .map(Duration::from_secs)
                        .unwrap_or(self.backoff);
                    debug!(
                        page,
                        retry = retries,
                        pause_secs = pause.as_secs(),
                        "provider rate limit, backing off"
                    );
                    tokio::time::sleep(pause).await;
                }
                Err(e) => {
                    warn!(
                        page,
                        collected = collected.len(),
                        error = %e,
                        "abandoning query after provider error"
                    );
                    break;
                }
            }
        }

        collected
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
