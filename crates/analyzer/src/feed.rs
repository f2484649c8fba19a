//! Generic paged JSON feed analyzer.
//!
//! Provider-neutral reference implementation of the paging pattern: the
//! query is a feed URL returning `{ "total": N, "results": [{"data": ...}] }`
//! with a `page` query parameter. Vendor-specific integrations live outside
//! this crate and register themselves the same way.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::paging::{Page, PagedSource, Pager};
use crate::traits::{Analyzer, AnalyzerError, RawArtifact, SourceConfig};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Collects indicators from a paged JSON feed over HTTP.
#[derive(Debug)]
pub struct HttpFeedAnalyzer {
    url: Url,
    interval: Duration,
    page_size: usize,
    client: reqwest::Client,
}

/// Wire shape of one feed page.
#[derive(Debug, Deserialize)]
struct FeedPage {
    total: usize,
    results: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    data: String,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl HttpFeedAnalyzer {
    pub const KIND: &'static str = "http_feed";

    /// Validate the query shape and build the analyzer.
    ///
    /// The query must be an absolute http(s) URL; this check runs before
    /// any network call.
    pub fn from_config(config: &SourceConfig) -> Result<Self, AnalyzerError> {
        let url = Url::parse(&config.query).map_err(|e| {
            AnalyzerError::InvalidQuery(format!("feed query must be a URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AnalyzerError::InvalidQuery(format!(
                "unsupported feed scheme '{}'",
                url.scheme()
            )));
        }

        let page_size = config
            .options
            .get("page_size")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(AnalyzerError::Config(
                "page_size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            url,
            interval: Duration::from_secs(config.interval),
            page_size,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl PagedSource for HttpFeedAnalyzer {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(&self, page: usize) -> Result<Page, AnalyzerError> {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &self.page_size.to_string());

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(AnalyzerError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(AnalyzerError::Provider(format!("feed returned {status}")));
        }

        let parsed: FeedPage = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Provider(format!("malformed feed page: {e}")))?;

        Ok(Page {
            artifacts: parsed
                .results
                .into_iter()
                .map(|entry| RawArtifact::with_metadata(entry.data, entry.metadata))
                .collect(),
            total: parsed.total,
        })
    }
}

#[async_trait]
impl Analyzer for HttpFeedAnalyzer {
    fn name(&self) -> &str {
        Self::KIND
    }

    async fn artifacts(&self) -> Result<Vec<RawArtifact>, AnalyzerError> {
        Ok(Pager::new(self.interval).collect(self).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_page_size(query: &str, page_size: i64) -> SourceConfig {
        let mut config = SourceConfig::new(query);
        config.options.insert(
            "page_size".to_string(),
            serde_yaml::Value::Number(page_size.into()),
        );
        config
    }

    #[test]
    fn rejects_non_url_query_before_dispatch() {
        let err = HttpFeedAnalyzer::from_config(&SourceConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidQuery(_)));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err =
            HttpFeedAnalyzer::from_config(&SourceConfig::new("ftp://feed.example.com")).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidQuery(_)));
    }

    #[test]
    fn rejects_zero_page_size() {
        let config = config_with_page_size("https://feed.example.com/iocs", 0);
        let err = HttpFeedAnalyzer::from_config(&config).unwrap_err();
        assert!(matches!(err, AnalyzerError::Config(_)));
    }

    #[test]
    fn accepts_valid_feed_config() {
        let config = config_with_page_size("https://feed.example.com/iocs", 50);
        let analyzer = HttpFeedAnalyzer::from_config(&config).unwrap();
        assert_eq!(analyzer.page_size(), 50);
        assert_eq!(analyzer.name(), "http_feed");
    }

    #[test]
    fn feed_page_deserializes() {
        let json = r#"{"total": 2, "results": [{"data": "1.1.1.1"}, {"data": "example.com", "metadata": {"seen": 3}}]}"#;
        let page: FeedPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.results[1].metadata["seen"], 3);
    }
}
