//! Analyzer trait definition and shared error types.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors that can occur while collecting artifacts from a source.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// Missing or invalid analyzer configuration. Raised at construction
    /// time, before any query executes.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query failed a pre-dispatch shape check. Raised before any
    /// network call.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Transient provider signal; the same page is retried after a backoff.
    #[error("Rate limited by provider")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP transport failure. Fatal for the query.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other source-side failure. Fatal for the query.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl AnalyzerError {
    /// Whether the pagination driver should retry the same page.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalyzerError::RateLimited { .. })
    }
}

/// Per-query source configuration parsed from a rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// The query string dispatched to the provider.
    pub query: String,
    /// Seconds to pause between result pages (0 = no pause).
    #[serde(default)]
    pub interval: u64,
    /// Arbitrary per-source parameters.
    #[serde(default)]
    pub options: HashMap<String, serde_yaml::Value>,
}

impl SourceConfig {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            interval: 0,
            options: HashMap::new(),
        }
    }
}

/// One discovered indicator before classification and provenance tagging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArtifact {
    pub data: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RawArtifact {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(
        data: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            data: data.into(),
            metadata,
        }
    }
}

/// Capability implemented by every source integration: run one configured
/// query against one external intelligence source.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzer kind, used for provenance tagging and logs.
    fn name(&self) -> &str;

    /// Collect raw candidate artifacts for the configured query.
    ///
    /// Provider errors during paging are contained by the driver; an error
    /// returned here aborts only this query's contribution.
    async fn artifacts(&self) -> Result<Vec<RawArtifact>, AnalyzerError>;
}

impl std::fmt::Debug for dyn Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Analyzer").field("name", &self.name()).finish()
    }
}
