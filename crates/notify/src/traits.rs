//! Emitter trait definition and shared error types.

use async_trait::async_trait;

use osprey_core::Artifact;

/// Errors that can occur during alert delivery.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// An alert ready for delivery: the rule's identity plus the unique,
/// enriched artifact set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Alert {
    pub rule_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub artifacts: Vec<Artifact>,
}

/// Trait for alerting destination implementations.
#[async_trait]
pub trait Emitter: Send + Sync {
    /// Human-readable name for this destination (e.g., "webhook").
    fn name(&self) -> &str;

    /// Whether this emitter is configured and usable. Invalid emitters are
    /// skipped by the dispatcher.
    fn valid(&self) -> bool {
        true
    }

    /// Deliver an alert through this destination.
    async fn emit(&self, alert: &Alert) -> Result<(), EmitError>;
}

/// Result of delivering one alert to one emitter.
#[derive(Debug)]
pub struct DispatchResult {
    pub emitter: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
