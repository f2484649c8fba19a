//! Fans one alert out to every configured emitter.
//!
//! Emitters run concurrently behind a bounded fan-out; the dispatcher
//! waits for all of them before returning. Individual emitter failures
//! are caught and logged with the emitter's identity, never re-raised.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::traits::{Alert, DispatchResult, Emitter};

const DEFAULT_FANOUT: usize = 8;

/// Dispatches alerts to a rule's emitters.
pub struct Dispatcher {
    emitters: Vec<Arc<dyn Emitter>>,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(emitters: Vec<Arc<dyn Emitter>>) -> Self {
        Self {
            emitters,
            concurrency: DEFAULT_FANOUT,
        }
    }

    /// Cap on concurrently running emitters.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Deliver the alert to every valid emitter, concurrently.
    ///
    /// Returns one result per attempted emitter. A failing emitter does
    /// not block the others; the call itself never fails.
    pub async fn dispatch(&self, alert: &Alert) -> Vec<DispatchResult> {
        let targets: Vec<Arc<dyn Emitter>> = self
            .emitters
            .iter()
            .filter(|emitter| {
                if emitter.valid() {
                    true
                } else {
                    tracing::debug!(
                        rule_id = %alert.rule_id,
                        emitter = emitter.name(),
                        "skipping emitter with invalid configuration"
                    );
                    false
                }
            })
            .map(Arc::clone)
            .collect();

        if targets.is_empty() {
            tracing::debug!(rule_id = %alert.rule_id, "no emitters configured");
            return Vec::new();
        }

        stream::iter(targets.into_iter().map(|emitter| async move {
            let start = std::time::Instant::now();
            let result = emitter.emit(alert).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        rule_id = %alert.rule_id,
                        emitter = emitter.name(),
                        artifacts = alert.artifacts.len(),
                        duration_ms,
                        "alert delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        rule_id = %alert.rule_id,
                        emitter = emitter.name(),
                        error = %e,
                        duration_ms,
                        "alert delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            DispatchResult {
                emitter: emitter.name().to_string(),
                success,
                error,
                duration_ms,
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await
    }
}
