//! Artifact enrichment dispatch.
//!
//! Enrichers are external post-processors that augment an artifact's
//! metadata. Different artifacts enrich concurrently behind a bounded
//! fan-out; within one artifact the configured enrichers run in declared
//! order. An enricher failure is logged and contained to that one
//! invocation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::warn;

use osprey_core::{Artifact, CoreError};

use crate::schema::EnricherSpec;

/// Capability implemented by artifact enrichers.
///
/// Implementations mutate only the given artifact's metadata and must
/// tolerate concurrent invocation across different artifacts.
#[async_trait]
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    async fn enrich(&self, artifact: &mut Artifact) -> Result<(), CoreError>;
}

/// Constructs an enricher from its spec.
pub type EnricherFactory =
    Box<dyn Fn(&EnricherSpec) -> Result<Arc<dyn Enricher>, CoreError> + Send + Sync>;

/// Registry of available enricher kinds.
///
/// Ships empty: concrete enrichers are external collaborators that
/// register themselves here. An unrecognized kind is a configuration-time
/// fatal error at rule construction.
#[derive(Default)]
pub struct EnricherRegistry {
    factories: HashMap<String, EnricherFactory>,
}

impl EnricherRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&EnricherSpec) -> Result<Arc<dyn Enricher>, CoreError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn build(&self, spec: &EnricherSpec) -> Result<Arc<dyn Enricher>, CoreError> {
        match self.factories.get(&spec.enricher) {
            Some(factory) => factory(spec),
            None => Err(CoreError::Config(format!(
                "unknown enricher kind '{}'",
                spec.enricher
            ))),
        }
    }
}

/// Apply every enricher to every artifact.
///
/// Artifacts are processed concurrently relative to one another (bounded
/// by `concurrency`); a failure while enriching one artifact does not
/// prevent other artifacts, or that artifact's remaining enrichers, from
/// completing. Survivor order is preserved.
pub async fn enrich_all(
    artifacts: Vec<Artifact>,
    enrichers: &[Arc<dyn Enricher>],
    concurrency: usize,
) -> Vec<Artifact> {
    if enrichers.is_empty() {
        return artifacts;
    }

    stream::iter(artifacts.into_iter().map(|mut artifact| {
        let enrichers = enrichers.to_vec();
        async move {
            for enricher in &enrichers {
                if let Err(e) = enricher.enrich(&mut artifact).await {
                    warn!(
                        enricher = enricher.name(),
                        artifact = %artifact.data,
                        error = %e,
                        "enrichment failed"
                    );
                }
            }
            artifact
        }
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await
}
