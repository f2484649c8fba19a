//! Name-to-constructor lookup for analyzer kinds.
//!
//! The registry is an explicit static table built once at startup, not a
//! side effect of defining a type. An unrecognized kind fails with a
//! configuration error at lookup time, before any query executes.

use std::collections::HashMap;

use crate::feed::HttpFeedAnalyzer;
use crate::traits::{Analyzer, AnalyzerError, SourceConfig};

/// Constructs an analyzer from its per-query configuration, running the
/// analyzer's own configuration check in the process.
pub type AnalyzerFactory =
    Box<dyn Fn(&SourceConfig) -> Result<Box<dyn Analyzer>, AnalyzerError> + Send + Sync>;

/// Registry of available analyzer kinds.
pub struct AnalyzerRegistry {
    factories: HashMap<String, AnalyzerFactory>,
}

impl AnalyzerRegistry {
    /// Registry with no kinds. Useful for tests and embedders that supply
    /// their own integrations.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with the in-tree analyzer kinds.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(HttpFeedAnalyzer::KIND, |config| {
            Ok(Box::new(HttpFeedAnalyzer::from_config(config)?))
        });
        registry
    }

    /// Register a constructor for an analyzer kind, replacing any existing
    /// registration under the same name.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&SourceConfig) -> Result<Box<dyn Analyzer>, AnalyzerError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind names, sorted for stable output.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct an analyzer for `kind`.
    ///
    /// Unknown kinds and failed configuration checks both surface as
    /// construction-time errors; nothing is dispatched.
    pub fn build(
        &self,
        kind: &str,
        config: &SourceConfig,
    ) -> Result<Box<dyn Analyzer>, AnalyzerError> {
        match self.factories.get(kind) {
            Some(factory) => factory(config),
            None => Err(AnalyzerError::Config(format!(
                "unknown analyzer kind '{kind}'"
            ))),
        }
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
