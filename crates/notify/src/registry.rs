//! Name-to-constructor lookup for emitter kinds.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::templating::AlertRenderer;
use crate::traits::{EmitError, Emitter};
use crate::webhook::WebhookEmitter;

/// An emitter configuration within a rule.
///
/// `emitter` names the kind; the remaining fields are the option bag the
/// kind's constructor understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterSpec {
    pub emitter: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub template: Option<String>,
}

/// Constructs an emitter from its spec, running the emitter's own
/// configuration check in the process.
pub type EmitterFactory =
    Box<dyn Fn(&EmitterSpec) -> Result<Arc<dyn Emitter>, EmitError> + Send + Sync>;

/// Registry of available emitter kinds.
///
/// An unrecognized kind is a configuration-time fatal error at rule
/// construction, not a per-delivery runtime error.
pub struct EmitterRegistry {
    factories: HashMap<String, EmitterFactory>,
}

impl EmitterRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with the in-tree emitter kinds.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let renderer = Arc::new(AlertRenderer::new());
        registry.register(WebhookEmitter::KIND, move |spec| {
            Ok(Arc::new(WebhookEmitter::from_spec(spec, Arc::clone(&renderer))?))
        });
        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&EmitterSpec) -> Result<Arc<dyn Emitter>, EmitError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Construct an emitter for the spec's kind.
    pub fn build(&self, spec: &EmitterSpec) -> Result<Arc<dyn Emitter>, EmitError> {
        match self.factories.get(&spec.emitter) {
            Some(factory) => factory(spec),
            None => Err(EmitError::Config(format!(
                "unknown emitter kind '{}'",
                spec.emitter
            ))),
        }
    }
}

impl Default for EmitterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
