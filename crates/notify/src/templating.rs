//! Minijinja rendering of alert bodies.

use minijinja::Environment;

use crate::traits::{Alert, EmitError};

/// Default body template: title, description, tags, then one line per
/// artifact with its type tag and source.
const DEFAULT_TEMPLATE: &str = "\
{{ title }}

{{ description }}
tags: {{ tags | join(\", \") }}

{% for artifact in artifacts -%}
- {{ artifact.data }} ({{ artifact.data_type or \"untyped\" }}) via {{ artifact.source }}
{% endfor %}";

/// Renders alert bodies from minijinja templates.
///
/// Templates see the serialized [`Alert`] as their context. Custom
/// templates are validated eagerly at emitter construction.
#[derive(Debug)]
pub struct AlertRenderer {
    env: Environment<'static>,
}

impl AlertRenderer {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Check template syntax without rendering.
    pub fn validate(&self, template: &str) -> Result<(), EmitError> {
        self.env
            .template_from_str(template)
            .map(|_| ())
            .map_err(|e| EmitError::Template(e.to_string()))
    }

    /// Render `template` (or the default when `None`) against the alert.
    pub fn render(&self, template: Option<&str>, alert: &Alert) -> Result<String, EmitError> {
        self.env
            .render_str(template.unwrap_or(DEFAULT_TEMPLATE), alert)
            .map_err(|e| EmitError::Template(e.to_string()))
    }
}

impl Default for AlertRenderer {
    fn default() -> Self {
        Self::new()
    }
}
