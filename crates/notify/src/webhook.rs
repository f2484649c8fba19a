//! Generic HTTP webhook emitter.
//!
//! Delivers alerts as JSON payloads to a configured endpoint with optional
//! custom headers and body templates. Environment variable references
//! (`${VAR_NAME}`) in the URL and header values are resolved at
//! construction time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::registry::EmitterSpec;
use crate::templating::AlertRenderer;
use crate::traits::{Alert, EmitError, Emitter};

/// Delivers alerts over HTTP to a configured endpoint.
#[derive(Debug)]
pub struct WebhookEmitter {
    /// Target URL (env vars already resolved).
    url: String,
    /// HTTP method (defaults to POST).
    method: reqwest::Method,
    /// Custom headers to include on every request.
    headers: HashMap<String, String>,
    /// Optional body template. When set, the rendered text is sent as the
    /// request body; otherwise the alert is serialized as JSON directly.
    template: Option<String>,
    renderer: Arc<AlertRenderer>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookEmitter {
    pub const KIND: &'static str = "webhook";

    /// Build a webhook emitter from its rule-level spec.
    ///
    /// Missing URL, unresolvable env references, invalid methods and
    /// malformed templates all fail here, before any delivery.
    pub fn from_spec(spec: &EmitterSpec, renderer: Arc<AlertRenderer>) -> Result<Self, EmitError> {
        let url = spec
            .url
            .as_deref()
            .ok_or_else(|| EmitError::Config("webhook emitter requires a url".to_string()))?;
        let url = resolve_env_vars(url)?;

        let method = match spec.method.as_deref() {
            Some(m) => m
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map_err(|_| EmitError::Config(format!("invalid HTTP method: {m}")))?,
            None => reqwest::Method::POST,
        };

        let mut headers = HashMap::new();
        if let Some(raw) = &spec.headers {
            for (key, value) in raw {
                headers.insert(key.clone(), resolve_env_vars(value)?);
            }
        }

        if let Some(template) = &spec.template {
            renderer.validate(template)?;
        }

        Ok(Self {
            url,
            method,
            headers,
            template: spec.template.clone(),
            renderer,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Emitter for WebhookEmitter {
    fn name(&self) -> &str {
        Self::KIND
    }

    async fn emit(&self, alert: &Alert) -> Result<(), EmitError> {
        let body = match &self.template {
            Some(template) => self.renderer.render(Some(template), alert)?,
            None => serde_json::to_string(alert)
                .map_err(|e| EmitError::Config(format!("failed to serialize alert: {e}")))?,
        };

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EmitError::Delivery(format!(
                "webhook returned {status}: {body_text}"
            )));
        }

        tracing::debug!(
            url = %self.url,
            method = %self.method,
            %status,
            "webhook alert delivered"
        );
        Ok(())
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, EmitError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(EmitError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| EmitError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(url: &str) -> EmitterSpec {
        EmitterSpec {
            emitter: "webhook".to_string(),
            url: Some(url.to_string()),
            method: None,
            headers: None,
            template: None,
        }
    }

    #[test]
    fn resolves_env_vars_in_url() {
        std::env::set_var("OSPREY_TEST_HOST", "hooks.example.com");
        let emitter =
            WebhookEmitter::from_spec(&spec("https://${OSPREY_TEST_HOST}/alert"), Arc::default())
                .unwrap();
        assert_eq!(emitter.url, "https://hooks.example.com/alert");
        std::env::remove_var("OSPREY_TEST_HOST");
    }

    #[test]
    fn missing_env_var_is_a_config_error() {
        let result = WebhookEmitter::from_spec(
            &spec("https://${OSPREY_ABSOLUTELY_NOT_SET}/alert"),
            Arc::default(),
        );
        match result.unwrap_err() {
            EmitError::Config(msg) => assert!(msg.contains("OSPREY_ABSOLUTELY_NOT_SET")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn unclosed_env_var_is_a_config_error() {
        let result = WebhookEmitter::from_spec(&spec("https://${UNCLOSED/alert"), Arc::default());
        match result.unwrap_err() {
            EmitError::Config(msg) => assert!(msg.contains("unclosed")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn missing_url_is_a_config_error() {
        let mut s = spec("ignored");
        s.url = None;
        assert!(matches!(
            WebhookEmitter::from_spec(&s, Arc::default()),
            Err(EmitError::Config(_))
        ));
    }

    #[test]
    fn method_defaults_to_post() {
        let emitter = WebhookEmitter::from_spec(&spec("https://example.com"), Arc::default()).unwrap();
        assert_eq!(emitter.method, reqwest::Method::POST);
    }

    #[test]
    fn method_is_parsed_case_insensitively() {
        let mut s = spec("https://example.com");
        s.method = Some("put".to_string());
        let emitter = WebhookEmitter::from_spec(&s, Arc::default()).unwrap();
        assert_eq!(emitter.method, reqwest::Method::PUT);
    }

    #[test]
    fn invalid_method_is_a_config_error() {
        let mut s = spec("https://example.com");
        s.method = Some("NOT A METHOD\0".to_string());
        assert!(matches!(
            WebhookEmitter::from_spec(&s, Arc::default()),
            Err(EmitError::Config(_))
        ));
    }

    #[test]
    fn header_env_vars_are_resolved() {
        std::env::set_var("OSPREY_TEST_TOKEN", "secret-123");
        let mut s = spec("https://example.com");
        s.headers = Some(HashMap::from([
            ("Authorization".to_string(), "Bearer ${OSPREY_TEST_TOKEN}".to_string()),
            ("X-Static".to_string(), "fixed".to_string()),
        ]));
        let emitter = WebhookEmitter::from_spec(&s, Arc::default()).unwrap();
        assert_eq!(emitter.headers["Authorization"], "Bearer secret-123");
        assert_eq!(emitter.headers["X-Static"], "fixed");
        std::env::remove_var("OSPREY_TEST_TOKEN");
    }

    #[test]
    fn invalid_template_fails_at_construction() {
        let mut s = spec("https://example.com");
        s.template = Some("{{ unclosed".to_string());
        assert!(matches!(
            WebhookEmitter::from_spec(&s, Arc::default()),
            Err(EmitError::Template(_))
        ));
    }
}
