//! Rule validation with structured, path-tagged errors.
//!
//! Runs the same collaborator resolution the compiler does, plus schema
//! sanity checks, without executing anything. Errors block the rule;
//! warnings are advisory.

use serde::Serialize;

use osprey_analyzer::AnalyzerRegistry;
use osprey_notify::EmitterRegistry;

use crate::enrichment::EnricherRegistry;
use crate::schema::{DisallowedValue, RuleDoc};
use crate::scheduler::{normalize_cron, parse_duration};

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// One finding, anchored to a path within the rule document.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// JSON-path-like location, e.g. `"queries[1].analyzer"`.
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a parsed rule document against the configured registries.
pub fn validate_doc(
    doc: &RuleDoc,
    analyzers: &AnalyzerRegistry,
    emitters: &EmitterRegistry,
    enrichers: &EnricherRegistry,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    if doc.id.is_empty() {
        result.error("id", "rule id must not be empty");
    }
    if doc.title.is_empty() {
        result.error("title", "rule title must not be empty");
    }
    if doc.queries.is_empty() {
        result.error("queries", "rule must declare at least one query");
    }

    for (index, query) in doc.queries.iter().enumerate() {
        let path = format!("queries[{index}]");
        if query.query.is_empty() {
            result.error(format!("{path}.query"), "query must not be empty");
        }
        if !analyzers.contains(&query.analyzer) {
            result.error(
                format!("{path}.analyzer"),
                format!("unknown analyzer kind '{}'", query.analyzer),
            );
        } else if let Err(e) = analyzers.build(&query.analyzer, &query.source_config()) {
            result.error(path, e.to_string());
        }
    }

    if let Some(types) = &doc.allowed_data_types {
        if types.is_empty() {
            result.warn(
                "allowed_data_types",
                "empty allowed type list drops every artifact",
            );
        }
    }

    for (index, raw) in doc.disallowed_data_values.iter().enumerate() {
        if let Err(e) = DisallowedValue::parse(raw) {
            result.error(
                format!("disallowed_data_values[{index}]"),
                format!("invalid pattern: {e}"),
            );
        }
    }

    for (index, spec) in doc.emitters.iter().enumerate() {
        let path = format!("emitters[{index}]");
        if !emitters.contains(&spec.emitter) {
            result.error(
                path,
                format!("unknown emitter kind '{}'", spec.emitter),
            );
        } else if let Err(e) = emitters.build(spec) {
            result.error(path, e.to_string());
        }
    }
    if doc.emitters.is_empty() {
        result.warn("emitters", "rule has no emitters; alerts go nowhere");
    }

    for (index, spec) in doc.enrichers.iter().enumerate() {
        if !enrichers.contains(&spec.enricher) {
            result.error(
                format!("enrichers[{index}]"),
                format!("unknown enricher kind '{}'", spec.enricher),
            );
        }
    }

    if let Some(schedule) = &doc.schedule {
        use std::str::FromStr;
        if cron::Schedule::from_str(&normalize_cron(&schedule.cron)).is_err() {
            result.error(
                "schedule.cron",
                format!("invalid cron expression '{}'", schedule.cron),
            );
        }
        if let Some(cooldown) = &schedule.cooldown {
            if parse_duration(cooldown).is_none() {
                result.error(
                    "schedule.cooldown",
                    format!("invalid cooldown '{cooldown}' (expected e.g. \"30m\", \"1h\")"),
                );
            }
        }
    }

    result
}
