//! YAML rule definition types with serde deserialization.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use osprey_analyzer::SourceConfig;
use osprey_core::DataType;
use osprey_notify::EmitterSpec;

/// Top-level rule definition parsed from YAML.
///
/// A rule binds an ordered list of source queries to filtering policy and
/// delivery targets. Rules are constructed once per run and are immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDoc {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Queries execute sequentially, in declared order.
    pub queries: Vec<QuerySpec>,
    /// Type tags an artifact must carry to survive filtering.
    /// Absent means every classifiable type is allowed.
    #[serde(default)]
    pub allowed_data_types: Option<Vec<DataType>>,
    /// Values to drop: plain strings match exactly, slash-delimited
    /// entries (`/\.edu$/`) are regular expressions.
    #[serde(default)]
    pub disallowed_data_values: Vec<String>,
    #[serde(default)]
    pub emitters: Vec<EmitterSpec>,
    #[serde(default)]
    pub enrichers: Vec<EnricherSpec>,
    /// Optional daemon-mode schedule. Rules without one run on the
    /// daemon's default cadence.
    #[serde(default)]
    pub schedule: Option<ScheduleSpec>,
}

/// One query against one analyzer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuerySpec {
    /// Registered analyzer kind executing this query.
    pub analyzer: String,
    pub query: String,
    /// Seconds to pause between result pages.
    #[serde(default)]
    pub interval: u64,
    #[serde(default)]
    pub options: HashMap<String, serde_yaml::Value>,
}

impl QuerySpec {
    /// The analyzer-facing view of this query.
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            query: self.query.clone(),
            interval: self.interval,
            options: self.options.clone(),
        }
    }
}

/// An enricher configuration within a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnricherSpec {
    pub enricher: String,
    #[serde(default)]
    pub options: HashMap<String, serde_yaml::Value>,
}

/// Cron-based execution schedule with optional cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleSpec {
    /// Standard 5-field cron expression.
    pub cron: String,
    /// Minimum gap between triggers, e.g. "30m", "1h".
    #[serde(default)]
    pub cooldown: Option<String>,
}

/// A disallowed-value filter entry with its literal-vs-pattern nature
/// fixed at configuration load.
#[derive(Debug, Clone)]
pub enum DisallowedValue {
    Literal(String),
    Pattern(Regex),
}

impl DisallowedValue {
    /// Parse one `disallowed_data_values` entry. Slash-delimited entries
    /// compile as regular expressions; everything else matches literally.
    pub fn parse(raw: &str) -> Result<Self, regex::Error> {
        if raw.len() > 2 && raw.starts_with('/') && raw.ends_with('/') {
            Regex::new(&raw[1..raw.len() - 1]).map(DisallowedValue::Pattern)
        } else {
            Ok(DisallowedValue::Literal(raw.to_string()))
        }
    }

    pub fn matches(&self, data: &str) -> bool {
        match self {
            DisallowedValue::Literal(value) => value == data,
            DisallowedValue::Pattern(pattern) => pattern.is_match(data),
        }
    }
}

fn default_true() -> bool {
    true
}
