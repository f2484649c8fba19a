//! Error types for rule loading and construction.

/// Errors that can occur while loading, validating, or compiling rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Rule validation error (missing fields, duplicate IDs, bad patterns).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Collaborator resolution failure: unregistered analyzer/emitter/
    /// enricher kind, or a failed configuration check. Raised at rule
    /// construction, before any query executes.
    #[error("Configuration error: {0}")]
    Config(String),
}
