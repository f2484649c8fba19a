//! Rule engine for continuous indicator monitoring.
//!
//! This crate provides:
//! - YAML rule definitions with serde deserialization
//! - Filesystem loader with per-file error containment
//! - Fail-fast validation against the analyzer/emitter registries
//! - The compiled rule orchestrator: sequential queries, artifact
//!   normalization and dedup, cache/ticket filtering, parallel
//!   enrichment and emission
//! - Cron scheduler for daemon mode

pub mod enrichment;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod rule;
pub mod schema;
pub mod scheduler;
pub mod validation;

pub use enrichment::{Enricher, EnricherRegistry};
pub use error::RuleError;
pub use loader::{LoadResult, LoadStatus, RuleLoader};
pub use rule::{EvaluationContext, EvaluationReport, Rule};
pub use schema::RuleDoc;
pub use scheduler::RuleScheduler;
pub use validation::{validate_doc, ValidationResult};
