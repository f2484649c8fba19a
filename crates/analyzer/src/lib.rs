//! Intelligence source integrations.
//!
//! This crate provides:
//! - `Analyzer` trait implemented by every source integration
//! - Pagination driver with rate-limit backoff and partial-result recovery
//! - Name-to-constructor registry resolved at rule construction
//! - Generic paged JSON feed analyzer (`http_feed`)

pub mod feed;
pub mod paging;
pub mod registry;
pub mod traits;

pub use feed::HttpFeedAnalyzer;
pub use paging::{Page, PagedSource, Pager};
pub use registry::AnalyzerRegistry;
pub use traits::{Analyzer, AnalyzerError, RawArtifact, SourceConfig};
