//! Ticket store collaborator boundary.

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::error::CoreError;

/// Optional external system of record consulted to avoid re-alerting on
/// indicators that already have an open case.
///
/// The pipeline treats an invalid or failing store the same as an absent
/// one: the ticket filter pass is skipped, never a hard failure.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Whether the store is configured and usable.
    fn valid(&self) -> bool;

    fn name(&self) -> &str;

    /// Return the subset of `artifacts` with no open ticket.
    async fn find_non_existing(&self, artifacts: &[Artifact]) -> Result<Vec<Artifact>, CoreError>;
}
