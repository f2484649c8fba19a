//! Artifact normalization, dedup, and filtering stages.
//!
//! Stage 1 ([`normalize`]) is pure: drop structurally invalid artifacts,
//! deduplicate by data keeping the first occurrence, then apply the rule's
//! type and value policy. Stage 2 ([`filter_unseen`]) consults the shared
//! recency cache and, when configured, the ticket store. Both stages
//! preserve input order.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, warn};

use osprey_core::{Artifact, DataType, RecencyCache, TicketStore};

use crate::error::RuleError;
use crate::schema::{DisallowedValue, RuleDoc};

/// A rule's compiled artifact filtering policy.
#[derive(Debug)]
pub struct FilterPolicy {
    allowed: HashSet<DataType>,
    disallowed: Vec<DisallowedValue>,
}

impl FilterPolicy {
    /// Compile the policy from a rule document. Pattern-form disallowed
    /// values that fail to compile are a construction-time error.
    pub fn from_doc(doc: &RuleDoc) -> Result<Self, RuleError> {
        let allowed = match &doc.allowed_data_types {
            Some(types) => types.iter().copied().collect(),
            None => DataType::ALL.into_iter().collect(),
        };

        let mut disallowed = Vec::with_capacity(doc.disallowed_data_values.len());
        for raw in &doc.disallowed_data_values {
            disallowed.push(DisallowedValue::parse(raw).map_err(|e| {
                RuleError::Validation(format!("invalid disallowed value '{raw}': {e}"))
            })?);
        }

        Ok(Self { allowed, disallowed })
    }

    /// Whether an artifact survives the type and value filters.
    ///
    /// Unclassified artifacts never pass: they carry no tag to match
    /// against the allowed set.
    pub fn allows(&self, artifact: &Artifact) -> bool {
        match artifact.data_type {
            Some(tag) if self.allowed.contains(&tag) => {
                !self.disallowed.iter().any(|d| d.matches(&artifact.data))
            }
            _ => false,
        }
    }
}

/// Normalize the merged raw artifact list of one rule evaluation.
///
/// Order-preserving: dedup keeps the first occurrence of each data value
/// (with its metadata), and filtering never reorders survivors.
pub fn normalize(raw: Vec<Artifact>, policy: &FilterPolicy) -> Vec<Artifact> {
    let mut unique: IndexMap<String, Artifact> = IndexMap::new();
    for artifact in raw {
        if !artifact.is_valid() {
            continue;
        }
        unique.entry(artifact.data.clone()).or_insert(artifact);
    }

    unique
        .into_values()
        .filter(|artifact| policy.allows(artifact))
        .collect()
}

/// Keep only artifacts not recently alerted and not already ticketed.
///
/// The cache is read here and written only after emission. A ticket store
/// that is absent, invalid, or failing is skipped, never a hard failure.
pub async fn filter_unseen(
    artifacts: Vec<Artifact>,
    cache: &dyn RecencyCache,
    tickets: Option<&dyn TicketStore>,
) -> Vec<Artifact> {
    let fresh: Vec<Artifact> = artifacts
        .into_iter()
        .filter(|artifact| !cache.cached(&artifact.data))
        .collect();

    let store = match tickets {
        Some(store) if store.valid() && !fresh.is_empty() => store,
        _ => return fresh,
    };

    match store.find_non_existing(&fresh).await {
        Ok(open) => {
            debug!(
                store = store.name(),
                before = fresh.len(),
                after = open.len(),
                "ticket store filtered already-ticketed artifacts"
            );
            open
        }
        Err(e) => {
            warn!(store = store.name(), error = %e, "ticket store lookup failed, skipping ticket filter");
            fresh
        }
    }
}
