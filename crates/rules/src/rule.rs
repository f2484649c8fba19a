//! Compiled rule: collaborator resolution and evaluation orchestration.
//!
//! [`Rule::compile`] is the all-or-nothing configuration gate: every
//! query's analyzer, every emitter and every enricher is resolved and
//! configuration-checked before any query executes. [`Rule::evaluate`]
//! then runs one pipeline pass: sequential queries, normalization,
//! cache/ticket filtering, parallel enrichment, parallel emission, and
//! finally cache marking.

use std::sync::Arc;

use tracing::{debug, info, warn};

use osprey_analyzer::{Analyzer, AnalyzerRegistry};
use osprey_core::{Artifact, RecencyCache, TicketStore};
use osprey_notify::{Alert, DispatchResult, Dispatcher, EmitterRegistry};

use crate::enrichment::{enrich_all, Enricher, EnricherRegistry};
use crate::error::RuleError;
use crate::pipeline::{filter_unseen, normalize, FilterPolicy};
use crate::schema::RuleDoc;

const DEFAULT_FANOUT: usize = 8;

/// Shared collaborators for one evaluation run.
pub struct EvaluationContext<'a> {
    pub cache: &'a dyn RecencyCache,
    pub tickets: Option<&'a dyn TicketStore>,
}

/// What one evaluation pass did.
#[derive(Debug)]
pub struct EvaluationReport {
    pub rule_id: String,
    /// Raw artifacts collected across all queries.
    pub collected: usize,
    /// Survivors of normalization, dedup, and cache/ticket filtering.
    pub unique: usize,
    /// Artifacts handed to the emitters (equals `unique`; zero when
    /// emission was skipped for an empty set).
    pub delivered: usize,
    pub dispatches: Vec<DispatchResult>,
}

/// A rule with every collaborator resolved, ready to evaluate.
pub struct Rule {
    doc: RuleDoc,
    analyzers: Vec<Box<dyn Analyzer>>,
    policy: FilterPolicy,
    enrichers: Vec<Arc<dyn Enricher>>,
    dispatcher: Dispatcher,
    fanout: usize,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("doc", &self.doc)
            .field("policy", &self.policy)
            .field("fanout", &self.fanout)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// Resolve and configuration-check every collaborator the document
    /// names. Any failure aborts the whole rule here, before any query
    /// executes.
    pub fn compile(
        doc: RuleDoc,
        analyzers: &AnalyzerRegistry,
        emitters: &EmitterRegistry,
        enrichers: &EnricherRegistry,
    ) -> Result<Self, RuleError> {
        if doc.id.is_empty() {
            return Err(RuleError::Validation(
                "rule id must not be empty".to_string(),
            ));
        }

        let policy = FilterPolicy::from_doc(&doc)?;

        let mut resolved_analyzers = Vec::with_capacity(doc.queries.len());
        for query in &doc.queries {
            let analyzer = analyzers
                .build(&query.analyzer, &query.source_config())
                .map_err(|e| {
                    RuleError::Config(format!(
                        "rule '{}' query '{}': {e}",
                        doc.id, query.analyzer
                    ))
                })?;
            resolved_analyzers.push(analyzer);
        }

        let mut resolved_emitters = Vec::with_capacity(doc.emitters.len());
        for spec in &doc.emitters {
            let emitter = emitters.build(spec).map_err(|e| {
                RuleError::Config(format!("rule '{}' emitter '{}': {e}", doc.id, spec.emitter))
            })?;
            resolved_emitters.push(emitter);
        }

        let mut resolved_enrichers = Vec::with_capacity(doc.enrichers.len());
        for spec in &doc.enrichers {
            let enricher = enrichers.build(spec).map_err(|e| {
                RuleError::Config(format!(
                    "rule '{}' enricher '{}': {e}",
                    doc.id, spec.enricher
                ))
            })?;
            resolved_enrichers.push(enricher);
        }

        Ok(Self {
            doc,
            analyzers: resolved_analyzers,
            policy,
            enrichers: resolved_enrichers,
            dispatcher: Dispatcher::new(resolved_emitters).with_concurrency(DEFAULT_FANOUT),
            fanout: DEFAULT_FANOUT,
        })
    }

    pub fn id(&self) -> &str {
        &self.doc.id
    }

    pub fn enabled(&self) -> bool {
        self.doc.enabled
    }

    pub fn doc(&self) -> &RuleDoc {
        &self.doc
    }

    /// Run one full pipeline pass.
    ///
    /// Queries execute sequentially in declared order; a failing query
    /// contributes zero artifacts and does not abort its siblings. The
    /// surviving unique set is enriched and emitted in parallel, then
    /// marked seen in the recency cache.
    pub async fn evaluate(&self, ctx: &EvaluationContext<'_>) -> EvaluationReport {
        let mut raw = Vec::new();
        for (query, analyzer) in self.doc.queries.iter().zip(&self.analyzers) {
            match analyzer.artifacts().await {
                Ok(artifacts) => {
                    debug!(
                        rule_id = %self.doc.id,
                        analyzer = %query.analyzer,
                        count = artifacts.len(),
                        "query collected artifacts"
                    );
                    raw.extend(artifacts.into_iter().map(|r| {
                        Artifact::with_metadata(r.data, query.analyzer.clone(), r.metadata)
                    }));
                }
                Err(e) => {
                    warn!(
                        rule_id = %self.doc.id,
                        analyzer = %query.analyzer,
                        error = %e,
                        "query failed, contributing no artifacts"
                    );
                }
            }
        }
        let collected = raw.len();

        let filtered = normalize(raw, &self.policy);
        let fresh = filter_unseen(filtered, ctx.cache, ctx.tickets).await;
        let unique = fresh.len();

        if fresh.is_empty() {
            debug!(rule_id = %self.doc.id, collected, "no new artifacts");
            return EvaluationReport {
                rule_id: self.doc.id.clone(),
                collected,
                unique,
                delivered: 0,
                dispatches: Vec::new(),
            };
        }

        let enriched = enrich_all(fresh, &self.enrichers, self.fanout).await;

        let alert = Alert {
            rule_id: self.doc.id.clone(),
            title: self.doc.title.clone(),
            description: self.doc.description.clone(),
            tags: self.doc.tags.clone(),
            artifacts: enriched,
        };
        let dispatches = self.dispatcher.dispatch(&alert).await;

        // Every artifact in the set is marked seen once all emitters have
        // been attempted, regardless of individual outcomes.
        for artifact in &alert.artifacts {
            ctx.cache.mark_seen(&artifact.data);
        }

        info!(
            rule_id = %self.doc.id,
            collected,
            unique,
            emitters = dispatches.len(),
            "rule evaluation complete"
        );

        EvaluationReport {
            rule_id: self.doc.id.clone(),
            collected,
            unique,
            delivered: alert.artifacts.len(),
            dispatches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use osprey_analyzer::{AnalyzerError, RawArtifact};
    use osprey_core::{MemoryCache, RecencyCache};
    use osprey_notify::{EmitError, Emitter};

    /// Analyzer yielding a fixed value list, counting invocations.
    struct StaticAnalyzer {
        values: Vec<String>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Analyzer for StaticAnalyzer {
        fn name(&self) -> &str {
            "static"
        }

        async fn artifacts(&self) -> Result<Vec<RawArtifact>, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalyzerError::Provider("source down".to_string()));
            }
            Ok(self.values.iter().map(RawArtifact::new).collect())
        }
    }

    struct RecordingEmitter {
        name: String,
        emit_count: Arc<AtomicUsize>,
        last_artifacts: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Emitter for RecordingEmitter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn emit(&self, alert: &Alert) -> Result<(), EmitError> {
            self.emit_count.fetch_add(1, Ordering::SeqCst);
            self.last_artifacts
                .store(alert.artifacts.len(), Ordering::SeqCst);
            if self.fail {
                Err(EmitError::Delivery("emitter down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn doc_from(yaml: &str) -> RuleDoc {
        serde_yaml::from_str(yaml).unwrap()
    }

    /// Registry whose "static" analyzer yields `values` and counts calls.
    fn static_registry(values: &[&str], calls: Arc<AtomicUsize>) -> AnalyzerRegistry {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let mut registry = AnalyzerRegistry::empty();
        registry.register("static", move |_| {
            Ok(Box::new(StaticAnalyzer {
                values: values.clone(),
                calls: calls.clone(),
                fail: false,
            }))
        });
        registry
    }

    fn emitter_registry_with(
        name: &'static str,
        fail: bool,
    ) -> (EmitterRegistry, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let emit_count = Arc::new(AtomicUsize::new(0));
        let last_artifacts = Arc::new(AtomicUsize::new(0));
        let (count, last) = (emit_count.clone(), last_artifacts.clone());
        let mut registry = EmitterRegistry::empty();
        registry.register(name, move |_| {
            Ok(Arc::new(RecordingEmitter {
                name: name.to_string(),
                emit_count: count.clone(),
                last_artifacts: last.clone(),
                fail,
            }))
        });
        (registry, emit_count, last_artifacts)
    }

    const BASIC_RULE: &str = r#"
id: basic
title: Basic rule
queries:
  - analyzer: static
    query: anything
"#;

    #[test]
    fn unregistered_analyzer_fails_compile_with_zero_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = static_registry(&["1.1.1.1"], calls.clone());

        let doc = doc_from(
            r#"
id: broken
title: Broken rule
queries:
  - analyzer: static
    query: q
  - analyzer: not-registered
    query: q
"#,
        );

        let err = Rule::compile(
            doc,
            &registry,
            &EmitterRegistry::empty(),
            &EnricherRegistry::empty(),
        )
        .unwrap_err();

        assert!(matches!(err, RuleError::Config(_)));
        // The gate is all-or-nothing: no analyzer ran.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bad_disallowed_pattern_fails_compile() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = static_registry(&["1.1.1.1"], calls);

        let mut doc = doc_from(BASIC_RULE);
        doc.disallowed_data_values = vec!["/[unclosed/".to_string()];

        assert!(matches!(
            Rule::compile(
                doc,
                &registry,
                &EmitterRegistry::empty(),
                &EnricherRegistry::empty()
            ),
            Err(RuleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn evaluation_delivers_unique_set_to_emitters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = static_registry(&["1.1.1.1", "1.1.1.1", "example.com"], calls);
        let (emitters, emit_count, last_artifacts) = emitter_registry_with("rec", false);

        let mut doc = doc_from(BASIC_RULE);
        doc.emitters = vec![osprey_notify::EmitterSpec {
            emitter: "rec".to_string(),
            url: None,
            method: None,
            headers: None,
            template: None,
        }];

        let rule =
            Rule::compile(doc, &registry, &emitters, &EnricherRegistry::empty()).unwrap();
        let cache = MemoryCache::new(Duration::from_secs(60));
        let report = rule
            .evaluate(&EvaluationContext {
                cache: &cache,
                tickets: None,
            })
            .await;

        assert_eq!(report.collected, 3);
        assert_eq!(report.unique, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(emit_count.load(Ordering::SeqCst), 1);
        assert_eq!(last_artifacts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_query_contributes_zero_but_siblings_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = static_registry(&["1.1.1.1"], calls);
        registry.register("broken", |_| {
            Ok(Box::new(StaticAnalyzer {
                values: Vec::new(),
                calls: Arc::new(AtomicUsize::new(0)),
                fail: true,
            }))
        });

        let doc = doc_from(
            r#"
id: partial
title: Partial rule
queries:
  - analyzer: broken
    query: q
  - analyzer: static
    query: q
"#,
        );

        let rule = Rule::compile(
            doc,
            &registry,
            &EmitterRegistry::empty(),
            &EnricherRegistry::empty(),
        )
        .unwrap();
        let cache = MemoryCache::new(Duration::from_secs(60));
        let report = rule
            .evaluate(&EvaluationContext {
                cache: &cache,
                tickets: None,
            })
            .await;

        assert_eq!(report.collected, 1);
        assert_eq!(report.unique, 1);
    }

    #[tokio::test]
    async fn emitter_failure_does_not_block_others_or_cache_marking() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = static_registry(&["1.1.1.1"], calls);

        let mut emitters = EmitterRegistry::empty();
        let ok_count = Arc::new(AtomicUsize::new(0));
        let ok_artifacts = Arc::new(AtomicUsize::new(0));
        {
            let (count, last) = (ok_count.clone(), ok_artifacts.clone());
            emitters.register("ok", move |_| {
                Ok(Arc::new(RecordingEmitter {
                    name: "ok".to_string(),
                    emit_count: count.clone(),
                    last_artifacts: last.clone(),
                    fail: false,
                }))
            });
        }
        emitters.register("flaky", |_| {
            Ok(Arc::new(RecordingEmitter {
                name: "flaky".to_string(),
                emit_count: Arc::new(AtomicUsize::new(0)),
                last_artifacts: Arc::new(AtomicUsize::new(0)),
                fail: true,
            }))
        });

        let mut doc = doc_from(BASIC_RULE);
        doc.emitters = ["flaky", "ok"]
            .into_iter()
            .map(|kind| osprey_notify::EmitterSpec {
                emitter: kind.to_string(),
                url: None,
                method: None,
                headers: None,
                template: None,
            })
            .collect();

        let rule =
            Rule::compile(doc, &registry, &emitters, &EnricherRegistry::empty()).unwrap();
        let cache = MemoryCache::new(Duration::from_secs(60));
        let report = rule
            .evaluate(&EvaluationContext {
                cache: &cache,
                tickets: None,
            })
            .await;

        assert_eq!(report.dispatches.len(), 2);
        assert!(report.dispatches.iter().any(|d| !d.success));
        assert_eq!(ok_count.load(Ordering::SeqCst), 1);
        assert_eq!(ok_artifacts.load(Ordering::SeqCst), 1);
        // Marked seen despite the flaky emitter.
        assert!(cache.cached("1.1.1.1"));
    }

    #[tokio::test]
    async fn second_run_suppresses_already_alerted_artifacts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = static_registry(&["1.1.1.1", "example.com"], calls);
        let (emitters, emit_count, _) = emitter_registry_with("rec", false);

        let mut doc = doc_from(BASIC_RULE);
        doc.emitters = vec![osprey_notify::EmitterSpec {
            emitter: "rec".to_string(),
            url: None,
            method: None,
            headers: None,
            template: None,
        }];

        let rule =
            Rule::compile(doc, &registry, &emitters, &EnricherRegistry::empty()).unwrap();
        let cache = MemoryCache::new(Duration::from_secs(60));
        let ctx = EvaluationContext {
            cache: &cache,
            tickets: None,
        };

        let first = rule.evaluate(&ctx).await;
        assert_eq!(first.delivered, 2);
        assert_eq!(emit_count.load(Ordering::SeqCst), 1);

        // Same source output, same cache: nothing new to alert on.
        let second = rule.evaluate(&ctx).await;
        assert_eq!(second.unique, 0);
        assert_eq!(second.delivered, 0);
        assert_eq!(emit_count.load(Ordering::SeqCst), 1);
    }
}
