//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use osprey_analyzer::AnalyzerRegistry;
use osprey_core::MemoryCache;
use osprey_notify::EmitterRegistry;
use osprey_rules::scheduler::parse_duration;
use osprey_rules::{
    validate_doc, EnricherRegistry, EvaluationContext, LoadStatus, Rule, RuleLoader,
    RuleScheduler,
};

/// Load all rules and print per-file and per-rule validation findings.
pub fn validate(rules_dir: &Path) -> Result<()> {
    let (docs, results) = RuleLoader::new(rules_dir)
        .load_all()
        .context("failed to scan rules directory")?;

    let mut failures = 0usize;
    for result in &results {
        match &result.status {
            LoadStatus::Loaded { rule_id } => {
                info!(rule_id = %rule_id, path = %result.path.display(), "parsed");
            }
            LoadStatus::Skipped { .. } => {}
            LoadStatus::Failed { error } => {
                failures += 1;
                error!(path = %result.path.display(), error = %error, "load failed");
            }
        }
    }

    let analyzers = AnalyzerRegistry::builtin();
    let emitters = EmitterRegistry::builtin();
    let enrichers = EnricherRegistry::empty();

    for doc in &docs {
        let outcome = validate_doc(doc, &analyzers, &emitters, &enrichers);
        for warning in &outcome.warnings {
            warn!(rule_id = %doc.id, path = %warning.path, "{}", warning.message);
        }
        for issue in &outcome.errors {
            failures += 1;
            error!(rule_id = %doc.id, path = %issue.path, "{}", issue.message);
        }
    }

    if failures > 0 {
        bail!("{failures} validation failure(s)");
    }
    info!(rules = docs.len(), "all rules valid");
    Ok(())
}

/// Evaluate rules once, fanning out up to `parallelism` rules at a time.
pub async fn run(
    rules_dir: &Path,
    only_rule: Option<&str>,
    parallelism: usize,
    retention: &str,
) -> Result<()> {
    let cache = MemoryCache::new(parse_retention(retention)?);
    let rules = compile_rules(rules_dir, only_rule)?;
    if rules.is_empty() {
        bail!("no runnable rules found in {}", rules_dir.display());
    }

    evaluate_batch(&rules, &cache, parallelism).await;
    Ok(())
}

/// Scheduler loop: every `tick` seconds, evaluate the rules that are due.
pub async fn daemon(
    rules_dir: &Path,
    tick: u64,
    default_every: &str,
    parallelism: usize,
    retention: &str,
) -> Result<()> {
    let default_every = parse_duration(default_every)
        .with_context(|| format!("invalid default cadence '{default_every}'"))?;
    let cache = MemoryCache::new(parse_retention(retention)?);

    let rules = compile_rules(rules_dir, None)?;
    if rules.is_empty() {
        bail!("no runnable rules found in {}", rules_dir.display());
    }

    let mut scheduler = RuleScheduler::new(default_every);
    scheduler.sync(&rules.iter().map(|r| r.doc().clone()).collect::<Vec<_>>());
    info!(rules = rules.len(), tick, "daemon started");

    let mut ticker = tokio::time::interval(Duration::from_secs(tick.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                return Ok(());
            }
        }

        let now = chrono::Utc::now();
        let due: Vec<String> = scheduler.due(now).iter().map(|s| s.to_string()).collect();
        if due.is_empty() {
            continue;
        }

        let batch: Vec<Arc<Rule>> = rules
            .iter()
            .filter(|rule| due.iter().any(|id| id == rule.id()))
            .cloned()
            .collect();

        evaluate_batch(&batch, &cache, parallelism).await;
        for id in &due {
            scheduler.record_trigger(id);
        }
    }
}

/// Print the classified type tag of one value.
pub fn classify(value: &str) {
    match osprey_core::classify(value) {
        Some(tag) => println!("{tag}"),
        None => println!("none"),
    }
}

/// Load, filter, and compile rules; a misconfigured rule is reported and
/// skipped so its siblings still run.
fn compile_rules(rules_dir: &Path, only_rule: Option<&str>) -> Result<Vec<Arc<Rule>>> {
    let (docs, results) = RuleLoader::new(rules_dir)
        .load_all()
        .context("failed to scan rules directory")?;
    for result in &results {
        if let LoadStatus::Failed { error } = &result.status {
            error!(path = %result.path.display(), error = %error, "load failed");
        }
    }

    let analyzers = AnalyzerRegistry::builtin();
    let emitters = EmitterRegistry::builtin();
    let enrichers = EnricherRegistry::empty();

    let mut rules = Vec::new();
    for doc in docs {
        if let Some(only) = only_rule {
            if doc.id != only {
                continue;
            }
        }
        if !doc.enabled {
            info!(rule_id = %doc.id, "rule disabled, skipping");
            continue;
        }
        let id = doc.id.clone();
        match Rule::compile(doc, &analyzers, &emitters, &enrichers) {
            Ok(rule) => rules.push(Arc::new(rule)),
            Err(e) => error!(rule_id = %id, error = %e, "rule misconfigured, skipping"),
        }
    }
    Ok(rules)
}

/// Evaluate a batch of rules with bounded concurrency.
async fn evaluate_batch(rules: &[Arc<Rule>], cache: &MemoryCache, parallelism: usize) {
    stream::iter(rules.iter().cloned().map(|rule| async move {
        let ctx = EvaluationContext {
            cache,
            tickets: None,
        };
        rule.evaluate(&ctx).await
    }))
    .buffer_unordered(parallelism.max(1))
    .for_each(|report| async move {
        info!(
            rule_id = %report.rule_id,
            collected = report.collected,
            unique = report.unique,
            delivered = report.delivered,
            "evaluated"
        );
    })
    .await;
}

fn parse_retention(retention: &str) -> Result<Duration> {
    parse_duration(retention).with_context(|| format!("invalid retention '{retention}'"))
}
