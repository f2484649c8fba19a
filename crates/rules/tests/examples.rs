//! Integration tests that verify every example YAML rule in `data/rules/`
//! deserializes correctly against the schema and passes validation.

use osprey_analyzer::AnalyzerRegistry;
use osprey_core::DataType;
use osprey_notify::EmitterRegistry;
use osprey_rules::schema::RuleDoc;
use osprey_rules::{validate_doc, EnricherRegistry, LoadStatus, RuleLoader};

/// Resolve the examples directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn rules_dir() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/rules")
}

fn load_rule(filename: &str) -> RuleDoc {
    let path = rules_dir().join(filename);
    let yaml = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_yaml::from_str(&yaml)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e))
}

// ── phishing-lookalikes.yml ─────────────────────────────────

#[test]
fn parse_phishing_lookalikes_example() {
    let rule = load_rule("phishing-lookalikes.yml");

    assert_eq!(rule.id, "phishing-lookalikes");
    assert!(rule.enabled);
    assert_eq!(rule.tags, vec!["phishing", "brand"]);

    assert_eq!(rule.queries.len(), 1);
    assert_eq!(rule.queries[0].analyzer, "http_feed");
    assert_eq!(rule.queries[0].interval, 5);

    assert_eq!(
        rule.allowed_data_types,
        Some(vec![DataType::Domain, DataType::Url])
    );
    assert_eq!(rule.disallowed_data_values.len(), 2);

    assert_eq!(rule.emitters.len(), 1);
    assert_eq!(rule.emitters[0].emitter, "webhook");
    assert!(rule.emitters[0].template.is_some());

    let schedule = rule.schedule.as_ref().unwrap();
    assert_eq!(schedule.cron, "*/15 * * * *");
    assert_eq!(schedule.cooldown.as_deref(), Some("30m"));
}

// ── c2-infrastructure.yml ───────────────────────────────────

#[test]
fn parse_c2_infrastructure_example() {
    let rule = load_rule("c2-infrastructure.yml");

    assert_eq!(rule.id, "c2-infrastructure");
    assert!(!rule.enabled);

    // Two queries, declared order preserved.
    assert_eq!(rule.queries.len(), 2);
    assert!(rule.queries[0].query.ends_with("/active"));
    assert!(rule.queries[1].query.ends_with("/emerging"));
    assert_eq!(rule.queries[1].interval, 10);

    assert_eq!(rule.emitters[0].method.as_deref(), Some("PUT"));
    assert!(rule.schedule.is_none());
}

// ── Whole-directory load + validation ───────────────────────

#[test]
fn all_examples_load_and_validate() {
    let (docs, results) = RuleLoader::new(rules_dir()).load_all().unwrap();
    assert_eq!(docs.len(), 2);
    assert!(results
        .iter()
        .all(|r| !matches!(r.status, LoadStatus::Failed { .. })));

    let analyzers = AnalyzerRegistry::builtin();
    let emitters = EmitterRegistry::builtin();
    let enrichers = EnricherRegistry::empty();
    for doc in &docs {
        let result = validate_doc(doc, &analyzers, &emitters, &enrichers);
        assert!(
            result.valid,
            "rule '{}' failed validation: {:?}",
            doc.id, result.errors
        );
    }
}

// ── Round-trip: all examples survive serialize → deserialize ─

#[test]
fn all_examples_round_trip() {
    for filename in &["phishing-lookalikes.yml", "c2-infrastructure.yml"] {
        let rule = load_rule(filename);
        let yaml = serde_yaml::to_string(&rule)
            .unwrap_or_else(|e| panic!("Failed to serialize {}: {}", filename, e));
        let rule2: RuleDoc = serde_yaml::from_str(&yaml)
            .unwrap_or_else(|e| panic!("Failed to re-parse {}: {}", filename, e));
        assert_eq!(rule, rule2, "Round-trip failed for {}", filename);
    }
}
