//! Filesystem-backed rule loading.
//!
//! Scans a directory (recursively) for `*.yml` / `*.yaml` files and
//! deserializes them into [`RuleDoc`] instances. Parse errors are reported
//! per file and do not abort the scan; duplicate rule IDs are reported as
//! failures for the later file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::RuleError;
use crate::schema::RuleDoc;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    Loaded { rule_id: String },
    Skipped { reason: String },
    Failed { error: String },
}

/// Loads rule definitions from a directory tree.
pub struct RuleLoader {
    rules_dir: PathBuf,
}

impl RuleLoader {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Dotfiles and non-YAML files are skipped. Returns the loaded rules
    /// in path order alongside one [`LoadResult`] per encountered file.
    pub fn load_all(&self) -> Result<(Vec<RuleDoc>, Vec<LoadResult>), RuleError> {
        let mut docs = Vec::new();
        let mut results = Vec::new();
        let mut seen_ids = HashSet::new();
        self.scan_dir(&self.rules_dir, &mut docs, &mut results, &mut seen_ids)?;
        Ok((docs, results))
    }

    fn scan_dir(
        &self,
        dir: &Path,
        docs: &mut Vec<RuleDoc>,
        results: &mut Vec<LoadResult>,
        seen_ids: &mut HashSet<String>,
    ) -> Result<(), RuleError> {
        let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .collect(),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read rules directory");
                return Ok(());
            }
        };
        entries.sort();

        for path in entries {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            if name.starts_with('.') {
                if path.is_file() {
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Skipped {
                            reason: "dotfile".to_string(),
                        },
                    });
                }
                continue;
            }

            if path.is_dir() {
                self.scan_dir(&path, docs, results, seen_ids)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);
            if !is_yaml {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            match Self::load_file(&path) {
                Ok(doc) => {
                    if !seen_ids.insert(doc.id.clone()) {
                        warn!(rule_id = %doc.id, path = %path.display(), "duplicate rule id");
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Failed {
                                error: format!("duplicate rule id '{}'", doc.id),
                            },
                        });
                        continue;
                    }
                    info!(rule_id = %doc.id, path = %path.display(), "loaded rule");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded {
                            rule_id: doc.id.clone(),
                        },
                    });
                    docs.push(doc);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse a single YAML rule file.
    pub fn load_file(path: &Path) -> Result<RuleDoc, RuleError> {
        let contents = fs::read_to_string(path)?;
        let doc: RuleDoc = serde_yaml::from_str(&contents)?;
        if doc.id.is_empty() {
            return Err(RuleError::Validation(
                "rule id must not be empty".to_string(),
            ));
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RULE: &str = r#"
id: watch-feed
title: Watch feed
queries:
  - analyzer: http_feed
    query: "https://feed.example.com/iocs"
"#;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn loads_yaml_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yml", VALID_RULE);
        write(dir.path(), "notes.txt", "not a rule");
        write(dir.path(), ".hidden.yml", VALID_RULE);

        let loader = RuleLoader::new(dir.path());
        let (docs, results) = loader.load_all().unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "watch-feed");
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .any(|r| matches!(&r.status, LoadStatus::Skipped { reason } if reason == "dotfile")));
    }

    #[test]
    fn parse_error_does_not_abort_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.yml", "queries: [not: valid");
        write(dir.path(), "good.yml", VALID_RULE);

        let (docs, results) = RuleLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r.status, LoadStatus::Failed { .. })));
    }

    #[test]
    fn duplicate_ids_fail_the_later_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yml", VALID_RULE);
        write(dir.path(), "b.yml", VALID_RULE);

        let (docs, results) = RuleLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        let failed: Vec<_> = results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].path.ends_with("b.yml"));
    }

    #[test]
    fn scans_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "a.yml", VALID_RULE);

        let (docs, _) = RuleLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(docs.len(), 1);
    }
}
