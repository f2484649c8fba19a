//! Daemon-mode rule scheduling.
//!
//! Tracks when each loaded rule last ran and decides which rules are due
//! on a scheduler tick. Rules with a `schedule` block follow their cron
//! expression (plus optional cooldown); rules without one run on the
//! daemon's default cadence.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::warn;

use crate::schema::RuleDoc;

struct Entry {
    schedule: Option<Schedule>,
    cooldown: Option<Duration>,
    enabled: bool,
    last_triggered: Option<DateTime<Utc>>,
}

/// Scheduling state for all loaded rules.
///
/// Call [`sync`](RuleScheduler::sync) whenever the rule set changes; call
/// [`due`](RuleScheduler::due) from the tick loop and
/// [`record_trigger`](RuleScheduler::record_trigger) after evaluating.
pub struct RuleScheduler {
    entries: HashMap<String, Entry>,
    /// Cadence for rules without a schedule block.
    default_every: Duration,
}

impl RuleScheduler {
    pub fn new(default_every: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_every,
        }
    }

    /// Synchronize entries with the current rule set.
    ///
    /// New rules gain entries, changed rules keep their `last_triggered`,
    /// and entries for removed rules are dropped. An unparseable cron
    /// expression falls back to the default cadence with a warning
    /// (validation reports it as an error upstream).
    pub fn sync(&mut self, docs: &[RuleDoc]) {
        let current: std::collections::HashSet<&str> =
            docs.iter().map(|d| d.id.as_str()).collect();
        self.entries.retain(|id, _| current.contains(id.as_str()));

        for doc in docs {
            let schedule = doc.schedule.as_ref().and_then(|spec| {
                match Schedule::from_str(&normalize_cron(&spec.cron)) {
                    Ok(schedule) => Some(schedule),
                    Err(e) => {
                        warn!(rule_id = %doc.id, cron = %spec.cron, error = %e, "invalid cron expression");
                        None
                    }
                }
            });
            let cooldown = doc
                .schedule
                .as_ref()
                .and_then(|spec| spec.cooldown.as_deref())
                .and_then(parse_duration);

            let last_triggered = self
                .entries
                .get(&doc.id)
                .and_then(|entry| entry.last_triggered);

            self.entries.insert(
                doc.id.clone(),
                Entry {
                    schedule,
                    cooldown,
                    enabled: doc.enabled,
                    last_triggered,
                },
            );
        }
    }

    /// Whether one rule should run at `now`.
    pub fn should_run(&self, rule_id: &str, now: DateTime<Utc>) -> bool {
        let entry = match self.entries.get(rule_id) {
            Some(entry) => entry,
            None => return false,
        };
        if !entry.enabled {
            return false;
        }

        if let (Some(cooldown), Some(last)) = (entry.cooldown, entry.last_triggered) {
            let elapsed = now.signed_duration_since(last);
            if elapsed < chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::zero()) {
                return false;
            }
        }

        match &entry.schedule {
            // Due when a scheduled tick falls after the last run (or within
            // the past day for a never-run rule) and at or before now.
            Some(schedule) => {
                let from = entry
                    .last_triggered
                    .unwrap_or(now - chrono::Duration::days(1));
                schedule.after(&from).next().is_some_and(|next| next <= now)
            }
            // Default cadence: due when the cadence has elapsed.
            None => match entry.last_triggered {
                Some(last) => {
                    now.signed_duration_since(last)
                        >= chrono::Duration::from_std(self.default_every)
                            .unwrap_or_else(|_| chrono::Duration::zero())
                }
                None => true,
            },
        }
    }

    /// IDs of all rules due at `now`, sorted for deterministic dispatch.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<&str> {
        let mut due: Vec<&str> = self
            .entries
            .keys()
            .filter(|id| self.should_run(id, now))
            .map(String::as_str)
            .collect();
        due.sort_unstable();
        due
    }

    /// Record that a rule was triggered now.
    pub fn record_trigger(&mut self, rule_id: &str) {
        self.record_trigger_at(rule_id, Utc::now());
    }

    /// Record a trigger at a specific instant (testing and replay).
    pub fn record_trigger_at(&mut self, rule_id: &str, at: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(rule_id) {
            entry.last_triggered = Some(at);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalize a 5-field cron expression to the 6-field form the `cron`
/// crate expects, by prepending a seconds field.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Parse a compact duration string such as "90s", "30m", "2h30m", "7d".
///
/// A bare number is treated as seconds. Returns `None` for empty or
/// malformed input.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total_secs = 0u64;
    let mut value = 0u64;
    let mut pending_digits = false;
    let mut saw_unit = false;

    for ch in s.chars() {
        if let Some(digit) = ch.to_digit(10) {
            value = value * 10 + u64::from(digit);
            pending_digits = true;
        } else {
            if !pending_digits {
                return None;
            }
            let unit_secs = match ch {
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                _ => return None,
            };
            total_secs += value * unit_secs;
            value = 0;
            pending_digits = false;
            saw_unit = true;
        }
    }

    if pending_digits {
        // Trailing digits after a unit ("30m15") are ambiguous.
        if saw_unit {
            return None;
        }
        total_secs += value;
    }

    if total_secs == 0 && !saw_unit {
        return None;
    }
    Some(Duration::from_secs(total_secs))
}
