//! Run a rule set and stream one JSON report line per rule.

use crate::backend::Backend;
use crate::error::Result;
use crate::report::Report;
use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// What to do when a rule's scope or status name does not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMissPolicy {
    /// Stop the run with the lookup error
    #[default]
    Abort,
    /// Log a warning, emit nothing for the rule and continue
    Skip,
}

/// One emitted report line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub scope: String,
    pub status: String,
    pub results: Report,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub evaluated: usize,
    pub skipped: usize,
    pub violations: usize,
}

/// Evaluates every rule of a [`RuleSet`] in order.
#[derive(Debug)]
pub struct RuleSetRunner<'a> {
    rules: &'a RuleSet,
    on_lookup_miss: LookupMissPolicy,
}

impl<'a> RuleSetRunner<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            on_lookup_miss: LookupMissPolicy::default(),
        }
    }

    pub fn on_lookup_miss(mut self, policy: LookupMissPolicy) -> Self {
        self.on_lookup_miss = policy;
        self
    }

    /// Evaluate each rule and write its outcome to `out` as one JSON line,
    /// flushing after every line so earlier results survive a later failure.
    pub async fn run<W: Write + ?Sized>(&self, backend: &dyn Backend, out: &mut W) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for rule in &self.rules.rules {
            let stage = rule.stage();
            let results = match stage.evaluate(backend).await {
                Ok(results) => results,
                Err(e) if e.is_lookup_miss() && self.on_lookup_miss == LookupMissPolicy::Skip => {
                    tracing::warn!(scope = %rule.scope, status = %rule.status, "skipping rule: {}", e);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            summary.evaluated += 1;
            summary.violations += results.violation_count();

            let outcome = RuleOutcome {
                scope: rule.scope.clone(),
                status: rule.status.clone(),
                results,
            };
            serde_json::to_writer(&mut *out, &outcome)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }

        tracing::info!(
            evaluated = summary.evaluated,
            skipped = summary.skipped,
            violations = summary.violations,
            "rule set finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::AuditError;
    use crate::types::{AttributeValue, Item};

    fn backend() -> MemoryBackend {
        let epic = |n: u32, owners: Vec<AttributeValue>| {
            Item::new(format!("Epic:{n}"))
                .with("Name", AttributeValue::text(format!("Epic {n}")))
                .with("Number", AttributeValue::text(format!("E-{n}")))
                .with("Category", AttributeValue::Null)
                .with("Scope", AttributeValue::reference(Item::new("Scope:1")))
                .with("Status", AttributeValue::reference(Item::new("EpicStatus:1")))
                .with("Owners", AttributeValue::List(owners))
        };
        let bob = AttributeValue::reference(
            Item::new("Member:2").with("Name", AttributeValue::text("Bob")),
        );
        MemoryBackend::new()
            .with_scope("S", "Scope:1")
            .with_status("Funnel", "EpicStatus:1")
            .with_epic(epic(1, vec![]))
            .with_epic(epic(2, vec![bob]))
    }

    fn rules(yaml: &str) -> RuleSet {
        RuleSet::from_yaml(yaml).unwrap()
    }

    const ONE_RULE: &str = "rules:\n  - scope: S\n    status: Funnel\n    validations:\n      NotEmpty: [Owners]\n";

    #[tokio::test]
    async fn test_one_line_per_rule() {
        let rules = rules(ONE_RULE);
        let mut out = Vec::new();
        let summary = RuleSetRunner::new(&rules).run(&backend(), &mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"scope\":\"S\",\"status\":\"Funnel\",\"results\":{\"Owners is empty\":[{\"Name\":\"Epic 1\",\"Number\":\"E-1\",\"Category\":null}]}}\n"
        );
        assert_eq!(summary, RunSummary { evaluated: 1, skipped: 0, violations: 1 });
    }

    #[tokio::test]
    async fn test_clean_rule_has_empty_results() {
        let rules = rules("rules:\n  - scope: S\n    status: Funnel\n    validations:\n      NotEmpty: [Name]\n");
        let mut out = Vec::new();
        RuleSetRunner::new(&rules).run(&backend(), &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"scope\":\"S\",\"status\":\"Funnel\",\"results\":{}}\n"
        );
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let rules = rules(ONE_RULE);
        let backend = backend();
        let mut first = Vec::new();
        let mut second = Vec::new();
        RuleSetRunner::new(&rules).run(&backend, &mut first).await.unwrap();
        RuleSetRunner::new(&rules).run(&backend, &mut second).await.unwrap();
        assert_eq!(first, second);
    }

    const MISS_THEN_HIT: &str = "rules:\n  - scope: Missing\n    status: Funnel\n  - scope: S\n    status: Funnel\n    validations:\n      NotEmpty: [Owners]\n";

    #[tokio::test]
    async fn test_lookup_miss_aborts_by_default() {
        let rules = rules(MISS_THEN_HIT);
        let mut out = Vec::new();
        let err = RuleSetRunner::new(&rules).run(&backend(), &mut out).await.unwrap_err();
        assert!(matches!(err, AuditError::ScopeNotFound { .. }));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_miss_skip_continues() {
        let rules = rules(MISS_THEN_HIT);
        let mut out = Vec::new();
        let summary = RuleSetRunner::new(&rules)
            .on_lookup_miss(LookupMissPolicy::Skip)
            .run(&backend(), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("{\"scope\":\"S\""));
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.evaluated, 1);
    }

    #[tokio::test]
    async fn test_earlier_lines_survive_later_failure() {
        let rules = rules("rules:\n  - scope: S\n    status: Funnel\n  - scope: S\n    status: Closed\n");
        let mut out = Vec::new();
        let err = RuleSetRunner::new(&rules).run(&backend(), &mut out).await.unwrap_err();
        assert!(matches!(err, AuditError::StatusNotFound { .. }));
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_policy_serde() {
        let policy: LookupMissPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, LookupMissPolicy::Skip);
        assert_eq!(LookupMissPolicy::default(), LookupMissPolicy::Abort);
    }
}
