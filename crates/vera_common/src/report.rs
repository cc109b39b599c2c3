//! Report accumulator - the keyed verdict collection for one orchestrator
//! run, plus its derived statistics and the run transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::strategy::{FixApplicationResult, FixValidationResult, RollbackResult};
use crate::verdict::{Outcome, Verdict};

/// Cached counters over the verdict map. Always recomputable; never the
/// source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounters {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub check: String,
    pub verdict: Verdict,
}

/// Fix, re-validation, and rollback summaries merged into the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationSummary {
    pub fixes: FixApplicationResult,
    pub validation: Option<FixValidationResult>,
    pub rollback: Option<RollbackResult>,
}

/// One run's report. Entries keep execution order; re-running a check
/// overwrites its entry in place instead of appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    entries: Vec<ReportEntry>,
    counters: ReportCounters,
    /// Set by the single designated bootstrap check.
    pub bootstrap_verified: bool,
    log: Vec<String>,
    pub remediation: Option<RemediationSummary>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
            counters: ReportCounters::default(),
            bootstrap_verified: false,
            log: Vec::new(),
            remediation: None,
        }
    }

    /// Record the verdict for a check. Overwrite semantics: a re-run
    /// replaces the old verdict at its original position.
    pub fn add_result(&mut self, check: impl Into<String>, verdict: Verdict) {
        let check = check.into();
        match self.entries.iter_mut().find(|e| e.check == check) {
            Some(entry) => entry.verdict = verdict,
            None => self.entries.push(ReportEntry { check, verdict }),
        }
        self.counters = self.recount();
    }

    pub fn get(&self, check: &str) -> Option<&Verdict> {
        self.entries
            .iter()
            .find(|e| e.check == check)
            .map(|e| &e.verdict)
    }

    /// All entries in execution order.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Failing entries in execution order. Drives the fix phase iteration.
    pub fn failures(&self) -> Vec<&ReportEntry> {
        self.entries
            .iter()
            .filter(|e| e.verdict.outcome == Outcome::Fail)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.counters.failed > 0
    }

    pub fn counters(&self) -> ReportCounters {
        self.counters
    }

    /// Recompute the counters from the verdict map.
    pub fn recount(&self) -> ReportCounters {
        let mut counters = ReportCounters {
            total: self.entries.len(),
            ..ReportCounters::default()
        };
        for entry in &self.entries {
            match entry.verdict.outcome {
                Outcome::Pass => counters.passed += 1,
                Outcome::Fail => counters.failed += 1,
                Outcome::Warning => counters.warned += 1,
            }
        }
        counters
    }

    /// Percentage of passing checks, warnings included in the denominator.
    pub fn pass_rate(&self) -> f64 {
        if self.counters.total == 0 {
            return 0.0;
        }
        (self.counters.passed as f64 / self.counters.total as f64) * 100.0
    }

    pub fn set_bootstrap_verified(&mut self, verified: bool) {
        self.bootstrap_verified = verified;
    }

    /// Append a line to the run transcript.
    pub fn log_line(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Splice an earlier pass's transcript ahead of this report's own log,
    /// so the final report carries the whole run story in order.
    pub fn prepend_log(&mut self, lines: &[String]) {
        let mut merged = lines.to_vec();
        merged.append(&mut self.log);
        self.log = merged;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_track_outcomes() {
        let mut report = Report::new();
        report.add_result("a", Verdict::pass("ok"));
        report.add_result("b", Verdict::fail("broken"));
        report.add_result("c", Verdict::warning("odd"));

        let counters = report.counters();
        assert_eq!(counters.total, 3);
        assert_eq!(counters.passed, 1);
        assert_eq!(counters.failed, 1);
        assert_eq!(counters.warned, 1);
        assert!(report.has_failures());
    }

    #[test]
    fn test_counters_are_recomputable() {
        let mut report = Report::new();
        report.add_result("a", Verdict::pass("ok"));
        report.add_result("b", Verdict::fail("broken"));
        report.add_result("b", Verdict::pass("fixed"));

        assert_eq!(report.counters(), report.recount());
        assert!(!report.has_failures());
    }

    #[test]
    fn test_rerun_overwrites_in_place() {
        let mut report = Report::new();
        report.add_result("a", Verdict::pass("ok"));
        report.add_result("b", Verdict::fail("broken"));
        report.add_result("c", Verdict::pass("ok"));

        // Re-running "b" must not move it to the end.
        report.add_result("b", Verdict::pass("fixed"));

        let order: Vec<&str> = report.entries().iter().map(|e| e.check.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(report.get("b").unwrap().outcome, Outcome::Pass);
        assert_eq!(report.counters().total, 3);
    }

    #[test]
    fn test_failures_keep_execution_order() {
        let mut report = Report::new();
        report.add_result("z-last-name", Verdict::fail("broken"));
        report.add_result("a-first-name", Verdict::fail("broken"));

        let failures: Vec<&str> = report.failures().iter().map(|e| e.check.as_str()).collect();
        assert_eq!(failures, vec!["z-last-name", "a-first-name"]);
    }

    #[test]
    fn test_pass_rate() {
        let mut report = Report::new();
        assert_eq!(report.pass_rate(), 0.0);

        report.add_result("a", Verdict::pass("ok"));
        report.add_result("b", Verdict::fail("broken"));
        assert_eq!(report.pass_rate(), 50.0);
    }

    #[test]
    fn test_transcript_is_ordered() {
        let mut report = Report::new();
        report.log_line("first");
        report.log_line("second");
        assert_eq!(report.log(), &["first".to_string(), "second".to_string()]);
    }
}
