//! Report export surface - pure projections of a finished report.
//!
//! Three artifacts: a structured JSON export for programmatic consumers, a
//! narrative execution-log document, and a prioritized remediation
//! suggestions document. None of them carries information the report does
//! not already contain.

use serde_json::json;

use crate::report::Report;
use crate::verdict::{Outcome, Severity};

/// Structured key/value export: counts, per-check verdicts, and the failure
/// list with remedies.
pub fn structured(report: &Report) -> serde_json::Value {
    let counters = report.counters();

    let failures: Vec<serde_json::Value> = report
        .failures()
        .iter()
        .map(|entry| {
            json!({
                "check": entry.check,
                "message": entry.verdict.message,
                "error_detail": entry.verdict.error_detail,
                "suspected_component": entry.verdict.suspected_component,
                "suggested_remedy": entry.verdict.suggested_remedy,
                "severity": entry.verdict.severity,
            })
        })
        .collect();

    json!({
        "run_id": report.run_id,
        "started_at": report.started_at,
        "finished_at": report.finished_at,
        "bootstrap_verified": report.bootstrap_verified,
        "counters": counters,
        "pass_rate": report.pass_rate(),
        "checks": report.entries(),
        "failures": failures,
        "remediation": report.remediation,
    })
}

/// Narrative document: the structured summary rendered as text, followed by
/// the literal ordered transcript of log lines.
pub fn narrative(report: &Report) -> String {
    let counters = report.counters();
    let mut doc = String::new();

    doc.push_str(&format!("# Validation run {}\n\n", report.run_id));
    doc.push_str(&format!("Started:  {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        doc.push_str(&format!("Finished: {}\n", finished.to_rfc3339()));
    }
    doc.push_str(&format!(
        "Checks: {} total, {} passed, {} failed, {} warned ({:.1}% pass rate)\n",
        counters.total,
        counters.passed,
        counters.failed,
        counters.warned,
        report.pass_rate()
    ));
    doc.push_str(&format!(
        "Bootstrap verified: {}\n\n",
        if report.bootstrap_verified { "yes" } else { "no" }
    ));

    doc.push_str("## Results\n\n");
    for entry in report.entries() {
        let marker = match entry.verdict.outcome {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Warning => "WARN",
        };
        doc.push_str(&format!("[{}] {}: {}\n", marker, entry.check, entry.verdict.message));
        if let Some(detail) = &entry.verdict.error_detail {
            doc.push_str(&format!("       detail: {}\n", detail));
        }
    }

    if let Some(remediation) = &report.remediation {
        doc.push_str("\n## Remediation\n\n");
        doc.push_str(&format!(
            "Fixes: {} attempted, {} applied, {} failed, {} skipped{}\n",
            remediation.fixes.attempted(),
            remediation.fixes.applied(),
            remediation.fixes.failed(),
            remediation.fixes.skipped(),
            if remediation.fixes.aborted {
                " (aborted on critical failure)"
            } else {
                ""
            }
        ));
        if let Some(validation) = &remediation.validation {
            doc.push_str(&format!(
                "Re-validation: {} passed, {} failed\n",
                validation.passed(),
                validation.failed()
            ));
        }
        if let Some(rollback) = &remediation.rollback {
            doc.push_str(&format!(
                "Rollback: {} entries, all succeeded: {}\n",
                rollback.attempted(),
                rollback.all_succeeded()
            ));
        }
    }

    doc.push_str("\n## Execution log\n\n");
    for line in report.log() {
        doc.push_str(line);
        doc.push('\n');
    }

    doc
}

/// Remediation suggestions: unresolved failures grouped by severity tier,
/// highest first.
pub fn suggestions(report: &Report) -> String {
    let mut doc = String::new();
    doc.push_str("# Remediation suggestions\n");

    let failures = report.failures();
    if failures.is_empty() {
        doc.push_str("\nNo unresolved failures.\n");
        return doc;
    }

    for severity in [Severity::Error, Severity::Warning, Severity::Info] {
        let tier: Vec<_> = failures
            .iter()
            .filter(|e| e.verdict.severity == severity)
            .collect();
        if tier.is_empty() {
            continue;
        }

        let heading = match severity {
            Severity::Error => "Critical",
            Severity::Warning => "Moderate",
            Severity::Info => "Informational",
        };
        doc.push_str(&format!("\n## {} ({})\n\n", heading, tier.len()));

        for (i, entry) in tier.iter().enumerate() {
            doc.push_str(&format!("{}. {}: {}\n", i + 1, entry.check, entry.verdict.message));
            if let Some(component) = &entry.verdict.suspected_component {
                doc.push_str(&format!("   component: {}\n", component));
            }
            match &entry.verdict.suggested_remedy {
                Some(remedy) => doc.push_str(&format!("   remedy: {}\n", remedy)),
                None => doc.push_str("   remedy: manual intervention required\n"),
            }
        }
    }

    doc
}
