//! Terminal rendering of a finished report.

use owo_colors::OwoColorize;
use vera_common::{Outcome, Report};

pub fn render_report(report: &Report) -> String {
    let counters = report.counters();
    let mut out = String::new();

    out.push_str(&format!("{}\n", "Validation report".bold()));
    out.push_str(&format!("run {}\n\n", report.run_id.dimmed()));

    for entry in report.entries() {
        let marker = match entry.verdict.outcome {
            Outcome::Pass => format!("{}", "PASS".green()),
            Outcome::Fail => format!("{}", "FAIL".red()),
            Outcome::Warning => format!("{}", "WARN".yellow()),
        };
        out.push_str(&format!(
            "  [{}] {:<20} {}\n",
            marker, entry.check, entry.verdict.message
        ));
        if let Some(detail) = &entry.verdict.error_detail {
            out.push_str(&format!("         {}\n", detail.dimmed()));
        }
    }

    out.push_str(&format!(
        "\n{} passed, {} failed, {} warned of {} ({:.1}%)\n",
        counters.passed.green(),
        counters.failed.red(),
        counters.warned.yellow(),
        counters.total,
        report.pass_rate()
    ));
    out.push_str(&format!(
        "bootstrap verified: {}\n",
        if report.bootstrap_verified {
            format!("{}", "yes".green())
        } else {
            format!("{}", "no".red())
        }
    ));

    if let Some(remediation) = &report.remediation {
        out.push_str(&format!(
            "\nfixes: {} applied, {} failed, {} skipped{}\n",
            remediation.fixes.applied(),
            remediation.fixes.failed(),
            remediation.fixes.skipped(),
            if remediation.fixes.aborted {
                " (halted on critical failure)"
            } else {
                ""
            }
        ));
        if let Some(validation) = &remediation.validation {
            out.push_str(&format!(
                "re-validation: {}/{} passed\n",
                validation.passed(),
                validation.checks.len()
            ));
        }
        if let Some(rollback) = &remediation.rollback {
            out.push_str(&format!(
                "rollback: {} entries, {}\n",
                rollback.attempted(),
                if rollback.all_succeeded() {
                    format!("{}", "all succeeded".green())
                } else {
                    format!("{}", "needs operator attention".red())
                }
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vera_common::Verdict;

    #[test]
    fn test_render_contains_checks_and_counts() {
        let mut report = Report::new();
        report.add_result("store-reachable", Verdict::pass("ok"));
        report.add_result("referral-pool", Verdict::fail("missing"));
        report.finish();

        let rendered = render_report(&report);
        assert!(rendered.contains("store-reachable"));
        assert!(rendered.contains("referral-pool"));
        assert!(rendered.contains("bootstrap verified"));
    }
}
