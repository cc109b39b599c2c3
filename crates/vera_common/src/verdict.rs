//! Check verdicts - the immutable outcome of a single check invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one check.
///
/// `Pass` and `Warning` both let the suite continue; only `Fail` counts
/// against the failure counter and can stop a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Warning,
}

/// Severity tier attached to a verdict, used to prioritize remediation
/// suggestions in the exported report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Result of one check invocation. Created once, never mutated; a re-run
/// produces a fresh verdict that replaces the old one in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub outcome: Outcome,
    pub message: String,
    pub error_detail: Option<String>,
    /// Component the check suspects is at fault (e.g. "registration/profile").
    /// Matched case-insensitively by the strategy resolver.
    pub suspected_component: Option<String>,
    pub suggested_remedy: Option<String>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(Outcome::Pass, message, Severity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Outcome::Warning, message, Severity::Warning)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(Outcome::Fail, message, Severity::Error)
    }

    fn new(outcome: Outcome, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            outcome,
            message: message.into(),
            error_detail: None,
            suspected_component: None,
            suggested_remedy: None,
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    pub fn with_suspected_component(mut self, component: impl Into<String>) -> Self {
        self.suspected_component = Some(component.into());
        self
    }

    pub fn with_suggested_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.suggested_remedy = Some(remedy.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Whether this verdict blocks the suite. Warnings do not.
    pub fn blocks_suite(&self) -> bool {
        self.outcome == Outcome::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_does_not_block() {
        assert!(!Verdict::pass("ok").blocks_suite());
        assert!(!Verdict::warning("meh").blocks_suite());
        assert!(Verdict::fail("broken").blocks_suite());
    }

    #[test]
    fn test_builder_fields() {
        let v = Verdict::fail("referral pool empty")
            .with_error_detail("key missing")
            .with_suspected_component("referral")
            .with_suggested_remedy("reseed the referral pool");

        assert_eq!(v.outcome, Outcome::Fail);
        assert_eq!(v.severity, Severity::Error);
        assert_eq!(v.error_detail.as_deref(), Some("key missing"));
        assert_eq!(v.suspected_component.as_deref(), Some("referral"));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::Pass).unwrap();
        assert_eq!(json, r#""pass""#);
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, r#""error""#);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
