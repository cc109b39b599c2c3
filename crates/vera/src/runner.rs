//! Phase runner - one check invocation under a deadline with bounded retry.
//!
//! The runner is the only place a check result enters the report: exactly
//! one verdict per invocation, overwrite semantics on re-run. A timed-out
//! check future is dropped, not cancelled; a collaborator that cannot be
//! cancelled may keep running in the background.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use vera_common::{Report, Verdict};

use crate::registry::{CheckContext, RegisteredCheck};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PhaseRunner {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for PhaseRunner {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: 3,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl PhaseRunner {
    pub fn new(timeout: Duration, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            timeout,
            // A check always gets at least one attempt.
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Run one check and record its final verdict into the report.
    ///
    /// Timeouts and transient collaborator errors are retried up to
    /// `max_retries` total attempts; structural errors and definitive
    /// verdicts (including `Fail`) are terminal for the invocation.
    pub async fn run(
        &self,
        check: &RegisteredCheck,
        ctx: &CheckContext,
        report: &mut Report,
    ) -> Verdict {
        let name = check.name.as_str();
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            debug!("check {} attempt {}/{}", name, attempt, self.max_retries);

            match timeout(self.timeout, check.invoke(ctx)).await {
                Ok(Ok(verdict)) => {
                    report.log_line(format!(
                        "check {}: {:?} (attempt {})",
                        name, verdict.outcome, attempt
                    ));
                    report.add_result(name, verdict.clone());
                    return verdict;
                }
                Ok(Err(e)) if e.is_transient() && attempt < self.max_retries => {
                    warn!("check {} transient error: {}", name, e);
                    report.log_line(format!("check {}: transient error, retrying: {}", name, e));
                    last_error = e.to_string();
                    sleep(self.retry_delay).await;
                }
                Ok(Err(e)) if e.is_transient() => {
                    last_error = e.to_string();
                }
                Ok(Err(e)) => {
                    // Structural: retrying cannot fix a missing dependency.
                    warn!("check {} structural error: {}", name, e);
                    last_error = e.to_string();
                    break;
                }
                Err(_elapsed) if attempt < self.max_retries => {
                    warn!("check {} timed out after {:?}", name, self.timeout);
                    report.log_line(format!("check {}: timeout, retrying", name));
                    last_error = "timeout".to_string();
                    sleep(self.retry_delay).await;
                }
                Err(_elapsed) => {
                    warn!("check {} timed out on final attempt", name);
                    last_error = "timeout".to_string();
                }
            }
        }

        let verdict = Verdict::fail(format!("check {} did not produce a verdict", name))
            .with_error_detail(last_error)
            .with_suspected_component("task-execution");
        report.log_line(format!("check {}: Fail (attempts exhausted)", name));
        report.add_result(name, verdict.clone());
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CheckRegistry;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use vera_common::{Outcome, VeraError};

    fn test_ctx() -> CheckContext {
        CheckContext::new(Arc::new(MemoryStore::new()), "/tmp")
    }

    fn fast_runner(max_retries: u32) -> PhaseRunner {
        PhaseRunner::new(Duration::from_millis(50), max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_pass_recorded_once() {
        let mut registry = CheckRegistry::new();
        registry.register("ok", "always passes", |_| {
            Box::pin(async { Ok(Verdict::pass("fine")) })
        });

        let mut report = Report::new();
        let verdict = fast_runner(3)
            .run(registry.get("ok").unwrap(), &test_ctx(), &mut report)
            .await;

        assert_eq!(verdict.outcome, Outcome::Pass);
        assert_eq!(report.counters().total, 1);
    }

    #[tokio::test]
    async fn test_fail_verdict_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let mut registry = CheckRegistry::new();
        registry.register("broken", "always fails", move |_| {
            let calls = calls_in.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::fail("definitively broken"))
            })
        });

        let mut report = Report::new();
        let verdict = fast_runner(3)
            .run(registry.get("broken").unwrap(), &test_ctx(), &mut report)
            .await;

        assert_eq!(verdict.outcome, Outcome::Fail);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_attempted_exactly_max_retries_times() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let mut registry = CheckRegistry::new();
        registry.register("hang", "never settles", move |_| {
            let calls = calls_in.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(3600)).await;
                Ok(Verdict::pass("unreachable"))
            })
        });

        let mut report = Report::new();
        let verdict = fast_runner(3)
            .run(registry.get("hang").unwrap(), &test_ctx(), &mut report)
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(verdict.outcome, Outcome::Fail);
        assert_eq!(verdict.error_detail.as_deref(), Some("timeout"));
        assert_eq!(verdict.suspected_component.as_deref(), Some("task-execution"));
        assert_eq!(report.counters().total, 1);
    }

    #[tokio::test]
    async fn test_transient_error_recovers_on_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let mut registry = CheckRegistry::new();
        registry.register("flaky", "fails once then passes", move |_| {
            let calls = calls_in.clone();
            Box::pin(async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(VeraError::Transient("connection reset".into()))
                } else {
                    Ok(Verdict::pass("recovered"))
                }
            })
        });

        let mut report = Report::new();
        let verdict = fast_runner(3)
            .run(registry.get("flaky").unwrap(), &test_ctx(), &mut report)
            .await;

        assert_eq!(verdict.outcome, Outcome::Pass);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_structural_error_never_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let mut registry = CheckRegistry::new();
        registry.register("missing-dep", "structural failure", move |_| {
            let calls = calls_in.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(VeraError::Structural("rules file missing".into()))
            })
        });

        let mut report = Report::new();
        let verdict = fast_runner(5)
            .run(registry.get("missing-dep").unwrap(), &test_ctx(), &mut report)
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(verdict.outcome, Outcome::Fail);
        assert!(verdict.error_detail.unwrap().contains("rules file missing"));
    }

    #[tokio::test]
    async fn test_idempotent_rerun_same_outcome() {
        let mut registry = CheckRegistry::new();
        registry.register("stable", "state-independent", |_| {
            Box::pin(async { Ok(Verdict::pass("steady")) })
        });

        let runner = fast_runner(3);
        let mut report = Report::new();
        let first = runner
            .run(registry.get("stable").unwrap(), &test_ctx(), &mut report)
            .await;
        let second = runner
            .run(registry.get("stable").unwrap(), &test_ctx(), &mut report)
            .await;

        assert_eq!(first.outcome, second.outcome);
        // Re-run overwrote, not appended.
        assert_eq!(report.counters().total, 1);
    }
}
