//! Environment lifecycle tests: teardown on every exit path, init-failure
//! reporting, and report completeness on broken runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vera::config::EngineConfig;
use vera::registry::{CheckContext, CheckRegistry, EnvironmentLifecycle};
use vera::remediation::{Engine, RemediationOptions};
use vera::resolver::StrategyTable;
use vera::store::MemoryStore;
use vera::suite::{PhaseDefinition, SuiteDefinition, ENV_INIT_CHECK};
use vera_common::{Outcome, Verdict, VeraError};

struct CountingEnv {
    fail_init: bool,
    init_calls: Arc<AtomicUsize>,
    cleanup_calls: Arc<AtomicUsize>,
}

impl EnvironmentLifecycle for CountingEnv {
    fn initialize(&self) -> Result<(), VeraError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            Err(VeraError::EnvInit("device farm unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn cleanup(&self) {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        check_timeout_secs: 5,
        max_retries: 2,
        retry_delay_ms: 1,
        ..EngineConfig::default()
    }
}

fn engine_with_env(checks: CheckRegistry, env: CountingEnv) -> Engine {
    Engine::new(
        fast_config(),
        checks,
        vera::actions::builtin_registry(),
        StrategyTable::builtin(),
        Box::new(env),
        CheckContext::new(Arc::new(MemoryStore::new()), "/tmp"),
    )
}

fn single_phase(checks: &[&str]) -> SuiteDefinition {
    SuiteDefinition {
        name: "test".to_string(),
        phases: vec![PhaseDefinition {
            name: "only".to_string(),
            checks: checks.iter().map(|s| s.to_string()).collect(),
        }],
        bootstrap_check: None,
    }
}

#[tokio::test]
async fn test_cleanup_runs_once_per_suite_pass() {
    let init_calls = Arc::new(AtomicUsize::new(0));
    let cleanup_calls = Arc::new(AtomicUsize::new(0));

    let mut checks = CheckRegistry::new();
    checks.register("fine", "passes", |_| {
        Box::pin(async { Ok(Verdict::pass("ok")) })
    });

    let env = CountingEnv {
        fail_init: false,
        init_calls: init_calls.clone(),
        cleanup_calls: cleanup_calls.clone(),
    };
    let mut engine = engine_with_env(checks, env);

    let options = RemediationOptions::from_config(&fast_config());
    engine.run_suite(&single_phase(&["fine"]), &options).await;

    // A clean run never re-runs the suite.
    assert_eq!(init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cleanup_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cleanup_runs_even_when_checks_fail() {
    let init_calls = Arc::new(AtomicUsize::new(0));
    let cleanup_calls = Arc::new(AtomicUsize::new(0));

    let mut checks = CheckRegistry::new();
    checks.register("doomed", "fails", |_| {
        Box::pin(async { Ok(Verdict::fail("broken").with_suspected_component("nowhere")) })
    });

    let env = CountingEnv {
        fail_init: false,
        init_calls: init_calls.clone(),
        cleanup_calls: cleanup_calls.clone(),
    };
    let mut engine = engine_with_env(checks, env);

    let mut options = RemediationOptions::from_config(&fast_config());
    options.stop_on_first_failure = true;

    engine.run_suite(&single_phase(&["doomed"]), &options).await;

    // One initial pass plus the final reporting pass; teardown matched
    // init exactly on both.
    assert_eq!(init_calls.load(Ordering::SeqCst), 2);
    assert_eq!(cleanup_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_init_failure_yields_synthetic_verdict_and_cleanup() {
    let init_calls = Arc::new(AtomicUsize::new(0));
    let cleanup_calls = Arc::new(AtomicUsize::new(0));

    let check_calls = Arc::new(AtomicUsize::new(0));
    let mut checks = CheckRegistry::new();
    {
        let calls = check_calls.clone();
        checks.register("never-runs", "unreachable", move |_| {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::pass("ok"))
            })
        });
    }

    let env = CountingEnv {
        fail_init: true,
        init_calls: init_calls.clone(),
        cleanup_calls: cleanup_calls.clone(),
    };
    let mut engine = engine_with_env(checks, env);

    let mut options = RemediationOptions::from_config(&fast_config());
    // Keep the run to a single pass so the synthetic entry is easy to see.
    options.remediation_enabled = false;

    let report = engine
        .run_suite(&single_phase(&["never-runs"]), &options)
        .await;

    // No check ran, but the report still rendered with a synthetic failure.
    assert_eq!(check_calls.load(Ordering::SeqCst), 0);
    let verdict = report.get(ENV_INIT_CHECK).unwrap();
    assert_eq!(verdict.outcome, Outcome::Fail);
    assert_eq!(verdict.suspected_component.as_deref(), Some("environment"));
    assert!(verdict
        .error_detail
        .as_deref()
        .unwrap()
        .contains("device farm unavailable"));
    assert!(report.finished_at.is_some());

    // Teardown still ran.
    assert_eq!(init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cleanup_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_final_report_carries_full_transcript() {
    let mut checks = CheckRegistry::new();
    checks.register("flappy", "fails then keeps failing", |_| {
        Box::pin(async {
            Ok(Verdict::fail("broken").with_suspected_component("antenna"))
        })
    });

    let env = CountingEnv {
        fail_init: false,
        init_calls: Arc::new(AtomicUsize::new(0)),
        cleanup_calls: Arc::new(AtomicUsize::new(0)),
    };
    let mut engine = engine_with_env(checks, env);

    let options = RemediationOptions::from_config(&fast_config());
    let report = engine.run_suite(&single_phase(&["flappy"]), &options).await;

    // The merged transcript includes both suite passes and the fix phase.
    let log = report.log().join("\n");
    assert!(log.contains("fix flappy: skipped"));
    let starts = report
        .log()
        .iter()
        .filter(|l| l.contains("suite test starting"))
        .count();
    assert_eq!(starts, 2);
}
