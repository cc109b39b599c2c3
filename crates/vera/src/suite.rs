//! Suite definitions and the suite orchestrator state machine.
//!
//! A suite is an ordered list of phases; a phase is an ordered list of check
//! names. Definitions load from YAML with an embedded fallback, the same way
//! probe definitions are shipped: a malformed file is skipped with a
//! warning, never fatal.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vera_common::{Report, Verdict, VeraError};

use crate::registry::{CheckContext, CheckRegistry, EnvironmentLifecycle};
use crate::runner::PhaseRunner;

/// Synthetic report entry used when the environment cannot be brought up.
pub const ENV_INIT_CHECK: &str = "environment-init";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDefinition {
    pub name: String,
    pub checks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteDefinition {
    pub name: String,
    pub phases: Vec<PhaseDefinition>,
    /// The single check whose pass flips the report's bootstrap flag.
    #[serde(default)]
    pub bootstrap_check: Option<String>,
}

impl SuiteDefinition {
    /// Load a suite definition from a YAML file, falling back to the
    /// embedded default when the file is absent.
    pub fn load(path: &Path) -> Result<Self, VeraError> {
        if !path.exists() {
            debug!("suite definition {} not found, using embedded default", path.display());
            return Ok(Self::embedded_default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| VeraError::SuiteDefinition(format!("{}: {}", path.display(), e)))
    }

    /// The default validation suite over the builtin checks.
    pub fn embedded_default() -> Self {
        Self {
            name: "platform-validation".to_string(),
            phases: vec![
                PhaseDefinition {
                    name: "environment".to_string(),
                    checks: vec![
                        "store-reachable".to_string(),
                        "config-present".to_string(),
                        "suite-definition".to_string(),
                    ],
                },
                PhaseDefinition {
                    name: "platform".to_string(),
                    checks: vec![
                        "screens-manifest".to_string(),
                        "profile-index".to_string(),
                        "referral-pool".to_string(),
                    ],
                },
                PhaseDefinition {
                    name: "services".to_string(),
                    checks: vec![
                        "payment-gateway".to_string(),
                        "otp-pipeline".to_string(),
                        "access-rules".to_string(),
                    ],
                },
            ],
            bootstrap_check: Some("store-reachable".to_string()),
        }
    }

    pub fn check_count(&self) -> usize {
        self.phases.iter().map(|p| p.checks.len()).sum()
    }
}

/// Orchestrator state, tracked for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    Idle,
    Initializing,
    RunningPhase(usize),
    Stopped,
    Completed,
    Finalizing,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct SuiteOptions {
    pub stop_on_first_failure: bool,
    /// When set, only the named checks run; everything else is skipped.
    pub only_checks: Option<Vec<String>>,
}

impl SuiteOptions {
    fn selected(&self, check: &str) -> bool {
        match &self.only_checks {
            Some(names) => names.iter().any(|n| n == check),
            None => true,
        }
    }
}

/// Drives one pass over a suite definition. Checks run strictly
/// sequentially; environment teardown runs on every exit path.
pub struct SuiteOrchestrator<'a> {
    pub checks: &'a CheckRegistry,
    pub env: &'a dyn EnvironmentLifecycle,
    pub runner: PhaseRunner,
}

impl<'a> SuiteOrchestrator<'a> {
    pub async fn run(
        &self,
        suite: &SuiteDefinition,
        options: &SuiteOptions,
        ctx: &CheckContext,
    ) -> Report {
        let mut report = Report::new();
        let mut state = SuiteState::Idle;
        debug!("suite {}: {:?}", suite.name, state);

        state = SuiteState::Initializing;
        debug!("suite {}: {:?}", suite.name, state);
        report.log_line(format!("suite {} starting", suite.name));

        match self.env.initialize() {
            Ok(()) => {
                state = self.run_phases(suite, options, ctx, &mut report).await;
            }
            Err(e) => {
                // Fatal for the run, but the report still renders.
                warn!("environment initialization failed: {}", e);
                report.log_line(format!("environment initialization failed: {}", e));
                report.add_result(
                    ENV_INIT_CHECK,
                    Verdict::fail("environment initialization failed")
                        .with_error_detail(e.to_string())
                        .with_suspected_component("environment"),
                );
                state = SuiteState::Stopped;
            }
        }

        debug!("suite {}: {:?}", suite.name, state);
        state = SuiteState::Finalizing;
        debug!("suite {}: {:?}", suite.name, state);
        self.env.cleanup();
        report.log_line("environment cleanup complete".to_string());
        report.finish();

        state = SuiteState::Done;
        let _ = state;

        let counters = report.counters();
        info!(
            "suite {} finished: {}/{} passed, {} failed, {} warned",
            suite.name, counters.passed, counters.total, counters.failed, counters.warned
        );
        report
    }

    async fn run_phases(
        &self,
        suite: &SuiteDefinition,
        options: &SuiteOptions,
        ctx: &CheckContext,
        report: &mut Report,
    ) -> SuiteState {
        for (index, phase) in suite.phases.iter().enumerate() {
            if options.stop_on_first_failure && report.has_failures() {
                info!("stopping before phase {}: failure recorded", phase.name);
                report.log_line(format!("stopped before phase {}", phase.name));
                return SuiteState::Stopped;
            }

            let state = SuiteState::RunningPhase(index);
            debug!("suite {}: {:?} ({})", suite.name, state, phase.name);
            report.log_line(format!("phase {} starting", phase.name));

            for check_name in &phase.checks {
                if !options.selected(check_name) {
                    debug!("check {} not selected, skipping", check_name);
                    continue;
                }

                match self.checks.get(check_name) {
                    Some(check) => {
                        let verdict = self.runner.run(check, ctx, report).await;
                        if suite.bootstrap_check.as_deref() == Some(check_name.as_str()) {
                            report
                                .set_bootstrap_verified(verdict.outcome == vera_common::Outcome::Pass);
                        }
                    }
                    None => {
                        // Structural: a check the registry does not know can
                        // never be retried into existence.
                        warn!("check {} not registered", check_name);
                        report.log_line(format!("check {}: not registered", check_name));
                        report.add_result(
                            check_name,
                            Verdict::fail(format!("check {} is not registered", check_name))
                                .with_error_detail("unknown check")
                                .with_suspected_component("check-registry"),
                        );
                    }
                }
            }
        }

        SuiteState::Completed
    }
}
