//! Remediation loop - the top-level engine sequence.
//!
//! Run the suite; resolve and apply fixes for the failures; re-validate the
//! checks whose fixes succeeded; roll back when re-validation is not
//! unanimous; run the suite once more for the final report. All shared
//! mutable state (report, ledger, backups) lives here and is touched from a
//! single logical thread.

use chrono::Utc;
use tracing::{info, warn};
use vera_common::{
    FixApplicationResult, FixAttempt, FixAttemptStatus, FixOperation, FixSeverity,
    FixValidationResult, RemediationSummary, Report, RevalidatedCheck, RollbackResult, Verdict,
};

use crate::backup::BackupManager;
use crate::config::EngineConfig;
use crate::executor::FixExecutor;
use crate::registry::{ActionRegistry, CheckContext, CheckRegistry, EnvironmentLifecycle};
use crate::resolver::StrategyTable;
use crate::suite::{SuiteDefinition, SuiteOptions, SuiteOrchestrator};

/// Per-run switches. Defaults come from the engine config; the CLI can
/// override each one.
#[derive(Debug, Clone)]
pub struct RemediationOptions {
    pub enable_retries: bool,
    pub stop_on_first_failure: bool,
    pub only_checks: Option<Vec<String>>,
    /// Off means validate-only: no fix phase at all.
    pub remediation_enabled: bool,
    pub dry_run: bool,
    pub backup_enabled: bool,
    pub rollback_enabled: bool,
    /// Pinned policy decision: a pre-existing failure that was never fixed
    /// only forces a rollback of unrelated successful fixes when this is
    /// set.
    pub rollback_on_unrelated_failure: bool,
}

impl RemediationOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            enable_retries: true,
            stop_on_first_failure: config.stop_on_first_failure,
            only_checks: None,
            remediation_enabled: config.remediation.enabled,
            dry_run: config.remediation.dry_run,
            backup_enabled: config.remediation.backup_enabled,
            rollback_enabled: config.remediation.rollback_enabled,
            rollback_on_unrelated_failure: config.remediation.rollback_on_unrelated_failure,
        }
    }
}

/// The orchestrator engine. Owns the registries, the strategy table, the
/// fix ledger, and the backup records.
pub struct Engine {
    config: EngineConfig,
    checks: CheckRegistry,
    actions: ActionRegistry,
    strategies: StrategyTable,
    env: Box<dyn EnvironmentLifecycle>,
    ctx: CheckContext,
    ledger: Vec<FixOperation>,
    backups: BackupManager,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        checks: CheckRegistry,
        actions: ActionRegistry,
        strategies: StrategyTable,
        env: Box<dyn EnvironmentLifecycle>,
        ctx: CheckContext,
    ) -> Self {
        Self {
            config,
            checks,
            actions,
            strategies,
            env,
            ctx,
            ledger: Vec::new(),
            backups: BackupManager::new(),
        }
    }

    pub fn checks(&self) -> &CheckRegistry {
        &self.checks
    }

    pub fn ledger(&self) -> &[FixOperation] {
        &self.ledger
    }

    /// Run the full validation and remediation sequence, returning the
    /// final report with the fix, re-validation, and rollback summaries
    /// merged in.
    pub async fn run_suite(
        &mut self,
        suite: &SuiteDefinition,
        options: &RemediationOptions,
    ) -> Report {
        // Fresh run: whatever a previous run left behind is stale.
        self.ledger.clear();
        self.backups.clear();

        let suite_options = SuiteOptions {
            stop_on_first_failure: options.stop_on_first_failure,
            only_checks: options.only_checks.clone(),
        };

        let orchestrator = SuiteOrchestrator {
            checks: &self.checks,
            env: self.env.as_ref(),
            runner: self.config.runner(options.enable_retries),
        };
        let mut report = orchestrator.run(suite, &suite_options, &self.ctx).await;

        if !report.has_failures() {
            info!("no failures, remediation not needed");
            return report;
        }
        if !options.remediation_enabled {
            info!("remediation disabled, reporting failures as-is");
            return report;
        }

        let fixes = self.apply_fixes(&mut report, options).await;
        let validation = self.revalidate(&mut report, options).await;

        let revalidation_failed = validation
            .as_ref()
            .map(|v| !v.all_succeeded())
            .unwrap_or(false);
        let unresolved = fixes.failed() + fixes.skipped() > 0;
        let rollback_needed = !options.dry_run
            && options.rollback_enabled
            && (revalidation_failed || (options.rollback_on_unrelated_failure && unresolved));

        let rollback = if rollback_needed {
            warn!("re-validation incomplete, rolling back applied fixes");
            report.log_line("rolling back applied fixes".to_string());
            Some(
                self.backups
                    .rollback_all(&mut self.ledger, &self.actions, &self.ctx)
                    .await,
            )
        } else {
            None
        };

        // Final pass for the exported report.
        let orchestrator = SuiteOrchestrator {
            checks: &self.checks,
            env: self.env.as_ref(),
            runner: self.config.runner(options.enable_retries),
        };
        let mut final_report = orchestrator.run(suite, &suite_options, &self.ctx).await;
        final_report.prepend_log(report.log());
        final_report.remediation = Some(RemediationSummary {
            fixes,
            validation,
            rollback,
        });
        final_report
    }

    /// Out-of-band emergency reversal of everything in the ledger.
    pub async fn rollback_all(&mut self) -> RollbackResult {
        self.backups
            .rollback_all(&mut self.ledger, &self.actions, &self.ctx)
            .await
    }

    /// Resolve and apply a fix for each failing report entry, in report
    /// insertion order.
    async fn apply_fixes(
        &mut self,
        report: &mut Report,
        options: &RemediationOptions,
    ) -> FixApplicationResult {
        let failures: Vec<(String, Verdict)> = report
            .failures()
            .iter()
            .map(|e| (e.check.clone(), e.verdict.clone()))
            .collect();

        info!("fix phase: {} failing check(s)", failures.len());

        let mut fixes = FixApplicationResult::default();
        let executor = FixExecutor::new(&self.actions);

        for (check_name, verdict) in &failures {
            let strategy = match self.strategies.resolve(check_name, verdict) {
                Some(strategy) => strategy,
                None => {
                    info!("no strategy for {}, skipping", check_name);
                    report.log_line(format!(
                        "fix {}: skipped, manual intervention required",
                        check_name
                    ));
                    fixes.attempts.push(FixAttempt {
                        check_name: check_name.clone(),
                        strategy_kind: None,
                        status: FixAttemptStatus::Skipped,
                        detail: Some("manual intervention required".to_string()),
                    });
                    continue;
                }
            };

            if options.dry_run {
                report.log_line(format!(
                    "fix {}: dry run, would apply {}",
                    check_name, strategy.kind
                ));
                fixes.attempts.push(FixAttempt {
                    check_name: check_name.clone(),
                    strategy_kind: Some(strategy.kind),
                    status: FixAttemptStatus::Planned,
                    detail: Some(strategy.description.clone()),
                });
                continue;
            }

            let outcome = executor
                .apply(
                    check_name,
                    strategy,
                    options.backup_enabled,
                    &mut self.backups,
                    &self.ctx,
                )
                .await;

            if outcome.success {
                report.log_line(format!("fix {}: applied {}", check_name, strategy.kind));
                self.ledger.push(FixOperation {
                    check_name: check_name.clone(),
                    strategy: strategy.clone(),
                    applied_at: Utc::now(),
                    backup_handle: outcome.backup_handle,
                });
                fixes.attempts.push(FixAttempt {
                    check_name: check_name.clone(),
                    strategy_kind: Some(strategy.kind),
                    status: FixAttemptStatus::Applied,
                    detail: None,
                });
            } else {
                report.log_line(format!(
                    "fix {}: {} failed ({})",
                    check_name,
                    strategy.kind,
                    outcome.error_detail.as_deref().unwrap_or("unknown")
                ));
                fixes.attempts.push(FixAttempt {
                    check_name: check_name.clone(),
                    strategy_kind: Some(strategy.kind),
                    status: FixAttemptStatus::Failed,
                    detail: outcome.error_detail,
                });

                if strategy.severity == FixSeverity::Critical {
                    // Security-critical failures halt automated remediation
                    // for the rest of the run; applied fixes stay in place.
                    warn!(
                        "critical strategy {} failed for {}, halting fix phase",
                        strategy.kind, check_name
                    );
                    report.log_line("fix phase halted on critical failure".to_string());
                    fixes.aborted = true;
                    break;
                }
            }
        }

        fixes
    }

    /// Re-run exactly the checks whose fixes succeeded, single attempt each.
    async fn revalidate(
        &mut self,
        report: &mut Report,
        options: &RemediationOptions,
    ) -> Option<FixValidationResult> {
        if options.dry_run || self.ledger.is_empty() {
            return None;
        }

        info!("re-validating {} fixed check(s)", self.ledger.len());
        let runner = self.config.runner(false);
        let mut validation = FixValidationResult::default();

        for operation in &self.ledger {
            match self.checks.get(&operation.check_name) {
                Some(check) => {
                    let verdict = runner.run(check, &self.ctx, report).await;
                    validation.checks.push(RevalidatedCheck {
                        check_name: operation.check_name.clone(),
                        outcome: verdict.outcome,
                    });
                }
                None => {
                    // Fixed via keyword match but since unregistered; treat
                    // as a failed re-validation rather than guessing.
                    warn!("cannot re-validate unknown check {}", operation.check_name);
                    validation.checks.push(RevalidatedCheck {
                        check_name: operation.check_name.clone(),
                        outcome: vera_common::Outcome::Fail,
                    });
                }
            }
        }

        Some(validation)
    }
}
