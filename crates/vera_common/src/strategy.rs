//! Fix strategies, the closed action vocabulary, and the remediation ledger
//! record types.
//!
//! Actions are a closed enum rather than free-form strings so the action
//! table can be checked for exhaustiveness at compile time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verdict::Outcome;

/// Every repair and rollback action the engine knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionId {
    ClearSessionCache,
    WarmSessionCache,
    ReseedReferralPool,
    RemoveSeededReferralCodes,
    ResetPaymentGatewayConfig,
    RestorePaymentGatewayConfig,
    RedeployAccessRules,
    RestorePreviousAccessRules,
    RebuildScreenManifest,
    RestoreScreenManifest,
    ResyncProfileIndex,
    DropProfileIndexDelta,
    FlushOtpQueue,
    RestartOtpWorker,
}

impl ActionId {
    /// The full action vocabulary, used to build the dispatch table at
    /// startup.
    pub const ALL: [ActionId; 14] = [
        ActionId::ClearSessionCache,
        ActionId::WarmSessionCache,
        ActionId::ReseedReferralPool,
        ActionId::RemoveSeededReferralCodes,
        ActionId::ResetPaymentGatewayConfig,
        ActionId::RestorePaymentGatewayConfig,
        ActionId::RedeployAccessRules,
        ActionId::RestorePreviousAccessRules,
        ActionId::RebuildScreenManifest,
        ActionId::RestoreScreenManifest,
        ActionId::ResyncProfileIndex,
        ActionId::DropProfileIndexDelta,
        ActionId::FlushOtpQueue,
        ActionId::RestartOtpWorker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionId::ClearSessionCache => "clear-session-cache",
            ActionId::WarmSessionCache => "warm-session-cache",
            ActionId::ReseedReferralPool => "reseed-referral-pool",
            ActionId::RemoveSeededReferralCodes => "remove-seeded-referral-codes",
            ActionId::ResetPaymentGatewayConfig => "reset-payment-gateway-config",
            ActionId::RestorePaymentGatewayConfig => "restore-payment-gateway-config",
            ActionId::RedeployAccessRules => "redeploy-access-rules",
            ActionId::RestorePreviousAccessRules => "restore-previous-access-rules",
            ActionId::RebuildScreenManifest => "rebuild-screen-manifest",
            ActionId::RestoreScreenManifest => "restore-screen-manifest",
            ActionId::ResyncProfileIndex => "resync-profile-index",
            ActionId::DropProfileIndexDelta => "drop-profile-index-delta",
            ActionId::FlushOtpQueue => "flush-otp-queue",
            ActionId::RestartOtpWorker => "restart-otp-worker",
        }
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named remediation strategy families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    RegistrationRepair,
    ReferralRepair,
    PaymentConfigRepair,
    AccessRulesRedeploy,
    ScreenManifestRebuild,
    OtpPipelineRestart,
    SessionCacheReset,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategyKind::RegistrationRepair => "registration-repair",
            StrategyKind::ReferralRepair => "referral-repair",
            StrategyKind::PaymentConfigRepair => "payment-config-repair",
            StrategyKind::AccessRulesRedeploy => "access-rules-redeploy",
            StrategyKind::ScreenManifestRebuild => "screen-manifest-rebuild",
            StrategyKind::OtpPipelineRestart => "otp-pipeline-restart",
            StrategyKind::SessionCacheReset => "session-cache-reset",
        };
        f.write_str(s)
    }
}

/// How invasive a strategy is. A failing `Critical` strategy halts further
/// automated remediation for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSeverity {
    Safe,
    Moderate,
    Critical,
}

/// An ordered repair action list with its paired rollback list.
///
/// Invariant: a strategy that mutates shared state must carry a non-empty
/// rollback list if rollback is ever enabled for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixStrategy {
    pub kind: StrategyKind,
    pub description: String,
    pub severity: FixSeverity,
    pub actions: Vec<ActionId>,
    pub rollback_actions: Vec<ActionId>,
}

/// Result of applying one strategy's action list.
///
/// `applied_actions` records only the prefix that completed successfully;
/// the action that broke the run, if any, is named in `error_detail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixOutcome {
    pub success: bool,
    pub applied_actions: Vec<ActionId>,
    pub error_detail: Option<String>,
    pub backup_handle: Option<String>,
}

/// Ledger record created only after every action of a strategy succeeded.
/// Consumed most-recent-first by rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixOperation {
    pub check_name: String,
    pub strategy: FixStrategy,
    pub applied_at: DateTime<Utc>,
    pub backup_handle: Option<String>,
}

/// Lightweight pre-fix marker. At most one live record per check name; a
/// second backup for the same check overwrites the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub handle: String,
    pub strategy_kind: StrategyKind,
    pub created_at: DateTime<Utc>,
}

/// What happened to one failing check during the fix phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixAttemptStatus {
    /// All actions succeeded and a ledger entry was recorded.
    Applied,
    /// An action failed part-way; nothing was recorded for rollback.
    Failed,
    /// No strategy matched - manual intervention required.
    Skipped,
    /// Dry run: strategy resolved but not executed.
    Planned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixAttempt {
    pub check_name: String,
    pub strategy_kind: Option<StrategyKind>,
    pub status: FixAttemptStatus,
    pub detail: Option<String>,
}

/// Aggregation view over the fix phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixApplicationResult {
    pub attempts: Vec<FixAttempt>,
    /// Set when a Critical strategy failed and the remaining fix attempts
    /// for the run were abandoned.
    pub aborted: bool,
}

impl FixApplicationResult {
    pub fn attempted(&self) -> usize {
        self.attempts.len()
    }

    pub fn applied(&self) -> usize {
        self.count(FixAttemptStatus::Applied)
    }

    pub fn failed(&self) -> usize {
        self.count(FixAttemptStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(FixAttemptStatus::Skipped)
    }

    pub fn all_succeeded(&self) -> bool {
        self.attempts
            .iter()
            .all(|a| a.status == FixAttemptStatus::Applied)
    }

    fn count(&self, status: FixAttemptStatus) -> usize {
        self.attempts.iter().filter(|a| a.status == status).count()
    }
}

/// One re-validation result for a check whose fix succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidatedCheck {
    pub check_name: String,
    pub outcome: Outcome,
}

/// Aggregation view over the post-fix re-validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixValidationResult {
    pub checks: Vec<RevalidatedCheck>,
}

impl FixValidationResult {
    pub fn passed(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.outcome == Outcome::Pass)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.checks.len() - self.passed()
    }

    /// Unanimous pass over every re-validated check.
    pub fn all_succeeded(&self) -> bool {
        self.checks.iter().all(|c| c.outcome == Outcome::Pass)
    }
}

/// One ledger entry's rollback outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackEntry {
    pub check_name: String,
    pub strategy_kind: StrategyKind,
    pub succeeded: bool,
}

/// Aggregation view over a rollback pass. A failed entry never aborts the
/// remaining entries; it only shows up here as `succeeded == false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackResult {
    pub entries: Vec<RollbackEntry>,
}

impl RollbackResult {
    pub fn attempted(&self) -> usize {
        self.entries.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|e| e.succeeded)
    }
}
