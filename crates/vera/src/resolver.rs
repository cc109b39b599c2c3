//! Strategy resolver - maps a failing check to a remediation strategy.
//!
//! Primary dispatch is an explicit check-name table; the case-insensitive
//! keyword match over `suspected_component` and `suggested_remedy` is a
//! lower-priority disambiguator kept for checks the table does not name.
//! `None` means manual intervention required - never an error.

use std::collections::HashMap;

use vera_common::{ActionId, FixSeverity, FixStrategy, StrategyKind, Verdict};

pub struct StrategyTable {
    by_check: HashMap<String, StrategyKind>,
    /// Ordered keyword rules; first match wins, so resolution stays
    /// deterministic.
    keyword_rules: Vec<(String, StrategyKind)>,
    strategies: HashMap<StrategyKind, FixStrategy>,
}

impl StrategyTable {
    pub fn empty() -> Self {
        Self {
            by_check: HashMap::new(),
            keyword_rules: Vec::new(),
            strategies: HashMap::new(),
        }
    }

    /// The static table for the builtin platform checks.
    pub fn builtin() -> Self {
        let mut table = Self::empty();

        for strategy in builtin_strategies() {
            table.define(strategy);
        }

        table.map_check("screens-manifest", StrategyKind::ScreenManifestRebuild);
        table.map_check("profile-index", StrategyKind::RegistrationRepair);
        table.map_check("referral-pool", StrategyKind::ReferralRepair);
        table.map_check("payment-gateway", StrategyKind::PaymentConfigRepair);
        table.map_check("otp-pipeline", StrategyKind::OtpPipelineRestart);
        table.map_check("access-rules", StrategyKind::AccessRulesRedeploy);

        table.map_keyword("registration", StrategyKind::RegistrationRepair);
        table.map_keyword("profile", StrategyKind::RegistrationRepair);
        table.map_keyword("referral", StrategyKind::ReferralRepair);
        table.map_keyword("payment", StrategyKind::PaymentConfigRepair);
        table.map_keyword("security", StrategyKind::AccessRulesRedeploy);
        table.map_keyword("access rule", StrategyKind::AccessRulesRedeploy);
        table.map_keyword("screen", StrategyKind::ScreenManifestRebuild);
        table.map_keyword("otp", StrategyKind::OtpPipelineRestart);
        table.map_keyword("session", StrategyKind::SessionCacheReset);

        table
    }

    pub fn define(&mut self, strategy: FixStrategy) {
        self.strategies.insert(strategy.kind, strategy);
    }

    pub fn map_check(&mut self, check_name: impl Into<String>, kind: StrategyKind) {
        self.by_check.insert(check_name.into(), kind);
    }

    pub fn map_keyword(&mut self, keyword: impl Into<String>, kind: StrategyKind) {
        self.keyword_rules.push((keyword.into().to_lowercase(), kind));
    }

    /// Pure lookup. For a fixed `(check_name, suspected_component)` pair the
    /// same strategy is always returned.
    pub fn resolve(&self, check_name: &str, verdict: &Verdict) -> Option<&FixStrategy> {
        if let Some(kind) = self.by_check.get(check_name) {
            return self.strategies.get(kind);
        }

        for haystack in [&verdict.suspected_component, &verdict.suggested_remedy]
            .into_iter()
            .flatten()
        {
            let haystack = haystack.to_lowercase();
            for (keyword, kind) in &self.keyword_rules {
                if haystack.contains(keyword.as_str()) {
                    return self.strategies.get(kind);
                }
            }
        }

        None
    }

    pub fn strategy(&self, kind: StrategyKind) -> Option<&FixStrategy> {
        self.strategies.get(&kind)
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_strategies() -> Vec<FixStrategy> {
    vec![
        FixStrategy {
            kind: StrategyKind::RegistrationRepair,
            description: "Resync the profile index and clear stale sessions".to_string(),
            severity: FixSeverity::Safe,
            actions: vec![ActionId::ResyncProfileIndex, ActionId::ClearSessionCache],
            rollback_actions: vec![ActionId::DropProfileIndexDelta],
        },
        FixStrategy {
            kind: StrategyKind::ReferralRepair,
            description: "Reseed the referral code pool".to_string(),
            severity: FixSeverity::Safe,
            actions: vec![ActionId::ReseedReferralPool],
            rollback_actions: vec![ActionId::RemoveSeededReferralCodes],
        },
        FixStrategy {
            kind: StrategyKind::PaymentConfigRepair,
            description: "Reset the payment gateway to the default configuration".to_string(),
            severity: FixSeverity::Moderate,
            actions: vec![ActionId::ResetPaymentGatewayConfig],
            rollback_actions: vec![ActionId::RestorePaymentGatewayConfig],
        },
        FixStrategy {
            kind: StrategyKind::AccessRulesRedeploy,
            description: "Redeploy the default-deny access rule set".to_string(),
            severity: FixSeverity::Critical,
            actions: vec![ActionId::RedeployAccessRules],
            rollback_actions: vec![ActionId::RestorePreviousAccessRules],
        },
        FixStrategy {
            kind: StrategyKind::ScreenManifestRebuild,
            description: "Rebuild the screen manifest from the core screen list".to_string(),
            severity: FixSeverity::Safe,
            actions: vec![ActionId::RebuildScreenManifest],
            rollback_actions: vec![ActionId::RestoreScreenManifest],
        },
        FixStrategy {
            kind: StrategyKind::OtpPipelineRestart,
            description: "Flush the OTP queue and restart the delivery worker".to_string(),
            severity: FixSeverity::Moderate,
            actions: vec![ActionId::FlushOtpQueue, ActionId::RestartOtpWorker],
            rollback_actions: vec![ActionId::RestartOtpWorker],
        },
        FixStrategy {
            kind: StrategyKind::SessionCacheReset,
            description: "Clear and re-warm the session cache".to_string(),
            severity: FixSeverity::Safe,
            actions: vec![ActionId::ClearSessionCache],
            rollback_actions: vec![ActionId::WarmSessionCache],
        },
    ]
}
