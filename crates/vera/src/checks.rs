//! Builtin platform checks.
//!
//! These cover the engine's own workspace: config and suite definition
//! integrity plus the backing-store keys the repair actions maintain. Domain
//! checks (phone formats, referral alphabets, OTP delivery and the like) are
//! owned by their services and registered by the embedding on top of these.

use vera_common::{Verdict, VeraError};

use crate::actions::keys;
use crate::config::{CONFIG_FILE, SUITE_FILE};
use crate::registry::{CheckContext, CheckRegistry};
use crate::suite::SuiteDefinition;

/// Register the builtin check set.
pub fn register_builtin(registry: &mut CheckRegistry) {
    registry.register(
        "store-reachable",
        "Backing store accepts a write/read/delete round trip",
        |ctx| Box::pin(store_reachable(ctx)),
    );
    registry.register(
        "config-present",
        "Engine config file exists and parses",
        |ctx| Box::pin(config_present(ctx)),
    );
    registry.register(
        "suite-definition",
        "Suite definition file parses",
        |ctx| Box::pin(suite_definition(ctx)),
    );
    registry.register(
        "screens-manifest",
        "Screen manifest is present in the store",
        |ctx| {
            Box::pin(store_key_present(
                ctx,
                keys::SCREEN_MANIFEST,
                "screen manifest present",
                "screen manifest missing",
                "screens",
                "rebuild the screen manifest",
            ))
        },
    );
    registry.register(
        "profile-index",
        "Profile index is present in the store",
        |ctx| {
            Box::pin(store_key_present(
                ctx,
                keys::PROFILE_INDEX,
                "profile index present",
                "profile index missing",
                "registration/profile",
                "resync the profile index",
            ))
        },
    );
    registry.register(
        "referral-pool",
        "Referral code pool is seeded",
        |ctx| {
            Box::pin(store_key_present(
                ctx,
                keys::REFERRAL_POOL,
                "referral pool seeded",
                "referral pool missing or empty",
                "referral",
                "reseed the referral pool",
            ))
        },
    );
    registry.register(
        "payment-gateway",
        "Payment gateway configuration is present",
        |ctx| {
            Box::pin(store_key_present(
                ctx,
                keys::PAYMENT_GATEWAY,
                "payment gateway configured",
                "payment gateway configuration missing",
                "payment",
                "reset the payment gateway configuration",
            ))
        },
    );
    registry.register(
        "otp-pipeline",
        "OTP delivery worker has checked in",
        |ctx| {
            Box::pin(store_key_present(
                ctx,
                keys::OTP_WORKER,
                "OTP worker alive",
                "OTP worker has not checked in",
                "otp",
                "restart the OTP worker",
            ))
        },
    );
    registry.register(
        "access-rules",
        "Access rule set is deployed",
        |ctx| {
            Box::pin(store_key_present(
                ctx,
                keys::ACCESS_RULES,
                "access rules deployed",
                "access rule set missing",
                "security",
                "redeploy the access rule set",
            ))
        },
    );
}

/// The designated bootstrap check: proves the backing store answers a full
/// round trip before anything else is trusted.
async fn store_reachable(ctx: CheckContext) -> Result<Verdict, VeraError> {
    let probe_value = "ok";
    if let Err(e) = ctx.store.write(keys::HEALTH_PROBE, probe_value) {
        return Ok(Verdict::fail("backing store rejected probe write")
            .with_error_detail(e.to_string())
            .with_suspected_component("data-store")
            .with_suggested_remedy("check the store path and permissions"));
    }

    let read_back = ctx.store.read(keys::HEALTH_PROBE)?;
    ctx.store.delete(keys::HEALTH_PROBE)?;

    if read_back.as_deref() == Some(probe_value) {
        Ok(Verdict::pass("backing store round trip verified"))
    } else {
        Ok(Verdict::fail("backing store returned wrong probe value")
            .with_suspected_component("data-store"))
    }
}

async fn config_present(ctx: CheckContext) -> Result<Verdict, VeraError> {
    let path = ctx.workspace_root.join(CONFIG_FILE);
    if !path.exists() {
        // Defaults cover a missing file; only flag it.
        return Ok(Verdict::warning("config file missing, defaults in use")
            .with_suspected_component("configuration"));
    }

    let content = std::fs::read_to_string(&path)?;
    match toml::from_str::<crate::config::EngineConfig>(&content) {
        Ok(_) => Ok(Verdict::pass("config file parses")),
        Err(e) => Ok(Verdict::fail("config file does not parse")
            .with_error_detail(e.to_string())
            .with_suspected_component("configuration")
            .with_suggested_remedy("fix or remove vera.toml")),
    }
}

async fn suite_definition(ctx: CheckContext) -> Result<Verdict, VeraError> {
    let path = ctx.workspace_root.join(SUITE_FILE);
    if !path.exists() {
        return Ok(Verdict::pass("embedded default suite in use"));
    }

    match SuiteDefinition::load(&path) {
        Ok(suite) => Ok(Verdict::pass(format!(
            "suite {} with {} check(s)",
            suite.name,
            suite.check_count()
        ))),
        Err(e) => Ok(Verdict::fail("suite definition does not parse")
            .with_error_detail(e.to_string())
            .with_suspected_component("suite-definition")
            .with_suggested_remedy("fix or remove vera-suite.yaml")),
    }
}

async fn store_key_present(
    ctx: CheckContext,
    key: &'static str,
    pass_message: &'static str,
    fail_message: &'static str,
    component: &'static str,
    remedy: &'static str,
) -> Result<Verdict, VeraError> {
    match ctx.store.read(key)? {
        Some(value) if !value.trim().is_empty() => Ok(Verdict::pass(pass_message)),
        _ => Ok(Verdict::fail(fail_message)
            .with_suspected_component(component)
            .with_suggested_remedy(remedy)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use vera_common::Outcome;

    fn test_ctx() -> CheckContext {
        CheckContext::new(Arc::new(MemoryStore::new()), "/nonexistent")
    }

    #[test]
    fn test_builtin_set_covers_default_suite() {
        let mut registry = CheckRegistry::new();
        register_builtin(&mut registry);

        let suite = SuiteDefinition::embedded_default();
        for phase in &suite.phases {
            for check in &phase.checks {
                assert!(registry.get(check).is_some(), "missing builtin check {}", check);
            }
        }
    }

    #[tokio::test]
    async fn test_store_reachable_round_trip() {
        let ctx = test_ctx();
        let verdict = store_reachable(ctx.clone()).await.unwrap();
        assert_eq!(verdict.outcome, Outcome::Pass);
        // The probe key does not survive the check.
        assert!(ctx.store.read(keys::HEALTH_PROBE).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_config_is_a_warning() {
        let verdict = config_present(test_ctx()).await.unwrap();
        assert_eq!(verdict.outcome, Outcome::Warning);
    }

    #[tokio::test]
    async fn test_store_key_check_fails_when_empty() {
        let ctx = test_ctx();
        let verdict = store_key_present(
            ctx.clone(),
            keys::REFERRAL_POOL,
            "ok",
            "missing",
            "referral",
            "reseed",
        )
        .await
        .unwrap();
        assert_eq!(verdict.outcome, Outcome::Fail);
        assert_eq!(verdict.suspected_component.as_deref(), Some("referral"));

        ctx.store.write(keys::REFERRAL_POOL, "seeded").unwrap();
        let verdict = store_key_present(
            ctx,
            keys::REFERRAL_POOL,
            "ok",
            "missing",
            "referral",
            "reseed",
        )
        .await
        .unwrap();
        assert_eq!(verdict.outcome, Outcome::Pass);
    }
}
