//! Builtin repair action implementations.
//!
//! Every action operates through the backing store collaborator only and
//! returns a plain success signal. Actions must stay safe to re-invoke after
//! a partial run; idempotence is this module's responsibility, not the
//! executor's.

use chrono::Utc;
use tracing::debug;
use vera_common::{ActionId, VeraError};

use crate::registry::{ActionRegistry, CheckContext};

/// Store keys shared between the builtin checks and the builtin actions.
pub mod keys {
    pub const SESSION_CACHE: &str = "session/cache";
    pub const REFERRAL_POOL: &str = "referral/pool";
    pub const PAYMENT_GATEWAY: &str = "payments/gateway";
    pub const PAYMENT_GATEWAY_PREVIOUS: &str = "payments/gateway.previous";
    pub const ACCESS_RULES: &str = "security/access-rules";
    pub const ACCESS_RULES_PREVIOUS: &str = "security/access-rules.previous";
    pub const SCREEN_MANIFEST: &str = "screens/manifest";
    pub const SCREEN_MANIFEST_PREVIOUS: &str = "screens/manifest.previous";
    pub const PROFILE_INDEX: &str = "profiles/index";
    pub const PROFILE_INDEX_DELTA: &str = "profiles/index.delta";
    pub const OTP_QUEUE: &str = "otp/queue";
    pub const OTP_WORKER: &str = "otp/worker";
    pub const HEALTH_PROBE: &str = "health/probe";
}

/// Build the dispatch table for the full action vocabulary. The match below
/// is exhaustive over `ActionId`, so adding a variant without a handler is a
/// compile error.
pub fn builtin_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    for id in ActionId::ALL {
        registry.register(id, move |ctx| Box::pin(run_builtin(id, ctx)));
    }
    registry
}

async fn run_builtin(id: ActionId, ctx: CheckContext) -> Result<bool, VeraError> {
    debug!("action {}", id);
    let store = &ctx.store;
    let stamp = Utc::now().to_rfc3339();

    match id {
        ActionId::ClearSessionCache => {
            store.delete(keys::SESSION_CACHE)?;
            Ok(true)
        }
        ActionId::WarmSessionCache => {
            store.write(keys::SESSION_CACHE, &format!("warmed {}", stamp))?;
            Ok(true)
        }
        ActionId::ReseedReferralPool => {
            store.write(keys::REFERRAL_POOL, &format!("seeded {}", stamp))?;
            Ok(true)
        }
        ActionId::RemoveSeededReferralCodes => {
            store.delete(keys::REFERRAL_POOL)?;
            Ok(true)
        }
        ActionId::ResetPaymentGatewayConfig => {
            stash_then_write(
                &ctx,
                keys::PAYMENT_GATEWAY,
                keys::PAYMENT_GATEWAY_PREVIOUS,
                "provider=default\ncurrency=USD\n",
            )
        }
        ActionId::RestorePaymentGatewayConfig => {
            restore_previous(&ctx, keys::PAYMENT_GATEWAY, keys::PAYMENT_GATEWAY_PREVIOUS)
        }
        ActionId::RedeployAccessRules => {
            stash_then_write(
                &ctx,
                keys::ACCESS_RULES,
                keys::ACCESS_RULES_PREVIOUS,
                "default-deny\n",
            )
        }
        ActionId::RestorePreviousAccessRules => {
            restore_previous(&ctx, keys::ACCESS_RULES, keys::ACCESS_RULES_PREVIOUS)
        }
        ActionId::RebuildScreenManifest => {
            stash_then_write(
                &ctx,
                keys::SCREEN_MANIFEST,
                keys::SCREEN_MANIFEST_PREVIOUS,
                "home\ncommunity\nland\npayments\nprofile\n",
            )
        }
        ActionId::RestoreScreenManifest => {
            restore_previous(&ctx, keys::SCREEN_MANIFEST, keys::SCREEN_MANIFEST_PREVIOUS)
        }
        ActionId::ResyncProfileIndex => {
            store.write(keys::PROFILE_INDEX, &format!("synced {}", stamp))?;
            store.write(keys::PROFILE_INDEX_DELTA, &stamp)?;
            Ok(true)
        }
        ActionId::DropProfileIndexDelta => {
            store.delete(keys::PROFILE_INDEX_DELTA)?;
            Ok(true)
        }
        ActionId::FlushOtpQueue => {
            store.delete(keys::OTP_QUEUE)?;
            Ok(true)
        }
        ActionId::RestartOtpWorker => {
            store.write(keys::OTP_WORKER, &format!("restarted {}", stamp))?;
            Ok(true)
        }
    }
}

/// Stash the current value under the `.previous` key, then write the
/// replacement. Succeeds when there was nothing to stash.
fn stash_then_write(
    ctx: &CheckContext,
    key: &str,
    previous_key: &str,
    replacement: &str,
) -> Result<bool, VeraError> {
    if let Some(current) = ctx.store.read(key)? {
        ctx.store.write(previous_key, &current)?;
    }
    ctx.store.write(key, replacement)?;
    Ok(true)
}

/// Put the stashed value back. Fails (returns `false`) when no stash exists;
/// there is nothing to restore and the caller should know.
fn restore_previous(ctx: &CheckContext, key: &str, previous_key: &str) -> Result<bool, VeraError> {
    match ctx.store.read(previous_key)? {
        Some(previous) => {
            ctx.store.write(key, &previous)?;
            ctx.store.delete(previous_key)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn test_ctx() -> CheckContext {
        CheckContext::new(Arc::new(MemoryStore::new()), "/tmp")
    }

    #[test]
    fn test_builtin_registry_covers_vocabulary() {
        let registry = builtin_registry();
        assert_eq!(registry.count(), ActionId::ALL.len());
        for id in ActionId::ALL {
            assert!(registry.get(id).is_some(), "missing handler for {}", id);
        }
    }

    #[tokio::test]
    async fn test_reseed_then_remove_referral_pool() {
        let ctx = test_ctx();
        assert!(run_builtin(ActionId::ReseedReferralPool, ctx.clone())
            .await
            .unwrap());
        assert!(ctx.store.read(keys::REFERRAL_POOL).unwrap().is_some());

        assert!(run_builtin(ActionId::RemoveSeededReferralCodes, ctx.clone())
            .await
            .unwrap());
        assert!(ctx.store.read(keys::REFERRAL_POOL).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_payment_reset_stashes_previous_config() {
        let ctx = test_ctx();
        ctx.store.write(keys::PAYMENT_GATEWAY, "provider=acme").unwrap();

        assert!(run_builtin(ActionId::ResetPaymentGatewayConfig, ctx.clone())
            .await
            .unwrap());
        assert!(ctx
            .store
            .read(keys::PAYMENT_GATEWAY)
            .unwrap()
            .unwrap()
            .contains("provider=default"));

        assert!(run_builtin(ActionId::RestorePaymentGatewayConfig, ctx.clone())
            .await
            .unwrap());
        assert_eq!(
            ctx.store.read(keys::PAYMENT_GATEWAY).unwrap().as_deref(),
            Some("provider=acme")
        );
    }

    #[tokio::test]
    async fn test_restore_without_stash_reports_failure() {
        let ctx = test_ctx();
        let ok = run_builtin(ActionId::RestorePreviousAccessRules, ctx)
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_resync_profile_index_leaves_delta_for_rollback() {
        let ctx = test_ctx();
        assert!(run_builtin(ActionId::ResyncProfileIndex, ctx.clone())
            .await
            .unwrap());
        assert!(ctx.store.read(keys::PROFILE_INDEX_DELTA).unwrap().is_some());

        assert!(run_builtin(ActionId::DropProfileIndexDelta, ctx.clone())
            .await
            .unwrap());
        assert!(ctx.store.read(keys::PROFILE_INDEX_DELTA).unwrap().is_none());
        // The synced index itself survives the rollback marker removal.
        assert!(ctx.store.read(keys::PROFILE_INDEX).unwrap().is_some());
    }
}
