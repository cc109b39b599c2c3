//! Fix executor - applies one strategy's action list in order.
//!
//! The executor never touches the backing store itself; every side effect
//! goes through the action registry. Execution stops at the first failing
//! action, and the outcome records only the prefix that completed.

use tracing::{info, warn};
use vera_common::{FixOutcome, FixStrategy};

use crate::backup::BackupManager;
use crate::registry::{ActionRegistry, CheckContext};

pub struct FixExecutor<'a> {
    pub actions: &'a ActionRegistry,
}

impl<'a> FixExecutor<'a> {
    pub fn new(actions: &'a ActionRegistry) -> Self {
        Self { actions }
    }

    /// Apply `strategy` for `check_name`. When `backup_enabled`, a marker
    /// backup is taken first; backups are advisory and a backup failure
    /// never blocks the fix attempt.
    pub async fn apply(
        &self,
        check_name: &str,
        strategy: &FixStrategy,
        backup_enabled: bool,
        backups: &mut BackupManager,
        ctx: &CheckContext,
    ) -> FixOutcome {
        info!(
            "applying {} for {} ({} action(s))",
            strategy.kind,
            check_name,
            strategy.actions.len()
        );

        let backup_handle = if backup_enabled {
            match backups.backup(check_name, strategy.kind) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("backup for {} failed: {}", check_name, e);
                    None
                }
            }
        } else {
            None
        };

        let mut applied = Vec::new();

        for action_id in &strategy.actions {
            let outcome = match self.actions.get(*action_id) {
                Some(handler) => handler(ctx.clone()).await,
                None => {
                    // The builtin table is exhaustive; this can only happen
                    // with a custom registry missing a handler.
                    warn!("action {} has no handler", action_id);
                    Ok(false)
                }
            };

            match outcome {
                Ok(true) => applied.push(*action_id),
                Ok(false) => {
                    warn!("action {} reported failure for {}", action_id, check_name);
                    return FixOutcome {
                        success: false,
                        applied_actions: applied,
                        error_detail: Some(format!("action {} failed", action_id)),
                        backup_handle,
                    };
                }
                Err(e) => {
                    warn!("action {} error for {}: {}", action_id, check_name, e);
                    return FixOutcome {
                        success: false,
                        applied_actions: applied,
                        error_detail: Some(format!("action {}: {}", action_id, e)),
                        backup_handle,
                    };
                }
            }
        }

        info!("strategy {} applied cleanly for {}", strategy.kind, check_name);
        FixOutcome {
            success: true,
            applied_actions: applied,
            error_detail: None,
            backup_handle,
        }
    }
}
