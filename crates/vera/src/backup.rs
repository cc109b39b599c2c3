//! Backup and rollback manager.
//!
//! Backups are lightweight markers (strategy kind + timestamp), not state
//! snapshots: rollback is a replay of each strategy's inverse action list,
//! newest fix first. One failing rollback never blocks the rest, and the
//! ledger is cleared unconditionally afterwards so the next run starts
//! clean.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use vera_common::{BackupRecord, FixOperation, RollbackEntry, RollbackResult, StrategyKind, VeraError};

use crate::registry::{ActionRegistry, CheckContext};

#[derive(Default)]
pub struct BackupManager {
    records: HashMap<String, BackupRecord>,
}

impl BackupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pre-fix marker under the check name. At most one live record
    /// per check; a second backup overwrites the first.
    pub fn backup(
        &mut self,
        check_name: &str,
        strategy_kind: StrategyKind,
    ) -> Result<String, VeraError> {
        let record = BackupRecord {
            handle: check_name.to_string(),
            strategy_kind,
            created_at: Utc::now(),
        };
        info!("backup recorded for {} ({})", check_name, strategy_kind);
        self.records.insert(check_name.to_string(), record);
        Ok(check_name.to_string())
    }

    pub fn get(&self, handle: &str) -> Option<&BackupRecord> {
        self.records.get(handle)
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Replay the rollback action list of every ledger entry, most recently
    /// applied first. Afterwards the ledger and all backup records are
    /// cleared, even when individual rollbacks failed.
    pub async fn rollback_all(
        &mut self,
        ledger: &mut Vec<FixOperation>,
        actions: &ActionRegistry,
        ctx: &CheckContext,
    ) -> RollbackResult {
        let mut result = RollbackResult::default();

        info!("rolling back {} fix operation(s)", ledger.len());

        for operation in ledger.iter().rev() {
            let mut succeeded = true;

            for action_id in &operation.strategy.rollback_actions {
                let ok = match actions.get(*action_id) {
                    Some(handler) => match handler(ctx.clone()).await {
                        Ok(ok) => ok,
                        Err(e) => {
                            warn!("rollback action {} error: {}", action_id, e);
                            false
                        }
                    },
                    None => {
                        warn!("rollback action {} has no handler", action_id);
                        false
                    }
                };

                if !ok {
                    warn!(
                        "rollback action {} failed for {}",
                        action_id, operation.check_name
                    );
                    succeeded = false;
                }
            }

            result.entries.push(RollbackEntry {
                check_name: operation.check_name.clone(),
                strategy_kind: operation.strategy.kind,
                succeeded,
            });
        }

        ledger.clear();
        self.records.clear();

        info!(
            "rollback complete: {} attempted, all succeeded: {}",
            result.attempted(),
            result.all_succeeded()
        );
        result
    }
}
