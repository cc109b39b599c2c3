//! Engine configuration, loaded from `vera.toml` with defaults for every
//! field. A missing file is not an error; a malformed one is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::runner::PhaseRunner;

pub const CONFIG_FILE: &str = "vera.toml";
pub const SUITE_FILE: &str = "vera-suite.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-check deadline.
    pub check_timeout_secs: u64,
    /// Total attempts per check, first try included.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub stop_on_first_failure: bool,
    /// Root of the file-backed store.
    pub store_path: PathBuf,
    /// Where the structured report is written after each run.
    pub report_path: PathBuf,
    pub remediation: RemediationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemediationConfig {
    /// Master switch for the fix phase; off means validate-only.
    pub enabled: bool,
    /// Resolve strategies and report what would run, without executing.
    pub dry_run: bool,
    pub backup_enabled: bool,
    pub rollback_enabled: bool,
    /// Whether a pre-existing failure that was never fixed also forces a
    /// rollback of unrelated successful fixes.
    pub rollback_on_unrelated_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
            stop_on_first_failure: false,
            store_path: PathBuf::from(".vera/store"),
            report_path: PathBuf::from(".vera/report.json"),
            remediation: RemediationConfig::default(),
        }
    }
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dry_run: false,
            backup_enabled: true,
            rollback_enabled: true,
            rollback_on_unrelated_failure: false,
        }
    }
}

impl EngineConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Phase runner for this config. `enable_retries = false` clamps every
    /// check to a single attempt.
    pub fn runner(&self, enable_retries: bool) -> PhaseRunner {
        PhaseRunner::new(
            Duration::from_secs(self.check_timeout_secs),
            if enable_retries { self.max_retries } else { 1 },
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}
