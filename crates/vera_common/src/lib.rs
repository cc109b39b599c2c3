//! Vera Common - Shared types and schemas for the Vera validation engine.
//!
//! Every result type here is immutable once created: verdicts are replaced,
//! never edited, and the report counters are a cache over the verdict map.

pub mod error;
pub mod export;
pub mod report;
pub mod strategy;
pub mod verdict;

pub use error::VeraError;
pub use report::{RemediationSummary, Report, ReportCounters, ReportEntry};
pub use strategy::{
    ActionId, BackupRecord, FixApplicationResult, FixAttempt, FixAttemptStatus, FixOperation,
    FixOutcome, FixSeverity, FixStrategy, FixValidationResult, RevalidatedCheck, RollbackEntry,
    RollbackResult, StrategyKind,
};
pub use verdict::{Outcome, Severity, Verdict};
