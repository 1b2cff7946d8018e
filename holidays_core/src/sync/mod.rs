//! Synchronization & reconciliation: provider pull, normalize, replace-in-range.

pub mod engine;
pub mod models;
pub mod schedule;

pub use engine::SyncEngine;
pub use models::{DeleteSummary, FailurePolicy, RefreshSummary, SyncConfig, SyncSummary};
pub use schedule::{CronExpr, SyncScheduler};
