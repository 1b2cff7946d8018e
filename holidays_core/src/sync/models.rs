use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Result of a multi-country sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Countries advertised by the provider in this run.
    pub countries_count: u64,
    /// Holidays written after dedupe, summed over countries.
    pub holidays_count: u64,
    /// Codes skipped under `FailurePolicy::SkipAndContinue`.
    pub failed_countries: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub holidays_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_count: u64,
}

/// What a batch does when one country fails to fetch or normalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the batch and return the first error.
    #[default]
    Halt,
    /// Log, record the country in `failed_countries`, keep going.
    SkipAndContinue,
}

impl FailurePolicy {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(FailurePolicy::Halt),
            "skip_and_continue" | "skip" => Ok(FailurePolicy::SkipAndContinue),
            other => Err(Error::InvalidInput(format!(
                "unknown sync failure policy: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub failure_policy: FailurePolicy,
    /// Max countries fetched in parallel.
    pub concurrency: usize,
    /// Years covered by the scheduled batch (`sync_recent_batch`).
    pub batch_window_years: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Halt,
            concurrency: 4,
            batch_window_years: 2,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidInput("sync concurrency must be > 0".to_string()));
        }
        if self.batch_window_years == 0 {
            return Err(Error::InvalidInput(
                "batch window years must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
