use crate::source::RetryPolicy;
use crate::sync::models::{FailurePolicy, SyncConfig};
use crate::sync::schedule::CronExpr;
use crate::year_range::YearRangePolicy;
use crate::{Error, Result};
use chrono_tz::Tz;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://.holidays/holidays.db";
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://date.nager.at/api/v3";
pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";
/// 01:00 on January 2nd in the canonical zone.
pub const DEFAULT_SCHEDULE_CRON: &str = "0 1 2 1 *";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub cron: String,
    pub poll_interval: Duration,
}

/// Process configuration, read from `HOLIDAYS_*` environment variables.
#[derive(Debug, Clone)]
pub struct HolidaysConfig {
    /// `sqlite://...` URL, a plain file path, or `memory`.
    pub database_url: String,
    pub provider: ProviderConfig,
    pub retry: RetryPolicy,
    pub timezone: Tz,
    pub window_years: u32,
    pub sync: SyncConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for HolidaysConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            provider: ProviderConfig {
                base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
                timeout: Duration::from_millis(5_000),
            },
            retry: RetryPolicy::default(),
            timezone: chrono_tz::Asia::Seoul,
            window_years: YearRangePolicy::DEFAULT_WINDOW_YEARS,
            sync: SyncConfig::default(),
            scheduler: SchedulerConfig {
                enabled: true,
                cron: DEFAULT_SCHEDULE_CRON.to_string(),
                poll_interval: Duration::from_millis(60_000),
            },
        }
    }
}

impl HolidaysConfig {
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults and
    /// malformed values are rejected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = lookup("HOLIDAYS_DATABASE_URL") {
            cfg.database_url = v;
        }
        if let Some(v) = lookup("HOLIDAYS_PROVIDER_BASE_URL") {
            cfg.provider.base_url = v;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "HOLIDAYS_PROVIDER_TIMEOUT_MS")? {
            cfg.provider.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "HOLIDAYS_RETRY_MAX_ATTEMPTS")? {
            cfg.retry.max_attempts = n;
        }
        if let Some(ms) = parse_var(&lookup, "HOLIDAYS_RETRY_BACKOFF_MS")? {
            cfg.retry.backoff_ms = ms;
        }
        if let Some(v) = lookup("HOLIDAYS_TIMEZONE") {
            cfg.timezone = parse_timezone(&v)?;
        }
        if let Some(n) = parse_var(&lookup, "HOLIDAYS_WINDOW_YEARS")? {
            cfg.window_years = n;
        }
        if let Some(n) = parse_var(&lookup, "HOLIDAYS_BATCH_WINDOW_YEARS")? {
            cfg.sync.batch_window_years = n;
        }
        if let Some(v) = lookup("HOLIDAYS_SYNC_FAILURE_POLICY") {
            cfg.sync.failure_policy = FailurePolicy::parse(&v)?;
        }
        if let Some(n) = parse_var(&lookup, "HOLIDAYS_SYNC_CONCURRENCY")? {
            cfg.sync.concurrency = n;
        }
        if let Some(v) = parse_var(&lookup, "HOLIDAYS_SCHEDULER_ENABLED")? {
            cfg.scheduler.enabled = v;
        }
        if let Some(v) = lookup("HOLIDAYS_SCHEDULE_CRON") {
            cfg.scheduler.cron = v;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "HOLIDAYS_SCHEDULER_POLL_MS")? {
            cfg.scheduler.poll_interval = Duration::from_millis(ms);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    #[tracing::instrument(level = "debug")]
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(Error::InvalidInput("database_url is empty".to_string()));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(Error::InvalidInput("provider.base_url is empty".to_string()));
        }
        if self.provider.timeout.is_zero() {
            return Err(Error::InvalidInput(
                "provider.timeout must be > 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidInput(
                "retry.max_attempts must be > 0".to_string(),
            ));
        }
        if self.window_years == 0 {
            return Err(Error::InvalidInput("window_years must be > 0".to_string()));
        }
        if self.sync.batch_window_years > self.window_years {
            return Err(Error::InvalidInput(format!(
                "batch_window_years ({}) exceeds window_years ({})",
                self.sync.batch_window_years, self.window_years
            )));
        }
        self.sync.validate()?;
        CronExpr::parse(&self.scheduler.cron)?;
        if self.scheduler.poll_interval.is_zero() {
            return Err(Error::InvalidInput(
                "scheduler.poll_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn store_backend(&self) -> StoreBackend {
        let url = self.database_url.trim();
        if url.eq_ignore_ascii_case("memory") {
            StoreBackend::Memory
        } else {
            StoreBackend::Sqlite(url.to_string())
        }
    }
}

pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| Error::InvalidInput(format!("unknown time zone: {raw}")))
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::InvalidInput(format!("{key} has an invalid value: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<HolidaysConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HolidaysConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.provider.base_url, DEFAULT_PROVIDER_BASE_URL);
        assert_eq!(cfg.provider.timeout, Duration::from_secs(5));
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.timezone, chrono_tz::Asia::Seoul);
        assert_eq!(cfg.window_years, 5);
        assert_eq!(cfg.sync.batch_window_years, 2);
        assert_eq!(cfg.sync.failure_policy, FailurePolicy::Halt);
        assert!(cfg.scheduler.enabled);
        assert_eq!(cfg.scheduler.cron, DEFAULT_SCHEDULE_CRON);
        assert_eq!(
            cfg.store_backend(),
            StoreBackend::Sqlite(DEFAULT_DATABASE_URL.to_string())
        );
    }

    #[test]
    fn reads_overrides() {
        let cfg = from_pairs(&[
            ("HOLIDAYS_DATABASE_URL", "memory"),
            ("HOLIDAYS_TIMEZONE", "Europe/Berlin"),
            ("HOLIDAYS_WINDOW_YEARS", "3"),
            ("HOLIDAYS_SYNC_FAILURE_POLICY", "skip_and_continue"),
            ("HOLIDAYS_SYNC_CONCURRENCY", "8"),
            ("HOLIDAYS_SCHEDULER_ENABLED", "false"),
            ("HOLIDAYS_RETRY_BACKOFF_MS", "250"),
        ])
        .unwrap();
        assert_eq!(cfg.store_backend(), StoreBackend::Memory);
        assert_eq!(cfg.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(cfg.window_years, 3);
        assert_eq!(cfg.sync.failure_policy, FailurePolicy::SkipAndContinue);
        assert_eq!(cfg.sync.concurrency, 8);
        assert!(!cfg.scheduler.enabled);
        assert_eq!(cfg.retry.backoff_ms, 250);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(from_pairs(&[("HOLIDAYS_WINDOW_YEARS", "five")]).is_err());
        assert!(from_pairs(&[("HOLIDAYS_WINDOW_YEARS", "0")]).is_err());
        assert!(from_pairs(&[("HOLIDAYS_TIMEZONE", "Mars/Olympus")]).is_err());
        assert!(from_pairs(&[("HOLIDAYS_SCHEDULE_CRON", "every day")]).is_err());
        assert!(from_pairs(&[("HOLIDAYS_RETRY_MAX_ATTEMPTS", "0")]).is_err());
        assert!(from_pairs(&[
            ("HOLIDAYS_WINDOW_YEARS", "1"),
            ("HOLIDAYS_BATCH_WINDOW_YEARS", "2")
        ])
        .is_err());
    }
}
