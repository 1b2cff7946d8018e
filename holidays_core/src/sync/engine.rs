use crate::models::{DateRange, HolidayUpsertCommand};
use crate::normalizer::{dedupe_by_date_and_local_name, to_country_command, to_holiday_commands};
use crate::source::HolidaySource;
use crate::store::HolidayStore;
use crate::sync::models::{DeleteSummary, FailurePolicy, RefreshSummary, SyncConfig, SyncSummary};
use crate::year_range::{YearRange, YearRangePolicy};
use crate::{Error, Result};
use dashmap::DashMap;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Pulls countries and holidays from a [`HolidaySource`] and reconciles them
/// into a [`HolidayStore`] by replacing whole date ranges.
pub struct SyncEngine {
    source: Arc<dyn HolidaySource>,
    store: Arc<dyn HolidayStore>,
    policy: Arc<YearRangePolicy>,
    config: SyncConfig,
    country_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SyncEngine {
    #[tracing::instrument(level = "debug", skip(source, store, policy))]
    pub fn new(
        source: Arc<dyn HolidaySource>,
        store: Arc<dyn HolidayStore>,
        policy: Arc<YearRangePolicy>,
        config: SyncConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            store,
            policy,
            config,
            country_locks: DashMap::new(),
        })
    }

    pub fn policy(&self) -> &YearRangePolicy {
        &self.policy
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync every provider country over the full allowed window.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        self.sync_window(self.policy.allowed_window()).await
    }

    /// Scheduled cadence: the most recent `batch_window_years` years.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn sync_recent_batch(&self) -> Result<SyncSummary> {
        let window = self.policy.recent_years(self.config.batch_window_years)?;
        self.sync_window(window).await
    }

    /// Upsert all provider countries, then replace each country's holidays
    /// over `window`.
    ///
    /// Countries are fetched concurrently (bounded by `concurrency`) and
    /// written in provider order. A country whose fetch fails is never
    /// partially written; the batch either stops or skips it according to
    /// the configured `FailurePolicy`. Store failures always stop the batch.
    #[tracing::instrument(level = "info", skip(self), fields(from_year = window.from_year, to_year = window.to_year))]
    pub async fn sync_window(&self, window: YearRange) -> Result<SyncSummary> {
        let range = window.date_range()?;
        let countries = self.source.list_available_countries().await?;

        for country in &countries {
            self.store
                .insert_country_if_absent(&to_country_command(country.clone()))
                .await?;
        }
        tracing::info!(countries = countries.len(), "countries synced");

        let mut summary = SyncSummary {
            countries_count: countries.len() as u64,
            ..SyncSummary::default()
        };

        let codes: Vec<String> = countries.iter().map(|c| c.country_code.clone()).collect();
        let fetches = futures_util::stream::iter(codes)
            .map(|code| async move {
                let fetched = self.fetch_range(&code, window, range).await;
                (code, fetched)
            })
            .buffered(self.config.concurrency);
        let mut fetches = std::pin::pin!(fetches);

        while let Some((code, fetched)) = fetches.next().await {
            let commands = match fetched {
                Ok(commands) => commands,
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Halt => {
                        tracing::error!(country = %code, error = %e, "country fetch failed; halting sync");
                        return Err(e);
                    }
                    FailurePolicy::SkipAndContinue => {
                        tracing::warn!(country = %code, error = %e, "country fetch failed; skipping");
                        summary.failed_countries.push(code);
                        continue;
                    }
                },
            };

            let written = self.replace_for_country(&code, range, &commands).await?;
            tracing::info!(country = %code, holidays = written, "country holidays synced");
            summary.holidays_count += written;
        }

        tracing::info!(
            countries = summary.countries_count,
            holidays = summary.holidays_count,
            failed = summary.failed_countries.len(),
            "holiday sync completed"
        );
        Ok(summary)
    }

    /// Re-fetch one year for a known country and replace that year.
    ///
    /// Reports the number of holidays stored after dedupe.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn refresh_one(&self, country_code: &str, year: i32) -> Result<RefreshSummary> {
        let country_code = require_code(country_code)?;
        if !self.store.country_exists(country_code).await? {
            return Err(Error::NotFound(format!(
                "country code '{country_code}' does not exist"
            )));
        }
        let range = self.policy.year_dates(year)?;

        let commands = self
            .fetch_range(country_code, YearRange { from_year: year, to_year: year }, range)
            .await?;
        let written = self.replace_for_country(country_code, range, &commands).await?;
        tracing::info!(country = %country_code, year, holidays = written, "holidays refreshed");
        Ok(RefreshSummary {
            holidays_count: written,
        })
    }

    /// Remove one year of holidays; an unknown country removes nothing.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn delete_one(&self, country_code: &str, year: i32) -> Result<DeleteSummary> {
        let country_code = require_code(country_code)?;
        let range = self.policy.year_dates(year)?;

        let lock = self.country_lock(country_code);
        let _guard = lock.lock().await;
        let deleted = self
            .store
            .delete_holidays_in_range(country_code, range)
            .await?;
        tracing::info!(country = %country_code, year, deleted, "holidays deleted");
        Ok(DeleteSummary {
            deleted_count: deleted,
        })
    }

    /// Fetch every year of `window`, normalize and dedupe. Nothing is written.
    #[tracing::instrument(level = "debug", skip(self, range))]
    async fn fetch_range(
        &self,
        country_code: &str,
        window: YearRange,
        range: DateRange,
    ) -> Result<Vec<HolidayUpsertCommand>> {
        let mut records = Vec::new();
        for year in window.years() {
            records.extend(self.source.list_holidays(year, country_code).await?);
        }

        let commands = to_holiday_commands(records)?;
        if let Some(bad) = commands
            .iter()
            .find(|c| c.country_code != country_code || !range.contains(c.date))
        {
            return Err(Error::ExternalSourceMessage(format!(
                "provider returned holiday (countryCode={}, date={}) outside request {country_code} {}..={}",
                bad.country_code, bad.date, range.start, range.end
            )));
        }
        Ok(dedupe_by_date_and_local_name(commands))
    }

    async fn replace_for_country(
        &self,
        country_code: &str,
        range: DateRange,
        commands: &[HolidayUpsertCommand],
    ) -> Result<u64> {
        let lock = self.country_lock(country_code);
        let _guard = lock.lock().await;
        let country = self.store.find_country(country_code).await?;
        self.store
            .replace_holidays_in_range(&country, range, commands)
            .await
    }

    fn country_lock(&self, country_code: &str) -> Arc<Mutex<()>> {
        self.country_locks
            .entry(country_code.to_string())
            .or_default()
            .clone()
    }
}

fn require_code(country_code: &str) -> Result<&str> {
    let code = country_code.trim();
    if code.is_empty() {
        return Err(Error::InvalidInput("countryCode is required".to_string()));
    }
    Ok(code)
}
