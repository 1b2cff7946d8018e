//! Year and date window resolution shared by synchronization and queries.
//!
//! "Current year" always comes from a single injectable [`Clock`] evaluated in
//! one canonical time zone, so every window computed during a request or a
//! sync run agrees on the year boundary.

use crate::models::{DateRange, dec_last, jan_first};
use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Source of "today" in the canonical zone.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock projected into a fixed time zone.
#[derive(Debug, Copy, Clone)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Calendar date of `instant` in this clock's zone.
    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

/// Pinned date, for deterministic tests and replays.
#[derive(Debug, Copy, Clone)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Inclusive span of calendar years.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from_year: i32,
    pub to_year: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        self.from_year <= year && year <= self.to_year
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.from_year..=self.to_year
    }

    /// Jan 1 of `from_year` to Dec 31 of `to_year`.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::for_years(self.from_year, self.to_year)
    }
}

/// Computes recent-years windows relative to the configured clock.
#[derive(Clone)]
pub struct YearRangePolicy {
    clock: Arc<dyn Clock>,
    window_years: u32,
}

impl std::fmt::Debug for YearRangePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YearRangePolicy")
            .field("today", &self.clock.today())
            .field("window_years", &self.window_years)
            .finish()
    }
}

impl YearRangePolicy {
    pub const DEFAULT_WINDOW_YEARS: u32 = 5;

    pub fn new(clock: Arc<dyn Clock>, window_years: u32) -> Result<Self> {
        if window_years == 0 {
            return Err(Error::InvalidInput("window_years must be > 0".to_string()));
        }
        Ok(Self {
            clock,
            window_years,
        })
    }

    pub fn window_years(&self) -> u32 {
        self.window_years
    }

    pub fn current_year(&self) -> i32 {
        self.clock.today().year()
    }

    /// `[current_year - n + 1, current_year]`.
    pub fn recent_years(&self, n: u32) -> Result<YearRange> {
        if n == 0 {
            return Err(Error::InvalidInput(
                "recent years count must be >= 1".to_string(),
            ));
        }
        Ok(self.span(n))
    }

    pub fn last_five_years(&self) -> YearRange {
        self.span(5)
    }

    pub fn last_two_years(&self) -> YearRange {
        self.span(2)
    }

    /// The window every year-bounded operation is validated against.
    pub fn allowed_window(&self) -> YearRange {
        self.span(self.window_years)
    }

    fn span(&self, n: u32) -> YearRange {
        let to_year = self.current_year();
        let n = i32::try_from(n.max(1)).unwrap_or(i32::MAX);
        YearRange {
            from_year: to_year.saturating_sub(n - 1),
            to_year,
        }
    }

    pub fn verify_year(&self, year: i32) -> Result<()> {
        let window = self.allowed_window();
        if !window.contains(year) {
            return Err(Error::year_out_of_range(
                year,
                window.from_year,
                window.to_year,
            ));
        }
        Ok(())
    }

    /// Jan 1 to Dec 31 of `year`, after checking it against the allowed window.
    pub fn year_dates(&self, year: i32) -> Result<DateRange> {
        self.verify_year(year)?;
        DateRange::for_year(year)
    }

    /// Full allowed window as a date range.
    pub fn default_range(&self) -> Result<DateRange> {
        self.allowed_window().date_range()
    }

    /// Resolve a search window: explicit bounds win over `year`, which wins
    /// over the default window. A missing bound is filled from the window.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn resolve_search_range(
        &self,
        year: Option<i32>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<DateRange> {
        let window = self.allowed_window();

        if from.is_some() || to.is_some() {
            let start = match from {
                Some(d) => {
                    self.verify_year(d.year())?;
                    d
                }
                None => jan_first(window.from_year)?,
            };
            let end = match to {
                Some(d) => {
                    self.verify_year(d.year())?;
                    d
                }
                None => dec_last(window.to_year)?,
            };
            return DateRange::new(start, end);
        }

        if let Some(year) = year {
            return self.year_dates(year);
        }

        self.default_range()
    }
}
