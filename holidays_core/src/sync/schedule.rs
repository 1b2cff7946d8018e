use crate::sync::engine::SyncEngine;
use crate::sync::models::SyncSummary;
use crate::{Error, Result};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Background trigger for the recent-years batch sync.
///
/// The cron expression is evaluated in the canonical zone, so
/// `0 1 2 1 *` fires at 01:00 on January 2nd local time.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    cron: CronExpr,
    tz: Tz,
    poll_interval: Duration,
    next_run_at: Mutex<DateTime<Utc>>,
}

impl SyncScheduler {
    #[tracing::instrument(level = "debug", skip(engine))]
    pub fn new(
        engine: Arc<SyncEngine>,
        cron_expr: &str,
        tz: Tz,
        poll_interval: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if poll_interval.is_zero() {
            return Err(Error::InvalidInput("poll_interval must be > 0".to_string()));
        }
        let cron = CronExpr::parse(cron_expr)?;
        let next = cron.next_after(now, tz)?;
        tracing::info!(next_run_at = %next, "holiday batch sync scheduled");
        Ok(Self {
            engine,
            cron,
            tz,
            poll_interval,
            next_run_at: Mutex::new(next),
        })
    }

    pub async fn next_run_at(&self) -> DateTime<Utc> {
        *self.next_run_at.lock().await
    }

    /// Run the scheduler loop until the task is cancelled.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run_loop(&self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            // Errors are logged; the next schedule still fires.
            if let Err(e) = self.tick(Utc::now()).await {
                tracing::warn!(error = %e, "holiday sync scheduler tick failed");
            }
        }
    }

    /// Run the batch if it is due at `now`. Returns `None` when not due.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Option<SyncSummary>> {
        {
            let mut next = self.next_run_at.lock().await;
            if now < *next {
                return Ok(None);
            }
            // Computed from `now` so a long downtime does not replay missed runs.
            *next = self.cron.next_after(now, self.tz)?;
            tracing::info!(next_run_at = %*next, "holiday batch sync due");
        }
        self.engine.sync_recent_batch().await.map(Some)
    }
}

/// Parsed cron expression supporting 5-field schedules: "min hour dom month dow".
///
/// Supported tokens per field:
/// - `*` all values
/// - `*/N` steps
/// - `A-B` inclusive range
/// - `A,B,C` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    min: u32,
    max: u32,
    allowed: Vec<bool>,
}

impl Field {
    fn new(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            allowed: vec![false; (max - min + 1) as usize],
        }
    }

    fn set(&mut self, v: u32) -> Result<()> {
        if v < self.min || v > self.max {
            return Err(Error::InvalidInput(format!(
                "cron field value {v} out of range {}..={}",
                self.min, self.max
            )));
        }
        self.allowed[(v - self.min) as usize] = true;
        Ok(())
    }

    fn matches(&self, v: u32) -> bool {
        v >= self.min && v <= self.max && self.allowed[(v - self.min) as usize]
    }
}

impl CronExpr {
    #[tracing::instrument(level = "debug")]
    pub fn parse(expr: &str) -> Result<Self> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = parts.as_slice() else {
            return Err(Error::InvalidInput(
                "cron expr must have 5 fields: min hour dom month dow".to_string(),
            ));
        };

        Ok(Self {
            minute: parse_field(minute, 0, 59)?,
            hour: parse_field(hour, 0, 23)?,
            day_of_month: parse_field(dom, 1, 31)?,
            month: parse_field(month, 1, 12)?,
            day_of_week: parse_field(dow, 0, 6)?,
        })
    }

    fn matches_date(&self, t: &NaiveDateTime) -> bool {
        self.day_of_month.matches(t.day())
            && self.month.matches(t.month())
            && self.day_of_week.matches(t.weekday().num_days_from_sunday())
    }

    fn matches_time(&self, t: &NaiveDateTime) -> bool {
        self.minute.matches(t.minute()) && self.hour.matches(t.hour())
    }

    /// First matching minute strictly after `after`, evaluated as wall-clock
    /// time in `tz`. Local times skipped by a DST gap never match.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>> {
        let local = after.with_timezone(&tz).naive_local() + ChronoDuration::minutes(1);
        let mut t = local
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(local);
        let limit = t + ChronoDuration::days(367);

        while t < limit {
            if !self.matches_date(&t) {
                let next_day = t.date().succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0));
                match next_day {
                    Some(d) => t = d,
                    None => break,
                }
                continue;
            }
            if self.matches_time(&t) {
                if let Some(found) = tz.from_local_datetime(&t).earliest() {
                    return Ok(found.with_timezone(&Utc));
                }
            }
            t += ChronoDuration::minutes(1);
        }
        Err(Error::InvalidInput(
            "cron expr produced no matching time within 367 days".to_string(),
        ))
    }
}

fn parse_field(token: &str, min: u32, max: u32) -> Result<Field> {
    let mut f = Field::new(min, max);
    for part in token.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(Error::InvalidInput("empty cron field token".to_string()));
        }
        if part == "*" {
            for v in min..=max {
                f.set(v)?;
            }
            continue;
        }
        if let Some(step) = part.strip_prefix("*/") {
            let n: u32 = step
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid cron step: {part}")))?;
            if n == 0 {
                return Err(Error::InvalidInput("cron step must be > 0".to_string()));
            }
            for v in (min..=max).step_by(n as usize) {
                f.set(v)?;
            }
            continue;
        }
        if let Some((a, b)) = part.split_once('-') {
            let start: u32 = a
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid cron range: {part}")))?;
            let end: u32 = b
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid cron range: {part}")))?;
            if start > end {
                return Err(Error::InvalidInput("cron range start > end".to_string()));
            }
            for v in start..=end {
                f.set(v)?;
            }
            continue;
        }
        let v: u32 = part
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid cron value: {part}")))?;
        f.set(v)?;
    }
    Ok(f)
}
