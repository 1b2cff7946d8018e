//! External holiday provider boundary.
//!
//! Provider clients live in `holidays_integrations`; the engines only see the
//! [`HolidaySource`] trait, usually wrapped in a [`RetryingSource`].

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Country advertised by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCountry {
    pub country_code: String,
    pub name: String,
}

/// One holiday record as published by the provider.
///
/// Optional list fields keep the provider's null/empty distinction; the
/// normalizer decides how each is represented internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHoliday {
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub country_code: String,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub counties: Option<Vec<String>>,
    #[serde(default)]
    pub launch_year: Option<i32>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
}

#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// Provider identifier, used in logs.
    fn id(&self) -> &'static str;

    async fn list_available_countries(&self) -> Result<Vec<AvailableCountry>>;

    async fn list_holidays(&self, year: i32, country_code: &str) -> Result<Vec<PublicHoliday>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 0,
        }
    }
}

/// Retries transient external-source failures a bounded number of times and
/// re-raises the last error once attempts are exhausted. Other error kinds,
/// including provider rejections, pass through.
pub struct RetryingSource {
    inner: Arc<dyn HolidaySource>,
    policy: RetryPolicy,
}

impl RetryingSource {
    pub fn new(inner: Arc<dyn HolidaySource>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T>> + Send,
        T: Send,
    {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        source = self.inner.id(),
                        op,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "external source call failed; retrying"
                    );
                    if self.policy.backoff_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.policy.backoff_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::BackendMessage("unreachable retry loop".to_string()))
    }
}

#[async_trait]
impl HolidaySource for RetryingSource {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_available_countries(&self) -> Result<Vec<AvailableCountry>> {
        self.with_retry("list_available_countries", || {
            self.inner.list_available_countries()
        })
        .await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_holidays(&self, year: i32, country_code: &str) -> Result<Vec<PublicHoliday>> {
        self.with_retry("list_holidays", || self.inner.list_holidays(year, country_code))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with an external error until `fail_times` calls have been made.
    struct Flaky {
        calls: AtomicU32,
        fail_times: u32,
        invalid: bool,
        rejected: bool,
    }

    #[async_trait]
    impl HolidaySource for Flaky {
        fn id(&self) -> &'static str {
            "flaky"
        }

        async fn list_available_countries(&self) -> Result<Vec<AvailableCountry>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.invalid {
                return Err(Error::InvalidInput("bad request".into()));
            }
            if self.rejected {
                return Err(Error::ExternalRejected {
                    status: 404,
                    message: "no such country".into(),
                });
            }
            if n <= self.fail_times {
                return Err(Error::ExternalSourceMessage(format!("call {n} failed")));
            }
            Ok(vec![AvailableCountry {
                country_code: "KR".into(),
                name: "South Korea".into(),
            }])
        }

        async fn list_holidays(&self, _year: i32, _code: &str) -> Result<Vec<PublicHoliday>> {
            Ok(vec![])
        }
    }

    fn flaky(fail_times: u32, invalid: bool) -> Arc<Flaky> {
        Arc::new(Flaky {
            calls: AtomicU32::new(0),
            fail_times,
            invalid,
            rejected: false,
        })
    }

    #[tokio::test]
    async fn succeeds_within_attempt_budget() {
        let inner = flaky(2, false);
        let src = RetryingSource::new(inner.clone(), RetryPolicy::default());
        let out = src.list_available_countries().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_last_error_after_exhausting_attempts() {
        let inner = flaky(10, false);
        let src = RetryingSource::new(inner.clone(), RetryPolicy::default());
        let err = src.list_available_countries().await.unwrap_err();
        assert!(err.is_external());
        assert!(err.to_string().contains("call 3 failed"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_external_errors() {
        let inner = flaky(0, true);
        let src = RetryingSource::new(inner.clone(), RetryPolicy::default());
        assert!(src.list_available_countries().await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_rejection_is_not_retried() {
        let inner = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            fail_times: 0,
            invalid: false,
            rejected: true,
        });
        let src = RetryingSource::new(inner.clone(), RetryPolicy::default());
        let err = src.list_available_countries().await.unwrap_err();
        assert!(matches!(err, Error::ExternalRejected { status: 404, .. }));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn public_holiday_deserializes_provider_payload() {
        let raw = r#"{
            "date": "2025-03-01",
            "localName": "삼일절",
            "name": "Independence Movement Day",
            "countryCode": "KR",
            "fixed": false,
            "global": true,
            "counties": null,
            "launchYear": null,
            "types": ["Public"]
        }"#;
        let h: PublicHoliday = serde_json::from_str(raw).unwrap();
        assert_eq!(h.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(h.local_name, "삼일절");
        assert!(h.global);
        assert_eq!(h.counties, None);
        assert_eq!(h.types, Some(vec!["Public".to_string()]));
    }
}
