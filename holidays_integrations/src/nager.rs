//! Nager.Date v3 client.
//!
//! - `GET {base}/AvailableCountries`
//! - `GET {base}/PublicHolidays/{year}/{countryCode}`

use async_trait::async_trait;
use holidays_core::source::{AvailableCountry, HolidaySource, PublicHoliday};
use holidays_core::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

#[derive(Clone)]
pub struct NagerClient {
    client: Client,
    base_url: String,
}

impl NagerClient {
    /// `timeout` bounds connect and the whole request.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::backend("build nager http client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn countries_url(&self) -> String {
        format!("{}/AvailableCountries", self.base_url)
    }

    fn holidays_url(&self, year: i32, country_code: &str) -> String {
        format!("{}/PublicHolidays/{year}/{country_code}", self.base_url)
    }

    async fn get_list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(Error::external_reqwest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::external_reqwest)?;
        if !status.is_success() {
            return Err(status_error(url, status, &body));
        }
        decode_list(&body)
    }
}

/// 4xx other than timeout/throttling is a rejection; everything else may be transient.
fn status_error(url: &str, status: StatusCode, body: &str) -> Error {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("nager GET {url} returned {status}: {snippet}");
    let transient = matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
    );
    if status.is_client_error() && !transient {
        Error::ExternalRejected {
            status: status.as_u16(),
            message,
        }
    } else {
        Error::ExternalSourceMessage(message)
    }
}

/// Decode a JSON array body; an empty or `null` body is an empty list.
fn decode_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Option<Vec<T>> =
        serde_json::from_str(body).map_err(|e| Error::external("decode nager response", e))?;
    Ok(parsed.unwrap_or_default())
}

#[async_trait]
impl HolidaySource for NagerClient {
    fn id(&self) -> &'static str {
        "nager"
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_available_countries(&self) -> Result<Vec<AvailableCountry>> {
        self.get_list(&self.countries_url()).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_holidays(&self, year: i32, country_code: &str) -> Result<Vec<PublicHoliday>> {
        self.get_list(&self.holidays_url(year, country_code)).await
    }
}
