use crate::query::models::{CountryResponse, HolidayResponse, HolidaySearchQuery};
use crate::store::{HolidaySearchFilter, HolidayStore, Page, PageRequest};
use crate::year_range::YearRangePolicy;
use crate::{Error, Result};
use std::sync::Arc;

pub struct QueryEngine {
    store: Arc<dyn HolidayStore>,
    policy: Arc<YearRangePolicy>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn HolidayStore>, policy: Arc<YearRangePolicy>) -> Self {
        Self { store, policy }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search(
        &self,
        query: &HolidaySearchQuery,
        page: &PageRequest,
    ) -> Result<Page<HolidayResponse>> {
        let country_code = query.country_code.trim();
        if country_code.is_empty() {
            return Err(Error::InvalidInput("countryCode is required".to_string()));
        }
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(Error::InvalidInput(format!(
                    "from ({from}) must not be after to ({to})"
                )));
            }
        }

        let range = self
            .policy
            .resolve_search_range(query.year, query.from, query.to)?;
        let filter = HolidaySearchFilter {
            country_code: country_code.to_string(),
            range,
            holiday_type: query.holiday_type,
        };

        let page = self.store.search_holidays(&filter, page).await?;
        tracing::debug!(
            country = %filter.country_code,
            start = %range.start,
            end = %range.end,
            total = page.total_elements,
            "holiday search"
        );
        Ok(page.map(HolidayResponse::from))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_countries(&self) -> Result<Vec<CountryResponse>> {
        Ok(self
            .store
            .list_countries()
            .await?
            .into_iter()
            .map(CountryResponse::from)
            .collect())
    }
}
