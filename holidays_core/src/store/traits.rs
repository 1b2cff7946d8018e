use crate::models::{Country, CountryUpsertCommand, DateRange, Holiday, HolidayUpsertCommand};
use crate::store::models::{HolidaySearchFilter, Page, PageRequest};
use crate::{Error, Result};
use async_trait::async_trait;

/// Persistence boundary for countries and holidays.
///
/// Implementations must make `replace_holidays_in_range` atomic: a concurrent
/// reader of the same country and range sees either the old rows or the new
/// rows, never a mix.
#[async_trait]
pub trait HolidayStore: Send + Sync {
    async fn country_exists(&self, code: &str) -> Result<bool>;

    /// Returns `Error::NotFound` for an unknown code.
    async fn find_country(&self, code: &str) -> Result<Country>;

    /// All countries ordered by code.
    async fn list_countries(&self) -> Result<Vec<Country>>;

    /// Insert unless the code already exists. Returns whether a row was created;
    /// an existing row (including its name) is left untouched.
    async fn insert_country_if_absent(&self, command: &CountryUpsertCommand) -> Result<bool>;

    /// Delete every holiday of `country` within `range`, then insert `holidays`,
    /// as one unit. Returns the number of inserted rows.
    async fn replace_holidays_in_range(
        &self,
        country: &Country,
        range: DateRange,
        holidays: &[HolidayUpsertCommand],
    ) -> Result<u64>;

    /// Returns the number of removed rows; an unknown country removes nothing.
    async fn delete_holidays_in_range(&self, country_code: &str, range: DateRange) -> Result<u64>;

    async fn search_holidays(
        &self,
        filter: &HolidaySearchFilter,
        page: &PageRequest,
    ) -> Result<Page<Holiday>>;
}

/// Shared precondition for replace-in-range: every command belongs to the
/// target country, falls inside the range, and keys are unique.
pub(crate) fn validate_replacement(
    country: &Country,
    range: DateRange,
    holidays: &[HolidayUpsertCommand],
) -> Result<()> {
    let mut keys = std::collections::HashSet::with_capacity(holidays.len());
    for h in holidays {
        if h.country_code != country.code {
            return Err(Error::InvalidInput(format!(
                "holiday countryCode={} does not match replace target {}",
                h.country_code, country.code
            )));
        }
        if !range.contains(h.date) {
            return Err(Error::InvalidInput(format!(
                "holiday date {} is outside replace range {}..={}",
                h.date, range.start, range.end
            )));
        }
        if !keys.insert((h.date, h.local_name.as_str())) {
            return Err(Error::InvalidInput(format!(
                "duplicate holiday key (date={}, localName={})",
                h.date, h.local_name
            )));
        }
    }
    Ok(())
}
