use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A country known to the local store. Identity is `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    /// Provider country code, case preserved as received (e.g. "KR").
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Enumerated holiday categories published by the provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HolidayType {
    Public,
    Bank,
    School,
    Authorities,
    Optional,
    Observance,
}

impl HolidayType {
    pub const ALL: [HolidayType; 6] = [
        HolidayType::Public,
        HolidayType::Bank,
        HolidayType::School,
        HolidayType::Authorities,
        HolidayType::Optional,
        HolidayType::Observance,
    ];

    /// Stored/provider representation, e.g. "Public".
    pub fn as_str(&self) -> &'static str {
        match self {
            HolidayType::Public => "Public",
            HolidayType::Bank => "Bank",
            HolidayType::School => "School",
            HolidayType::Authorities => "Authorities",
            HolidayType::Optional => "Optional",
            HolidayType::Observance => "Observance",
        }
    }

    /// Case-insensitive parse; accepts both "Public" and "PUBLIC".
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for HolidayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HolidayType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("unknown holiday type: {s}")))
    }
}

/// A stored holiday row, with type and county lists already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: i64,
    pub country_code: String,
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub global: bool,
    pub fixed: bool,
    pub launch_year: Option<i32>,
    pub types: Vec<HolidayType>,
    pub counties: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-if-absent command for a country seen at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryUpsertCommand {
    pub code: String,
    pub name: String,
}

/// A normalized holiday ready to be written by replace-in-range.
///
/// `types` is never absent (empty when the provider sent nothing), while
/// `counties` stays `None` when the provider sent null or an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayUpsertCommand {
    pub country_code: String,
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub global: bool,
    pub fixed: bool,
    pub launch_year: Option<i32>,
    pub types: Vec<HolidayType>,
    pub counties: Option<Vec<String>>,
}

impl HolidayUpsertCommand {
    /// `types` joined for storage, `None` when empty.
    pub fn types_raw(&self) -> Option<String> {
        join_raw(self.types.iter().map(HolidayType::as_str))
    }

    /// `counties` joined for storage, `None` when absent or empty.
    pub fn counties_raw(&self) -> Option<String> {
        self.counties
            .as_ref()
            .and_then(|c| join_raw(c.iter().map(String::as_str)))
    }
}

fn join_raw<'a>(items: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = items.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Decode a stored `types_raw` column. Unrecognized tokens mean the row was
/// written by something other than this service and surface as a backend error.
pub fn parse_types_raw(raw: Option<&str>) -> Result<Vec<HolidayType>> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(|tok| {
            HolidayType::parse(tok).ok_or_else(|| {
                Error::BackendMessage(format!("stored holiday type is not recognized: {tok}"))
            })
        })
        .collect()
}

/// Decode a stored `counties_raw` column.
pub fn parse_counties_raw(raw: Option<&str>) -> Vec<String> {
    match raw.filter(|s| !s.is_empty()) {
        Some(raw) => raw.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// Inclusive calendar date interval.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Jan 1 to Dec 31 of `year`.
    pub fn for_year(year: i32) -> Result<Self> {
        Self::for_years(year, year)
    }

    /// Jan 1 of `from_year` to Dec 31 of `to_year`.
    pub fn for_years(from_year: i32, to_year: i32) -> Result<Self> {
        Self::new(jan_first(from_year)?, dec_last(to_year)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

pub(crate) fn jan_first(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| Error::InvalidInput(format!("year={year} is not a valid calendar year")))
}

pub(crate) fn dec_last(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| Error::InvalidInput(format!("year={year} is not a valid calendar year")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(types: Vec<HolidayType>, counties: Option<Vec<String>>) -> HolidayUpsertCommand {
        HolidayUpsertCommand {
            country_code: "KR".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            local_name: "삼일절".into(),
            name: "Independence Movement Day".into(),
            global: true,
            fixed: true,
            launch_year: None,
            types,
            counties,
        }
    }

    #[test]
    fn holiday_type_parse_is_case_insensitive() {
        assert_eq!(HolidayType::parse("PUBLIC"), Some(HolidayType::Public));
        assert_eq!(HolidayType::parse("public"), Some(HolidayType::Public));
        assert_eq!(HolidayType::parse("Observance"), Some(HolidayType::Observance));
        assert_eq!(HolidayType::parse("Pub"), None);
        assert!("Holiday".parse::<HolidayType>().is_err());
    }

    #[test]
    fn raw_columns_are_null_when_empty() {
        let c = cmd(vec![], Some(vec![]));
        assert_eq!(c.types_raw(), None);
        assert_eq!(c.counties_raw(), None);

        let c = cmd(
            vec![HolidayType::Public, HolidayType::Bank],
            Some(vec!["US-CA".into(), "US-NY".into()]),
        );
        assert_eq!(c.types_raw().as_deref(), Some("Public,Bank"));
        assert_eq!(c.counties_raw().as_deref(), Some("US-CA,US-NY"));
    }

    #[test]
    fn stored_columns_decode_back() {
        assert_eq!(
            parse_types_raw(Some("Public,Bank")).unwrap(),
            vec![HolidayType::Public, HolidayType::Bank]
        );
        assert!(parse_types_raw(None).unwrap().is_empty());
        assert!(parse_types_raw(Some("Public,Bogus")).is_err());
        assert_eq!(parse_counties_raw(Some("DE-BY")), vec!["DE-BY".to_string()]);
        assert!(parse_counties_raw(None).is_empty());
    }

    #[test]
    fn date_range_for_years_spans_calendar_years() {
        let r = DateRange::for_years(2021, 2025).unwrap();
        assert_eq!(r.start, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(r.end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(r.contains(NaiveDate::from_ymd_opt(2023, 7, 4).unwrap()));
        assert!(!r.contains(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
        assert!(DateRange::for_years(2025, 2021).is_err());
    }
}
