use crate::models::{Country, Holiday, HolidayType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Search criteria. Explicit `from`/`to` win over `year`; with neither the
/// full allowed window is searched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidaySearchQuery {
    pub country_code: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default, rename = "type")]
    pub holiday_type: Option<HolidayType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayResponse {
    pub id: i64,
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub global: bool,
    pub fixed: bool,
    pub launch_year: Option<i32>,
    pub types: Vec<HolidayType>,
    pub counties: Vec<String>,
}

impl From<Holiday> for HolidayResponse {
    fn from(h: Holiday) -> Self {
        Self {
            id: h.id,
            date: h.date,
            local_name: h.local_name,
            name: h.name,
            global: h.global,
            fixed: h.fixed,
            launch_year: h.launch_year,
            types: h.types,
            counties: h.counties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryResponse {
    pub code: String,
    pub name: String,
}

impl From<Country> for CountryResponse {
    fn from(c: Country) -> Self {
        Self {
            code: c.code,
            name: c.name,
        }
    }
}
