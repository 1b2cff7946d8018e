//! Maps provider records into upsert commands and removes duplicate holidays.

use crate::models::{CountryUpsertCommand, HolidayType, HolidayUpsertCommand};
use crate::source::{AvailableCountry, PublicHoliday};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::HashSet;

pub fn to_country_command(dto: AvailableCountry) -> CountryUpsertCommand {
    CountryUpsertCommand {
        code: dto.country_code,
        name: dto.name,
    }
}

/// Convert one provider holiday.
///
/// An unrecognized type token fails the record: the provider sent a value
/// outside the enumerated tag domain.
pub fn to_holiday_command(dto: PublicHoliday) -> Result<HolidayUpsertCommand> {
    let types = normalize_types(dto.types.as_deref(), &dto.country_code, dto.date)?;
    let counties = dto.counties.filter(|c| !c.is_empty());

    Ok(HolidayUpsertCommand {
        country_code: dto.country_code,
        date: dto.date,
        local_name: dto.local_name,
        name: dto.name,
        global: dto.global,
        fixed: dto.fixed,
        launch_year: dto.launch_year,
        types,
        counties,
    })
}

fn normalize_types(
    raw: Option<&[String]>,
    country_code: &str,
    date: NaiveDate,
) -> Result<Vec<HolidayType>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.iter()
        .map(|tok| {
            HolidayType::parse(tok).ok_or_else(|| {
                Error::ExternalSourceMessage(format!(
                    "unrecognized holiday type '{tok}' (countryCode={country_code}, date={date})"
                ))
            })
        })
        .collect()
}

pub fn to_holiday_commands(dtos: Vec<PublicHoliday>) -> Result<Vec<HolidayUpsertCommand>> {
    dtos.into_iter().map(to_holiday_command).collect()
}

/// Keep the first command per `(date, local_name)`, preserving input order.
pub fn dedupe_by_date_and_local_name(
    commands: Vec<HolidayUpsertCommand>,
) -> Vec<HolidayUpsertCommand> {
    let mut seen: HashSet<(NaiveDate, String)> = HashSet::with_capacity(commands.len());
    commands
        .into_iter()
        .filter(|c| seen.insert((c.date, c.local_name.clone())))
        .collect()
}
