use crate::models::{Country, CountryUpsertCommand, DateRange, Holiday, HolidayUpsertCommand};
use crate::store::models::{HolidaySearchFilter, Page, PageRequest, SortDirection, SortField, SortOrder};
use crate::store::traits::{HolidayStore, validate_replacement};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    countries: BTreeMap<String, Country>,
    holidays: HashMap<String, Vec<Holiday>>,
    next_country_id: i64,
    next_holiday_id: i64,
}

/// Process-local `HolidayStore`.
///
/// Every mutation runs under a single write lock, so replace-in-range is
/// observed atomically by readers.
#[derive(Clone, Default)]
pub struct InMemoryHolidayStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryHolidayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HolidayStore for InMemoryHolidayStore {
    async fn country_exists(&self, code: &str) -> Result<bool> {
        Ok(self.state.read().await.countries.contains_key(code))
    }

    async fn find_country(&self, code: &str) -> Result<Country> {
        self.state
            .read()
            .await
            .countries
            .get(code)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("country code '{code}' does not exist")))
    }

    async fn list_countries(&self) -> Result<Vec<Country>> {
        Ok(self.state.read().await.countries.values().cloned().collect())
    }

    async fn insert_country_if_absent(&self, command: &CountryUpsertCommand) -> Result<bool> {
        let mut st = self.state.write().await;
        if st.countries.contains_key(&command.code) {
            return Ok(false);
        }
        st.next_country_id += 1;
        let now = Utc::now();
        let country = Country {
            id: st.next_country_id,
            code: command.code.clone(),
            name: command.name.clone(),
            created_at: now,
            updated_at: now,
        };
        st.countries.insert(command.code.clone(), country);
        Ok(true)
    }

    #[tracing::instrument(level = "debug", skip(self, holidays), fields(country = %country.code, count = holidays.len()))]
    async fn replace_holidays_in_range(
        &self,
        country: &Country,
        range: DateRange,
        holidays: &[HolidayUpsertCommand],
    ) -> Result<u64> {
        validate_replacement(country, range, holidays)?;

        let mut st = self.state.write().await;
        if !st.countries.contains_key(&country.code) {
            return Err(Error::NotFound(format!(
                "country code '{}' does not exist",
                country.code
            )));
        }

        let now = Utc::now();
        let mut next_id = st.next_holiday_id;
        let fresh: Vec<Holiday> = holidays
            .iter()
            .map(|h| {
                next_id += 1;
                Holiday {
                    id: next_id,
                    country_code: country.code.clone(),
                    date: h.date,
                    local_name: h.local_name.clone(),
                    name: h.name.clone(),
                    global: h.global,
                    fixed: h.fixed,
                    launch_year: h.launch_year,
                    types: h.types.clone(),
                    counties: h.counties.clone().unwrap_or_default(),
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect();
        st.next_holiday_id = next_id;

        let rows = st.holidays.entry(country.code.clone()).or_default();
        rows.retain(|h| !range.contains(h.date));
        rows.extend(fresh);
        Ok(holidays.len() as u64)
    }

    async fn delete_holidays_in_range(&self, country_code: &str, range: DateRange) -> Result<u64> {
        let mut st = self.state.write().await;
        let Some(rows) = st.holidays.get_mut(country_code) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|h| !range.contains(h.date));
        Ok((before - rows.len()) as u64)
    }

    async fn search_holidays(
        &self,
        filter: &HolidaySearchFilter,
        page: &PageRequest,
    ) -> Result<Page<Holiday>> {
        let st = self.state.read().await;
        let mut matched: Vec<Holiday> = st
            .holidays
            .get(&filter.country_code)
            .map(|rows| {
                rows.iter()
                    .filter(|h| filter.range.contains(h.date))
                    .filter(|h| {
                        filter
                            .holiday_type
                            .map(|t| h.types.contains(&t))
                            .unwrap_or(true)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(st);

        let orders = page.effective_sort();
        matched.sort_by(|a, b| compare(a, b, &orders));

        let total = matched.len() as u64;
        let content = matched
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .collect();
        Ok(Page::new(content, page, total))
    }
}

fn compare(a: &Holiday, b: &Holiday, orders: &[SortOrder]) -> Ordering {
    for order in orders {
        let ord = match order.field {
            SortField::Date => a.date.cmp(&b.date),
            SortField::LocalName => a.local_name.cmp(&b.local_name),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Id => a.id.cmp(&b.id),
        };
        let ord = match order.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HolidayType;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn cmd(date: &str, local_name: &str, types: Vec<HolidayType>) -> HolidayUpsertCommand {
        HolidayUpsertCommand {
            country_code: "KR".into(),
            date: d(date),
            local_name: local_name.into(),
            name: local_name.into(),
            global: true,
            fixed: false,
            launch_year: None,
            types,
            counties: None,
        }
    }

    async fn seeded() -> (InMemoryHolidayStore, Country) {
        let store = InMemoryHolidayStore::new();
        store
            .insert_country_if_absent(&CountryUpsertCommand {
                code: "KR".into(),
                name: "South Korea".into(),
            })
            .await
            .unwrap();
        let kr = store.find_country("KR").await.unwrap();
        (store, kr)
    }

    fn filter(range: DateRange, holiday_type: Option<HolidayType>) -> HolidaySearchFilter {
        HolidaySearchFilter {
            country_code: "KR".into(),
            range,
            holiday_type,
        }
    }

    #[tokio::test]
    async fn insert_country_if_absent_keeps_existing_name() {
        let (store, _) = seeded().await;
        let created = store
            .insert_country_if_absent(&CountryUpsertCommand {
                code: "KR".into(),
                name: "Korea, Republic of".into(),
            })
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(store.find_country("KR").await.unwrap().name, "South Korea");
        assert!(matches!(
            store.find_country("JP").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn replace_only_touches_target_range() {
        let (store, kr) = seeded().await;
        let all = DateRange::for_years(2023, 2024).unwrap();
        store
            .replace_holidays_in_range(
                &kr,
                all,
                &[
                    cmd("2023-01-01", "신정", vec![]),
                    cmd("2024-01-01", "신정", vec![]),
                ],
            )
            .await
            .unwrap();

        let y2024 = DateRange::for_year(2024).unwrap();
        let n = store
            .replace_holidays_in_range(&kr, y2024, &[cmd("2024-03-01", "삼일절", vec![])])
            .await
            .unwrap();
        assert_eq!(n, 1);

        let page = store
            .search_holidays(&filter(all, None), &PageRequest::default())
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = page.content.iter().map(|h| h.date).collect();
        assert_eq!(dates, vec![d("2023-01-01"), d("2024-03-01")]);
    }

    #[tokio::test]
    async fn replace_rejects_rows_outside_range_without_mutating() {
        let (store, kr) = seeded().await;
        let y2024 = DateRange::for_year(2024).unwrap();
        store
            .replace_holidays_in_range(&kr, y2024, &[cmd("2024-01-01", "신정", vec![])])
            .await
            .unwrap();

        let err = store
            .replace_holidays_in_range(&kr, y2024, &[cmd("2025-01-01", "신정", vec![])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let page = store
            .search_holidays(&filter(y2024, None), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
    }

    #[tokio::test]
    async fn type_filter_matches_whole_tags() {
        let (store, kr) = seeded().await;
        let y = DateRange::for_year(2024).unwrap();
        store
            .replace_holidays_in_range(
                &kr,
                y,
                &[
                    cmd("2024-01-01", "a", vec![HolidayType::Public, HolidayType::Bank]),
                    cmd("2024-02-01", "b", vec![HolidayType::Observance]),
                    cmd("2024-03-01", "c", vec![]),
                ],
            )
            .await
            .unwrap();

        let page = store
            .search_holidays(&filter(y, Some(HolidayType::Bank)), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].local_name, "a");
    }

    #[tokio::test]
    async fn delete_counts_removed_rows_and_ignores_unknown_country() {
        let (store, kr) = seeded().await;
        let y = DateRange::for_year(2024).unwrap();
        store
            .replace_holidays_in_range(
                &kr,
                y,
                &[cmd("2024-01-01", "a", vec![]), cmd("2024-05-05", "b", vec![])],
            )
            .await
            .unwrap();
        assert_eq!(store.delete_holidays_in_range("KR", y).await.unwrap(), 2);
        assert_eq!(store.delete_holidays_in_range("KR", y).await.unwrap(), 0);
        assert_eq!(store.delete_holidays_in_range("ZZ", y).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_pages_and_sorts() {
        let (store, kr) = seeded().await;
        let y = DateRange::for_year(2024).unwrap();
        let cmds: Vec<_> = (1..=5)
            .map(|m| cmd(&format!("2024-0{m}-01"), &format!("h{m}"), vec![]))
            .collect();
        store.replace_holidays_in_range(&kr, y, &cmds).await.unwrap();

        let req = PageRequest::new(1, 2, vec![SortOrder::parse("date,desc").unwrap()]).unwrap();
        let page = store.search_holidays(&filter(y, None), &req).await.unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
        let names: Vec<&str> = page.content.iter().map(|h| h.local_name.as_str()).collect();
        assert_eq!(names, vec!["h3", "h2"]);
    }
}
