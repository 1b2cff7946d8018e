//! SQLite-backed `HolidayStore`.
//!
//! Countries and holidays live in a single WAL-mode SQLite file. Replacing a
//! year range is one transaction (delete then insert), so readers never see a
//! half-written range.
//!
//! Usage:
//! ```ignore
//! let store = SqliteHolidayStore::connect(".holidays/holidays.db").await?;
//! ```

use crate::models::{
    parse_counties_raw, parse_types_raw, Country, CountryUpsertCommand, DateRange, Holiday,
    HolidayUpsertCommand,
};
use crate::store::models::{HolidaySearchFilter, Page, PageRequest, SortDirection};
use crate::store::traits::{validate_replacement, HolidayStore};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct SqliteHolidayStore {
    pool: SqlitePool,
}

impl SqliteHolidayStore {
    /// Open (or create) the store at a file path or `sqlite://` URL.
    ///
    /// Parent directories of the database file are created. The schema is
    /// applied on every open.
    pub async fn connect(location: &str) -> Result<Self> {
        let (url, file) = match location.strip_prefix("sqlite:") {
            Some(rest) => {
                let path = rest.trim_start_matches("//");
                let path = path.split('?').next().unwrap_or(path);
                (location.to_string(), path.to_string())
            }
            None => (format!("sqlite://{location}"), location.to_string()),
        };

        if !file.is_empty() && !file.contains(":memory:") {
            if let Some(parent) = Path::new(&file).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| Error::backend("sqlite_holiday_store", e))?;
                }
            }
        }

        let opts = SqliteConnectOptions::from_str(&url)
            .map_err(db_err)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(db_err)?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database; a single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").map_err(db_err)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(db_err)?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| Error::backend("sqlite_holiday_store_migration", e))?;
        Ok(Self { pool })
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS country (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CONSTRAINT uk_country_code UNIQUE (code)
);

CREATE TABLE IF NOT EXISTS holiday (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_id INTEGER NOT NULL REFERENCES country(id),
    date TEXT NOT NULL,
    local_name TEXT NOT NULL,
    name TEXT NOT NULL,
    is_global INTEGER NOT NULL,
    is_fixed INTEGER NOT NULL,
    launch_year INTEGER,
    types_raw TEXT,
    counties_raw TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CONSTRAINT uk_holiday_country_date_local_name UNIQUE (country_id, date, local_name)
);

CREATE INDEX IF NOT EXISTS idx_holiday_country_date ON holiday(country_id, date);
"#;

fn db_err(e: sqlx::Error) -> Error {
    Error::backend("sqlite_holiday_store", e)
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now())
}

fn fmt_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn row_to_country(r: &SqliteRow) -> Result<Country> {
    let created_at: String = r.try_get("created_at").map_err(db_err)?;
    let updated_at: String = r.try_get("updated_at").map_err(db_err)?;
    Ok(Country {
        id: r.try_get("id").map_err(db_err)?,
        code: r.try_get("code").map_err(db_err)?,
        name: r.try_get("name").map_err(db_err)?,
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
    })
}

fn row_to_holiday(r: &SqliteRow) -> Result<Holiday> {
    let date: String = r.try_get("date").map_err(db_err)?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| Error::backend("sqlite_holiday_store_date", e))?;
    let launch_year: Option<i64> = r.try_get("launch_year").map_err(db_err)?;
    let types_raw: Option<String> = r.try_get("types_raw").map_err(db_err)?;
    let counties_raw: Option<String> = r.try_get("counties_raw").map_err(db_err)?;
    let created_at: String = r.try_get("created_at").map_err(db_err)?;
    let updated_at: String = r.try_get("updated_at").map_err(db_err)?;

    Ok(Holiday {
        id: r.try_get("id").map_err(db_err)?,
        country_code: r.try_get("country_code").map_err(db_err)?,
        date,
        local_name: r.try_get("local_name").map_err(db_err)?,
        name: r.try_get("name").map_err(db_err)?,
        global: r.try_get("is_global").map_err(db_err)?,
        fixed: r.try_get("is_fixed").map_err(db_err)?,
        launch_year: launch_year.and_then(|y| i32::try_from(y).ok()),
        types: parse_types_raw(types_raw.as_deref())?,
        counties: parse_counties_raw(counties_raw.as_deref()),
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
    })
}

#[async_trait]
impl HolidayStore for SqliteHolidayStore {
    async fn country_exists(&self, code: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM country WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn find_country(&self, code: &str) -> Result<Country> {
        let row = sqlx::query(
            "SELECT id, code, name, created_at, updated_at FROM country WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(r) => row_to_country(&r),
            None => Err(Error::NotFound(format!(
                "country code '{code}' does not exist"
            ))),
        }
    }

    async fn list_countries(&self) -> Result<Vec<Country>> {
        let rows = sqlx::query(
            "SELECT id, code, name, created_at, updated_at FROM country ORDER BY code ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_country).collect()
    }

    async fn insert_country_if_absent(&self, command: &CountryUpsertCommand) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let res = sqlx::query(
            "INSERT INTO country (code, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(code) DO NOTHING",
        )
        .bind(&command.code)
        .bind(&command.name)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    #[tracing::instrument(level = "debug", skip(self, holidays), fields(country = %country.code, count = holidays.len()))]
    async fn replace_holidays_in_range(
        &self,
        country: &Country,
        range: DateRange,
        holidays: &[HolidayUpsertCommand],
    ) -> Result<u64> {
        validate_replacement(country, range, holidays)?;

        // Write first: the transaction must take the write lock before any read.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "DELETE FROM holiday
             WHERE country_id = (SELECT id FROM country WHERE code = ?1)
               AND date >= ?2 AND date <= ?3",
        )
        .bind(&country.code)
        .bind(fmt_date(range.start))
        .bind(fmt_date(range.end))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let country_id: i64 = sqlx::query("SELECT id FROM country WHERE code = ?1")
            .bind(&country.code)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| {
                Error::NotFound(format!("country code '{}' does not exist", country.code))
            })?
            .try_get("id")
            .map_err(db_err)?;

        let now = Utc::now().to_rfc3339();
        let mut inserted = 0u64;
        for h in holidays {
            let res = sqlx::query(
                "INSERT INTO holiday (country_id, date, local_name, name, is_global, is_fixed,
                                      launch_year, types_raw, counties_raw, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            )
            .bind(country_id)
            .bind(fmt_date(h.date))
            .bind(&h.local_name)
            .bind(&h.name)
            .bind(h.global)
            .bind(h.fixed)
            .bind(h.launch_year.map(i64::from))
            .bind(h.types_raw())
            .bind(h.counties_raw())
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            inserted += res.rows_affected();
        }

        tx.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    async fn delete_holidays_in_range(&self, country_code: &str, range: DateRange) -> Result<u64> {
        let res = sqlx::query(
            "DELETE FROM holiday
             WHERE country_id = (SELECT id FROM country WHERE code = ?1)
               AND date >= ?2 AND date <= ?3",
        )
        .bind(country_code)
        .bind(fmt_date(range.start))
        .bind(fmt_date(range.end))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(res.rows_affected())
    }

    async fn search_holidays(
        &self,
        filter: &HolidaySearchFilter,
        page: &PageRequest,
    ) -> Result<Page<Holiday>> {
        let mut conditions = vec![
            "c.code = ?1".to_string(),
            "h.date >= ?2".to_string(),
            "h.date <= ?3".to_string(),
        ];
        // Tag-boundary match so "Public" never matches a hypothetical "PublicX".
        if filter.holiday_type.is_some() {
            conditions.push("(',' || COALESCE(h.types_raw, '') || ',') LIKE ?4".to_string());
        }
        let where_clause = conditions.join(" AND ");

        let order_by = page
            .effective_sort()
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{} {dir}", o.field.column())
            })
            .collect::<Vec<_>>()
            .join(", ");
        let (limit_param, offset_param) = if filter.holiday_type.is_some() {
            (5, 6)
        } else {
            (4, 5)
        };

        let count_sql = format!(
            "SELECT COUNT(*) AS total FROM holiday h JOIN country c ON c.id = h.country_id
             WHERE {where_clause}"
        );
        let select_sql = format!(
            "SELECT h.id, c.code AS country_code, h.date, h.local_name, h.name, h.is_global,
                    h.is_fixed, h.launch_year, h.types_raw, h.counties_raw, h.created_at,
                    h.updated_at
             FROM holiday h JOIN country c ON c.id = h.country_id
             WHERE {where_clause}
             ORDER BY {order_by}
             LIMIT ?{limit_param} OFFSET ?{offset_param}"
        );

        let start = fmt_date(filter.range.start);
        let end = fmt_date(filter.range.end);
        let tag = filter.holiday_type.map(|t| format!("%,{},%", t.as_str()));

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut count_q = sqlx::query(&count_sql)
            .bind(&filter.country_code)
            .bind(&start)
            .bind(&end);
        if let Some(tag) = &tag {
            count_q = count_q.bind(tag);
        }
        let total: i64 = count_q
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?
            .try_get("total")
            .map_err(db_err)?;

        let mut select_q = sqlx::query(&select_sql)
            .bind(&filter.country_code)
            .bind(&start)
            .bind(&end);
        if let Some(tag) = &tag {
            select_q = select_q.bind(tag);
        }
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let rows = select_q
            .bind(i64::from(page.size))
            .bind(offset)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        let content = rows.iter().map(row_to_holiday).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(content, page, u64::try_from(total).unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HolidayType;
    use crate::store::models::SortOrder;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn cmd(code: &str, date: &str, local_name: &str) -> HolidayUpsertCommand {
        HolidayUpsertCommand {
            country_code: code.into(),
            date: d(date),
            local_name: local_name.into(),
            name: format!("{local_name} (en)"),
            global: true,
            fixed: false,
            launch_year: None,
            types: vec![HolidayType::Public],
            counties: None,
        }
    }

    async fn store_with(codes: &[&str]) -> SqliteHolidayStore {
        let store = SqliteHolidayStore::in_memory().await.unwrap();
        for code in codes {
            store
                .insert_country_if_absent(&CountryUpsertCommand {
                    code: (*code).into(),
                    name: format!("Country {code}"),
                })
                .await
                .unwrap();
        }
        store
    }

    fn filter(code: &str, range: DateRange, t: Option<HolidayType>) -> HolidaySearchFilter {
        HolidaySearchFilter {
            country_code: code.into(),
            range,
            holiday_type: t,
        }
    }

    #[tokio::test]
    async fn countries_insert_once_and_list_by_code() {
        let store = store_with(&["US", "KR"]).await;
        let again = store
            .insert_country_if_absent(&CountryUpsertCommand {
                code: "KR".into(),
                name: "renamed".into(),
            })
            .await
            .unwrap();
        assert!(!again);

        let codes: Vec<String> = store
            .list_countries()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["KR", "US"]);
        assert_eq!(store.find_country("KR").await.unwrap().name, "Country KR");
        assert!(store.country_exists("US").await.unwrap());
        assert!(!store.country_exists("us").await.unwrap());
        assert!(matches!(
            store.find_country("ZZ").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn replace_round_trips_every_column() {
        let store = store_with(&["US"]).await;
        let us = store.find_country("US").await.unwrap();
        let y = DateRange::for_year(2024).unwrap();
        let mut c = cmd("US", "2024-07-04", "Independence Day");
        c.fixed = true;
        c.global = false;
        c.launch_year = Some(1776);
        c.types = vec![HolidayType::Public, HolidayType::Bank];
        c.counties = Some(vec!["US-MA".into(), "US-ME".into()]);

        assert_eq!(store.replace_holidays_in_range(&us, y, &[c]).await.unwrap(), 1);

        let page = store
            .search_holidays(&filter("US", y, None), &PageRequest::default())
            .await
            .unwrap();
        let h = &page.content[0];
        assert_eq!(h.country_code, "US");
        assert_eq!(h.date, d("2024-07-04"));
        assert!(h.fixed);
        assert!(!h.global);
        assert_eq!(h.launch_year, Some(1776));
        assert_eq!(h.types, vec![HolidayType::Public, HolidayType::Bank]);
        assert_eq!(h.counties, vec!["US-MA".to_string(), "US-ME".to_string()]);
    }

    #[tokio::test]
    async fn replace_is_scoped_to_country_and_range() {
        let store = store_with(&["KR", "US"]).await;
        let kr = store.find_country("KR").await.unwrap();
        let us = store.find_country("US").await.unwrap();
        let both = DateRange::for_years(2023, 2024).unwrap();
        store
            .replace_holidays_in_range(
                &kr,
                both,
                &[cmd("KR", "2023-01-01", "신정"), cmd("KR", "2024-01-01", "신정")],
            )
            .await
            .unwrap();
        store
            .replace_holidays_in_range(&us, both, &[cmd("US", "2024-01-01", "New Year's Day")])
            .await
            .unwrap();

        let y2024 = DateRange::for_year(2024).unwrap();
        store
            .replace_holidays_in_range(&kr, y2024, &[cmd("KR", "2024-03-01", "삼일절")])
            .await
            .unwrap();

        let kr_page = store
            .search_holidays(&filter("KR", both, None), &PageRequest::default())
            .await
            .unwrap();
        let kr_dates: Vec<NaiveDate> = kr_page.content.iter().map(|h| h.date).collect();
        assert_eq!(kr_dates, vec![d("2023-01-01"), d("2024-03-01")]);

        let us_page = store
            .search_holidays(&filter("US", both, None), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(us_page.total_elements, 1);
    }

    #[tokio::test]
    async fn replace_with_invalid_rows_leaves_existing_rows() {
        let store = store_with(&["KR"]).await;
        let kr = store.find_country("KR").await.unwrap();
        let y = DateRange::for_year(2024).unwrap();
        store
            .replace_holidays_in_range(&kr, y, &[cmd("KR", "2024-01-01", "신정")])
            .await
            .unwrap();

        let dup = [cmd("KR", "2024-05-05", "어린이날"), cmd("KR", "2024-05-05", "어린이날")];
        assert!(store.replace_holidays_in_range(&kr, y, &dup).await.is_err());

        let page = store
            .search_holidays(&filter("KR", y, None), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].local_name, "신정");
    }

    #[tokio::test]
    async fn type_filter_uses_tag_boundaries() {
        let store = store_with(&["DE"]).await;
        let de = store.find_country("DE").await.unwrap();
        let y = DateRange::for_year(2024).unwrap();
        let mut a = cmd("DE", "2024-01-01", "Neujahr");
        a.types = vec![HolidayType::Public, HolidayType::Bank];
        let mut b = cmd("DE", "2024-01-06", "Heilige Drei Könige");
        b.types = vec![HolidayType::Observance];
        let mut c = cmd("DE", "2024-05-01", "Tag der Arbeit");
        c.types = vec![];
        store.replace_holidays_in_range(&de, y, &[a, b, c]).await.unwrap();

        let bank = store
            .search_holidays(&filter("DE", y, Some(HolidayType::Bank)), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(bank.total_elements, 1);
        assert_eq!(bank.content[0].local_name, "Neujahr");

        let school = store
            .search_holidays(&filter("DE", y, Some(HolidayType::School)), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(school.total_elements, 0);
        assert!(school.content.is_empty());
    }

    #[tokio::test]
    async fn search_pages_with_stable_order() {
        let store = store_with(&["KR"]).await;
        let kr = store.find_country("KR").await.unwrap();
        let y = DateRange::for_year(2024).unwrap();
        let cmds = [
            cmd("KR", "2024-02-10", "설날"),
            cmd("KR", "2024-02-09", "설날 전날"),
            cmd("KR", "2024-02-11", "설날 다음날"),
            cmd("KR", "2024-01-01", "신정"),
            cmd("KR", "2024-03-01", "삼일절"),
        ];
        store.replace_holidays_in_range(&kr, y, &cmds).await.unwrap();

        let first = store
            .search_holidays(&filter("KR", y, None), &PageRequest::new(0, 2, vec![]).unwrap())
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = first.content.iter().map(|h| h.date).collect();
        assert_eq!(dates, vec![d("2024-01-01"), d("2024-02-09")]);
        assert_eq!(first.total_elements, 5);
        assert_eq!(first.total_pages, 3);

        let req = PageRequest::new(2, 2, vec![SortOrder::parse("date,desc").unwrap()]).unwrap();
        let last = store.search_holidays(&filter("KR", y, None), &req).await.unwrap();
        assert_eq!(last.content.len(), 1);
        assert_eq!(last.content[0].date, d("2024-01-01"));
    }

    #[tokio::test]
    async fn delete_reports_removed_rows() {
        let store = store_with(&["KR"]).await;
        let kr = store.find_country("KR").await.unwrap();
        let y = DateRange::for_year(2024).unwrap();
        store
            .replace_holidays_in_range(
                &kr,
                y,
                &[cmd("KR", "2024-01-01", "신정"), cmd("KR", "2024-03-01", "삼일절")],
            )
            .await
            .unwrap();

        assert_eq!(store.delete_holidays_in_range("KR", y).await.unwrap(), 2);
        assert_eq!(store.delete_holidays_in_range("KR", y).await.unwrap(), 0);
        assert_eq!(store.delete_holidays_in_range("ZZ", y).await.unwrap(), 0);
    }

    fn temp_db(name: &str) -> (std::path::PathBuf, String) {
        let dir = std::env::temp_dir().join(format!(
            "holidays-sqlite-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("holidays.db").to_string_lossy().to_string();
        (dir, path)
    }

    /// `count` consecutive days from Jan 1 2024, local names prefixed with `tag`.
    fn generation(code: &str, tag: &str, count: u64) -> Vec<HolidayUpsertCommand> {
        (0..count)
            .map(|i| {
                let mut c = cmd(code, "2024-01-01", &format!("{tag} {i}"));
                c.date = d("2024-01-01") + chrono::Days::new(i);
                c
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_replaces_for_distinct_countries_all_commit() {
        let (dir, path) = temp_db("writers");
        let store = SqliteHolidayStore::connect(&path).await.unwrap();
        let codes: Vec<String> = (0..8).map(|i| format!("C{i}")).collect();
        for code in &codes {
            store
                .insert_country_if_absent(&CountryUpsertCommand {
                    code: code.clone(),
                    name: format!("Country {code}"),
                })
                .await
                .unwrap();
        }
        let y = DateRange::for_year(2024).unwrap();

        let mut tasks = Vec::new();
        for code in codes.clone() {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let country = store.find_country(&code).await?;
                for round in 0..10u64 {
                    let rows = generation(&code, &format!("r{round}"), 1 + round % 3);
                    store.replace_holidays_in_range(&country, y, &rows).await?;
                }
                Ok::<_, Error>(())
            }));
        }
        let mut errors = Vec::new();
        for task in tasks {
            if let Err(e) = task.await.unwrap() {
                errors.push(e.to_string());
            }
        }
        assert!(errors.is_empty(), "failed writes: {errors:?}");

        for code in &codes {
            let page = store
                .search_holidays(&filter(code, y, None), &PageRequest::default())
                .await
                .unwrap();
            assert_eq!(page.total_elements, 1, "{code}");
            assert_eq!(page.content[0].local_name, "r9 0");
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_partial_replace() {
        let (dir, path) = temp_db("atomic");
        let store = SqliteHolidayStore::connect(&path).await.unwrap();
        store
            .insert_country_if_absent(&CountryUpsertCommand {
                code: "KR".into(),
                name: "South Korea".into(),
            })
            .await
            .unwrap();
        let kr = store.find_country("KR").await.unwrap();
        let y = DateRange::for_year(2024).unwrap();
        let small = generation("KR", "small", 50);
        let large = generation("KR", "large", 200);
        store.replace_holidays_in_range(&kr, y, &small).await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for round in 0..20 {
                    let rows = if round % 2 == 0 { &large } else { &small };
                    store.replace_holidays_in_range(&kr, y, rows).await?;
                }
                Ok::<_, Error>(())
            })
        };

        let req = PageRequest::new(0, 1000, vec![]).unwrap();
        let mut reads = 0;
        let mut mixed = 0;
        while !writer.is_finished() || reads == 0 {
            let page = store.search_holidays(&filter("KR", y, None), &req).await.unwrap();
            reads += 1;
            let expected_prefix = match page.total_elements {
                50 => "small ",
                200 => "large ",
                _ => {
                    mixed += 1;
                    continue;
                }
            };
            let consistent = page.content.len() as u64 == page.total_elements
                && page
                    .content
                    .iter()
                    .all(|h| h.local_name.starts_with(expected_prefix));
            if !consistent {
                mixed += 1;
            }
        }
        writer.await.unwrap().unwrap();

        assert!(reads > 0);
        assert_eq!(mixed, 0, "{mixed} of {reads} reads saw a partial replace");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!(
            "holidays-sqlite-test-{}",
            std::process::id()
        ));
        let path = dir.join("nested").join("holidays.db");
        let path_str = path.to_string_lossy().to_string();
        {
            let store = SqliteHolidayStore::connect(&path_str).await.unwrap();
            store
                .insert_country_if_absent(&CountryUpsertCommand {
                    code: "JP".into(),
                    name: "Japan".into(),
                })
                .await
                .unwrap();
        }
        let reopened = SqliteHolidayStore::connect(&path_str).await.unwrap();
        assert!(reopened.country_exists("JP").await.unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
