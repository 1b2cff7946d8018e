//! Reconciliation store: trait, paging models and backends.
//!
//! - `memory`: process-local store for tests and ephemeral runs
//! - `sqlite`: durable single-file store (WAL mode) via `sqlx`

pub mod memory;
pub mod models;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryHolidayStore;
pub use models::{HolidaySearchFilter, Page, PageRequest, SortDirection, SortField, SortOrder};
pub use sqlite::SqliteHolidayStore;
pub use traits::HolidayStore;
