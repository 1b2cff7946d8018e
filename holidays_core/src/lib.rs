//! Holiday reference data: provider sync, range reconciliation and queries.

pub mod config;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod o11y;
pub mod query;
pub mod source;
pub mod store;
pub mod sync;
pub mod year_range;

pub use error::{Error, Result};
