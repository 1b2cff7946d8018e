//! Read path: date/type filtered, paged holiday search and country listing.

pub mod engine;
pub mod models;

pub use engine::QueryEngine;
pub use models::{CountryResponse, HolidayResponse, HolidaySearchQuery};
