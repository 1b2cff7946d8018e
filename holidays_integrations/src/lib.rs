//! Concrete `HolidaySource` implementations.

pub mod nager;

pub use nager::NagerClient;
