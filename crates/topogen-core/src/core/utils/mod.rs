//! Element data, unit conversions and small geometric helpers.

pub mod elements;
pub mod geometry;
pub mod units;
