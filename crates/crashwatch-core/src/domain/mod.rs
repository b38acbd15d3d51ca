//! # Domain Models
//!
//! Canonical domain types for crashwatch.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`IndicatorReading`] | Normalized macro/valuation reading with derived status |
//! | [`IndicatorKey`] | One of the six scored indicators |
//! | [`Status`] | Safe / warning / danger tier |
//! | [`Quote`] | Validated price point for an [`Instrument`] |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Readings cannot be built with a status that disagrees with their thresholds,
//! and quotes cannot carry a zero or non-finite price.

mod indicator;
mod quote;
mod timestamp;

pub use indicator::{Direction, IndicatorKey, IndicatorReading, Status, Thresholds, Unit};
pub use quote::{Instrument, Quote};
pub use timestamp::UtcDateTime;
