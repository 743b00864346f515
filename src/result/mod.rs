//! The result model (§4.6): one [`row::ResultRow`] per (scenario, trial,
//! application, substance, year), combined by [`aggregate::aggregate`] and
//! re-projected for trade attribution by [`aggregate::attribute_to_exporter`].

pub mod aggregate;
pub mod row;

pub use aggregate::{aggregate, attribute_to_exporter};
pub use row::ResultRow;
