//! Core value types shared across the engine: [`EngineNumber`]/[`Unit`],
//! [`Scope`]/[`UseKey`] and [`YearMatcher`].

pub mod number;
pub mod scope;
pub mod year_matcher;

pub use number::{BaseUnit, EngineNumber, Unit};
pub use scope::{Scope, Stanza, UseKey};
pub use year_matcher::{YearBound, YearMatcher};
