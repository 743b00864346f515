use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::UnitError;

/// The closed set of scalar units the engine understands. Composite units
/// (`kg / unit`, `tCO2e / mt`, ...) are a numerator paired with an optional
/// denominator, rather than a dynamic string label; string labels only
/// appear at the CSV/parser boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseUnit {
    Kilogram,
    MetricTon,
    Equipment,
    Kwh,
    Mwh,
    TCo2e,
    KgCo2e,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub numerator: BaseUnit,
    pub denominator: Option<BaseUnit>,
    pub per_year: bool,
}

impl Unit {
    pub const fn simple(numerator: BaseUnit) -> Self {
        Unit {
            numerator,
            denominator: None,
            per_year: false,
        }
    }

    pub const fn ratio(numerator: BaseUnit, denominator: BaseUnit) -> Self {
        Unit {
            numerator,
            denominator: Some(denominator),
            per_year: false,
        }
    }

    pub const fn kg() -> Self {
        Self::simple(BaseUnit::Kilogram)
    }

    pub const fn mt() -> Self {
        Self::simple(BaseUnit::MetricTon)
    }

    pub const fn units() -> Self {
        Self::simple(BaseUnit::Equipment)
    }

    pub const fn percent() -> Self {
        Self::simple(BaseUnit::Percent)
    }

    pub const fn percent_per_year() -> Self {
        Unit {
            numerator: BaseUnit::Percent,
            denominator: None,
            per_year: true,
        }
    }

    pub const fn kg_per_unit() -> Self {
        Self::ratio(BaseUnit::Kilogram, BaseUnit::Equipment)
    }

    pub const fn kgco2e_per_kg() -> Self {
        Self::ratio(BaseUnit::KgCo2e, BaseUnit::Kilogram)
    }

    pub const fn tco2e_per_mt() -> Self {
        Self::ratio(BaseUnit::TCo2e, BaseUnit::MetricTon)
    }

    pub const fn kwh_per_unit() -> Self {
        Self::ratio(BaseUnit::Kwh, BaseUnit::Equipment)
    }

    pub const fn kwh() -> Self {
        Self::simple(BaseUnit::Kwh)
    }

    pub const fn mwh() -> Self {
        Self::simple(BaseUnit::Mwh)
    }

    pub const fn tco2e() -> Self {
        Self::simple(BaseUnit::TCo2e)
    }

    pub const fn kgco2e() -> Self {
        Self::simple(BaseUnit::KgCo2e)
    }

    pub fn is_volume(&self) -> bool {
        self.denominator.is_none()
            && !self.per_year
            && matches!(self.numerator, BaseUnit::Kilogram | BaseUnit::MetricTon)
    }

    pub fn is_equipment(&self) -> bool {
        self.denominator.is_none()
            && !self.per_year
            && matches!(self.numerator, BaseUnit::Equipment)
    }

    pub fn is_ghg(&self) -> bool {
        self.denominator.is_none()
            && !self.per_year
            && matches!(self.numerator, BaseUnit::TCo2e | BaseUnit::KgCo2e)
    }

    pub fn is_percent(&self) -> bool {
        matches!(self.numerator, BaseUnit::Percent) && self.denominator.is_none()
    }
}

impl fmt::Display for BaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BaseUnit::Kilogram => "kg",
            BaseUnit::MetricTon => "mt",
            BaseUnit::Equipment => "unit",
            BaseUnit::Kwh => "kwh",
            BaseUnit::Mwh => "mwh",
            BaseUnit::TCo2e => "tCO2e",
            BaseUnit::KgCo2e => "kgCO2e",
            BaseUnit::Percent => "%",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.denominator, self.per_year) {
            (Some(denom), false) => write!(f, "{} / {}", self.numerator, denom),
            (None, true) => write!(f, "{} / year", self.numerator),
            (None, false) => write!(f, "{}", self.numerator),
            (Some(denom), true) => write!(f, "{} / {} / year", self.numerator, denom),
        }
    }
}

/// A value + unit pair with an exact decimal value. `original_text`, when
/// present, is what the parser literally handed the engine for this number
/// and is preferred on CSV re-emission over re-formatting `value`, so a
/// round-tripped number keeps the precision the user actually wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineNumber {
    pub value: Decimal,
    pub units: Unit,
    pub original_text: Option<String>,
}

impl EngineNumber {
    pub fn new(value: Decimal, units: Unit) -> Self {
        EngineNumber {
            value,
            units,
            original_text: None,
        }
    }

    pub fn zero(units: Unit) -> Self {
        Self::new(Decimal::ZERO, units)
    }

    pub fn with_original_text(mut self, text: impl Into<String>) -> Self {
        self.original_text = Some(text.into());
        self
    }

    /// Adds two numbers of matching units, returning `UnitError::Mismatch`
    /// otherwise.
    pub fn checked_add(&self, other: &EngineNumber) -> Result<EngineNumber, UnitError> {
        if self.units != other.units {
            return Err(UnitError::Mismatch {
                from: other.units.to_string(),
                to: self.units.to_string(),
                reason: "cannot add mismatched units".to_string(),
            });
        }
        Ok(EngineNumber::new(self.value + other.value, self.units))
    }

    pub fn checked_sub(&self, other: &EngineNumber) -> Result<EngineNumber, UnitError> {
        if self.units != other.units {
            return Err(UnitError::Mismatch {
                from: other.units.to_string(),
                to: self.units.to_string(),
                reason: "cannot subtract mismatched units".to_string(),
            });
        }
        Ok(EngineNumber::new(self.value - other.value, self.units))
    }

    /// Formats as `"<number> <units>"` for CSV output.
    pub fn format_for_csv(&self) -> String {
        match &self.original_text {
            Some(text) => format!("{text} {}", self.units),
            None => format!("{} {}", self.value.normalize(), self.units),
        }
    }
}

impl fmt::Display for EngineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_for_csv())
    }
}
