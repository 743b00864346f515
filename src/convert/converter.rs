use rust_decimal::Decimal;

use crate::convert::context::ConversionContext;
use crate::error::UnitError;
use crate::types::number::{BaseUnit, EngineNumber, Unit};

const ONE_THOUSAND: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
const ONE_HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Converts an [`EngineNumber`] to a target [`Unit`] within a
/// [`ConversionContext`]. Stateless: all required state is passed in
/// through the context, never read from engine-wide mutable state.
pub struct Converter;

impl Converter {
    pub fn convert(
        value: &EngineNumber,
        target: Unit,
        ctx: &ConversionContext,
    ) -> Result<EngineNumber, UnitError> {
        if value.units == target {
            return Ok(value.clone());
        }

        if value.units.is_percent() {
            return Self::resolve_percent(value, target, ctx);
        }

        if value.units.per_year != target.per_year {
            return Err(UnitError::Mismatch {
                from: value.units.to_string(),
                to: target.to_string(),
                reason: "rate (`/ year`) and non-rate units do not convert".to_string(),
            });
        }

        match (value.units.numerator, value.units.denominator, target.numerator, target.denominator) {
            (BaseUnit::Kwh, None, BaseUnit::Mwh, None) => {
                Ok(EngineNumber::new(value.value / ONE_THOUSAND, target))
            }
            (BaseUnit::Mwh, None, BaseUnit::Kwh, None) => {
                Ok(EngineNumber::new(value.value * ONE_THOUSAND, target))
            }
            (num, None, tnum, None)
                if is_volume_like(num) && is_volume_like(tnum) =>
            {
                let kg = to_kg(value, ctx)?;
                from_kg(kg, target, ctx)
            }
            _ => Err(UnitError::Mismatch {
                from: value.units.to_string(),
                to: target.to_string(),
                reason: "no conversion rule for this unit pair".to_string(),
            }),
        }
    }

    /// Resolves a bare `%` (or `% / year`) against the governing stream's
    /// last-specified value, else its current value.
    fn resolve_percent(
        value: &EngineNumber,
        target: Unit,
        ctx: &ConversionContext,
    ) -> Result<EngineNumber, UnitError> {
        let base = ctx.percent_base().ok_or_else(|| UnitError::MissingContext {
            needed: "last-specified or current value to resolve '%'".to_string(),
        })?;
        let fraction = value.value / ONE_HUNDRED;
        let resolved = EngineNumber::new(fraction * base.value, base.units);
        if resolved.units == target {
            Ok(resolved)
        } else {
            Self::convert(&resolved, target, ctx)
        }
    }
}

fn is_volume_like(unit: BaseUnit) -> bool {
    matches!(
        unit,
        BaseUnit::Kilogram | BaseUnit::MetricTon | BaseUnit::Equipment | BaseUnit::TCo2e | BaseUnit::KgCo2e
    )
}

/// Converts a volume-like quantity (kg, mt, units, tCO2e, kgCO2e) to kg.
fn to_kg(value: &EngineNumber, ctx: &ConversionContext) -> Result<Decimal, UnitError> {
    match value.units.numerator {
        BaseUnit::Kilogram => Ok(value.value),
        BaseUnit::MetricTon => Ok(value.value * ONE_THOUSAND),
        BaseUnit::Equipment => {
            let auv = ctx.amortized_unit_volume.ok_or_else(|| UnitError::MissingContext {
                needed: "amortized unit volume (kg/unit)".to_string(),
            })?;
            Ok(value.value * auv.value)
        }
        BaseUnit::TCo2e | BaseUnit::KgCo2e => {
            let gwp_kg_per_kg = gwp_as_kgco2e_per_kg(ctx)?;
            let kgco2e = match value.units.numerator {
                BaseUnit::TCo2e => value.value * ONE_THOUSAND,
                _ => value.value,
            };
            Ok(kgco2e / gwp_kg_per_kg)
        }
        _ => Err(UnitError::Mismatch {
            from: value.units.to_string(),
            to: "kg".to_string(),
            reason: "not a volume-like unit".to_string(),
        }),
    }
}

/// Converts a kg quantity into `target` (kg, mt, units, tCO2e, kgCO2e).
fn from_kg(kg: Decimal, target: Unit, ctx: &ConversionContext) -> Result<EngineNumber, UnitError> {
    match target.numerator {
        BaseUnit::Kilogram => Ok(EngineNumber::new(kg, target)),
        BaseUnit::MetricTon => Ok(EngineNumber::new(kg / ONE_THOUSAND, target)),
        BaseUnit::Equipment => {
            let auv = ctx.amortized_unit_volume.ok_or_else(|| UnitError::MissingContext {
                needed: "amortized unit volume (kg/unit)".to_string(),
            })?;
            Ok(EngineNumber::new(kg / auv.value, target))
        }
        BaseUnit::TCo2e => {
            let g = gwp_as_kgco2e_per_kg(ctx)?;
            Ok(EngineNumber::new(kg * g / ONE_THOUSAND, target))
        }
        BaseUnit::KgCo2e => {
            let g = gwp_as_kgco2e_per_kg(ctx)?;
            Ok(EngineNumber::new(kg * g, target))
        }
        _ => Err(UnitError::Mismatch {
            from: "kg".to_string(),
            to: target.to_string(),
            reason: "not a volume-like unit".to_string(),
        }),
    }
}

/// Normalizes the GWP context entry (which may be recorded as `kgCO2e/kg`
/// or `tCO2e/mt` — both equal in value) to a `kgCO2e/kg` scalar.
pub(crate) fn gwp_as_kgco2e_per_kg(ctx: &ConversionContext) -> Result<Decimal, UnitError> {
    let gwp = ctx.gwp.ok_or_else(|| UnitError::MissingContext {
        needed: "GWP intensity (kgCO2e/kg or tCO2e/mt)".to_string(),
    })?;
    match (gwp.units.numerator, gwp.units.denominator) {
        (BaseUnit::KgCo2e, Some(BaseUnit::Kilogram)) => Ok(gwp.value),
        (BaseUnit::TCo2e, Some(BaseUnit::MetricTon)) => Ok(gwp.value),
        _ => Err(UnitError::Mismatch {
            from: gwp.units.to_string(),
            to: "kgCO2e / kg".to_string(),
            reason: "GWP context must be kgCO2e/kg or tCO2e/mt".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn kg_to_mt_and_back_is_exact() {
        let ctx = ConversionContext::new();
        let kg = EngineNumber::new(d(1000), Unit::kg());
        let mt = Converter::convert(&kg, Unit::mt(), &ctx).unwrap();
        assert_eq!(mt.value, d(1));
        let back = Converter::convert(&mt, Unit::kg(), &ctx).unwrap();
        assert_eq!(back.value, kg.value);
    }

    #[test]
    fn kg_to_units_requires_amortized_unit_volume() {
        let ctx = ConversionContext::new();
        let kg = EngineNumber::new(d(100), Unit::kg());
        assert!(Converter::convert(&kg, Unit::units(), &ctx).is_err());

        let auv = EngineNumber::new(d(1), Unit::kg_per_unit());
        let ctx = ConversionContext::new().with_amortized_unit_volume(&auv);
        let units = Converter::convert(&kg, Unit::units(), &ctx).unwrap();
        assert_eq!(units.value, d(100));
    }

    #[test]
    fn kg_to_tco2e_uses_gwp() {
        let gwp = EngineNumber::new(d(1430), Unit::kgco2e_per_kg());
        let ctx = ConversionContext::new().with_gwp(&gwp);
        let kg = EngineNumber::new(d(1000), Unit::kg());
        let tco2e = Converter::convert(&kg, Unit::tco2e(), &ctx).unwrap();
        // 1000 kg * 1430 kgCO2e/kg = 1,430,000 kgCO2e = 1430 tCO2e
        assert_eq!(tco2e.value, d(1430));
    }

    #[test]
    fn percent_resolves_against_last_specified() {
        let last = EngineNumber::new(d(1000), Unit::kg());
        let ctx = ConversionContext::new().with_last_specified(Some(&last));
        let pct = EngineNumber::new(d(10), Unit::percent());
        let resolved = Converter::convert(&pct, Unit::kg(), &ctx).unwrap();
        assert_eq!(resolved.value, d(100));
    }

    #[test]
    fn percent_falls_back_to_current_when_no_last_specified() {
        let current = EngineNumber::new(d(2000), Unit::kg());
        let ctx = ConversionContext::new().with_current(&current);
        let pct = EngineNumber::new(d(5), Unit::percent());
        let resolved = Converter::convert(&pct, Unit::kg(), &ctx).unwrap();
        assert_eq!(resolved.value, d(100));
    }
}
