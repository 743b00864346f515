use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::streams::stream::{ConsumptionSource, Stream};
use crate::streams::substance_state::SubstanceState;
use crate::types::number::{EngineNumber, Unit};
use crate::types::scope::UseKey;

/// One (scenario, trial, application, substance, year) snapshot. Built in
/// a single step from a [`SubstanceState`] rather than assembled through a
/// mutable builder, since every field is known up front once the scope's
/// streams are populated for the year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub scenario: String,
    pub trial: u32,
    pub application: String,
    pub substance: String,
    pub year: i64,

    pub domestic: EngineNumber,
    pub import: EngineNumber,
    pub export: EngineNumber,
    pub recycle: EngineNumber,

    pub domestic_consumption: EngineNumber,
    pub import_consumption: EngineNumber,
    pub export_consumption: EngineNumber,
    pub recycle_consumption: EngineNumber,

    pub population: EngineNumber,
    pub population_new: EngineNumber,

    pub recharge_emissions: EngineNumber,
    pub eol_emissions: EngineNumber,
    pub initial_charge_emissions: EngineNumber,

    pub energy_consumption: EngineNumber,

    pub import_initial_charge_value: EngineNumber,
    pub import_initial_charge_consumption: EngineNumber,
    pub import_population: EngineNumber,

    pub export_initial_charge_value: EngineNumber,
    pub export_initial_charge_consumption: EngineNumber,

    pub bank_kg: EngineNumber,
    pub bank_tco2e: EngineNumber,
    pub bank_change_kg: EngineNumber,
    pub bank_change_tco2e: EngineNumber,
}

impl ResultRow {
    /// Snapshots one (application, substance) scope for the given year,
    /// deriving `populationNew` and the trade-attribution fields from
    /// already-recorded streams rather than persisting them separately.
    pub fn collect(scenario: &str, trial: u32, key: &UseKey, year: i64, state: &SubstanceState) -> ResultRow {
        let kg = |s: Stream| state.get(s).cloned().unwrap_or_else(|| EngineNumber::zero(Unit::kg()));
        let tco2e = |s: Stream| state.get(s).cloned().unwrap_or_else(|| EngineNumber::zero(Unit::tco2e()));

        let domestic = kg(Stream::Domestic);
        let import = kg(Stream::Import);
        let export = kg(Stream::Export);
        let recycle = kg(Stream::Recycle);

        let population = state.get(Stream::Equipment).cloned().unwrap_or_else(|| EngineNumber::zero(Unit::units()));
        let prior_population = state
            .get(Stream::PriorEquipment)
            .cloned()
            .unwrap_or_else(|| EngineNumber::zero(Unit::units()));
        let retired = state.get(Stream::Retired).cloned().unwrap_or_else(|| EngineNumber::zero(Unit::units()));
        let population_new_value = population.value - prior_population.value + retired.value;
        let population_new = EngineNumber::new(population_new_value, Unit::units());

        let total_sales_kg = domestic.value + import.value;
        let import_share = if total_sales_kg.is_zero() {
            Decimal::ZERO
        } else {
            import.value / total_sales_kg
        };
        let import_population_value = population_new_value * import_share;
        let import_charge = state
            .initial_charge
            .get(&crate::streams::stream::SalesStream::Import)
            .map(|n| n.value)
            .unwrap_or(Decimal::ZERO);
        let import_initial_charge_value = import_population_value * import_charge;
        let gwp = state.gwp.as_ref().map(|n| n.value).unwrap_or(Decimal::ZERO);

        ResultRow {
            scenario: scenario.to_string(),
            trial,
            application: key.application.clone(),
            substance: key.substance.clone(),
            year,
            domestic_consumption: state
                .get(Stream::Consumption(ConsumptionSource::Domestic))
                .cloned()
                .unwrap_or_else(|| EngineNumber::zero(Unit::tco2e())),
            import_consumption: state
                .get(Stream::Consumption(ConsumptionSource::Import))
                .cloned()
                .unwrap_or_else(|| EngineNumber::zero(Unit::tco2e())),
            export_consumption: state
                .get(Stream::Consumption(ConsumptionSource::Export))
                .cloned()
                .unwrap_or_else(|| EngineNumber::zero(Unit::tco2e())),
            recycle_consumption: state
                .get(Stream::Consumption(ConsumptionSource::Recycle))
                .cloned()
                .unwrap_or_else(|| EngineNumber::zero(Unit::tco2e())),
            domestic,
            import,
            export,
            recycle,
            population,
            population_new,
            recharge_emissions: EngineNumber::new(state.recharge_emissions_tco2e, Unit::tco2e()),
            eol_emissions: EngineNumber::new(state.eol_emissions_tco2e, Unit::tco2e()),
            initial_charge_emissions: EngineNumber::new(state.initial_charge_emissions_tco2e, Unit::tco2e()),
            energy_consumption: energy_consumption(state),
            import_initial_charge_value: EngineNumber::new(import_initial_charge_value, Unit::kg()),
            import_initial_charge_consumption: tco2e_of(import_initial_charge_value, gwp),
            import_population: EngineNumber::new(import_population_value, Unit::units()),
            // Export does not drive new equipment in this model (§4.3 -
            // `sales = domestic + import + recycle`), so there is no
            // cross-border initial-charge mass to attribute to it by
            // default; see DESIGN.md.
            export_initial_charge_value: EngineNumber::zero(Unit::kg()),
            export_initial_charge_consumption: EngineNumber::zero(Unit::tco2e()),
            bank_kg: kg(Stream::BankKg),
            bank_tco2e: tco2e(Stream::BankTco2e),
            bank_change_kg: kg(Stream::BankChangeKg),
            bank_change_tco2e: tco2e(Stream::BankChangeTco2e),
        }
    }
}

fn tco2e_of(kg: Decimal, gwp_kgco2e_per_kg: Decimal) -> EngineNumber {
    EngineNumber::new(crate::recalc::consumption::to_tco2e(kg, gwp_kgco2e_per_kg), Unit::tco2e())
}

fn energy_consumption(state: &SubstanceState) -> EngineNumber {
    let Some(intensity) = &state.energy_intensity else {
        return EngineNumber::zero(Unit::kwh());
    };
    let population = state.get(Stream::Equipment).map(|n| n.value).unwrap_or(Decimal::ZERO);
    let sales = state.get(Stream::Sales).map(|n| n.value).unwrap_or(Decimal::ZERO);
    let value = if intensity.units == Unit::kwh_per_unit() {
        population * intensity.value
    } else {
        sales * intensity.value
    };
    EngineNumber::new(value, Unit::kwh())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_new_derives_from_equipment_delta_plus_retired() {
        let mut state = SubstanceState::default();
        state.set_derived(Stream::Equipment, EngineNumber::new(Decimal::from(1_945_000), Unit::units()));
        state.set_derived(Stream::PriorEquipment, EngineNumber::new(Decimal::from(1_000_000), Unit::units()));
        state.set_derived(Stream::Retired, EngineNumber::new(Decimal::from(50_000), Unit::units()));
        let key = UseKey::new("App", "Sub1");
        let row = ResultRow::collect("Baseline", 0, &key, 1, &state);
        assert_eq!(row.population_new.value, Decimal::from(995_000));
    }
}
