use rust_decimal::Decimal;

use crate::error::{EngineResult, UnitError};
use crate::result::row::ResultRow;
use crate::types::number::EngineNumber;

/// Combines same-unit `ResultRow`s field-by-field (P4: commutative,
/// associative when units match; fails deterministically when they don't).
/// `scenario`/`trial`/`application`/`substance`/`year` are taken from the
/// first row; callers are responsible for only aggregating rows that share
/// those identifiers when that's the intended semantics.
pub fn aggregate(rows: &[ResultRow]) -> EngineResult<ResultRow> {
    let mut iter = rows.iter();
    let first = iter
        .next()
        .ok_or_else(|| UnitError::MissingContext {
            needed: "at least one row to aggregate".to_string(),
        })?
        .clone();
    iter.try_fold(first, |acc, row| add_rows(&acc, row))
}

fn add_rows(a: &ResultRow, b: &ResultRow) -> EngineResult<ResultRow> {
    Ok(ResultRow {
        scenario: a.scenario.clone(),
        trial: a.trial,
        application: a.application.clone(),
        substance: a.substance.clone(),
        year: a.year,
        domestic: a.domestic.checked_add(&b.domestic)?,
        import: a.import.checked_add(&b.import)?,
        export: a.export.checked_add(&b.export)?,
        recycle: a.recycle.checked_add(&b.recycle)?,
        domestic_consumption: a.domestic_consumption.checked_add(&b.domestic_consumption)?,
        import_consumption: a.import_consumption.checked_add(&b.import_consumption)?,
        export_consumption: a.export_consumption.checked_add(&b.export_consumption)?,
        recycle_consumption: a.recycle_consumption.checked_add(&b.recycle_consumption)?,
        population: a.population.checked_add(&b.population)?,
        population_new: a.population_new.checked_add(&b.population_new)?,
        recharge_emissions: a.recharge_emissions.checked_add(&b.recharge_emissions)?,
        eol_emissions: a.eol_emissions.checked_add(&b.eol_emissions)?,
        initial_charge_emissions: a.initial_charge_emissions.checked_add(&b.initial_charge_emissions)?,
        energy_consumption: a.energy_consumption.checked_add(&b.energy_consumption)?,
        import_initial_charge_value: a.import_initial_charge_value.checked_add(&b.import_initial_charge_value)?,
        import_initial_charge_consumption: a
            .import_initial_charge_consumption
            .checked_add(&b.import_initial_charge_consumption)?,
        import_population: a.import_population.checked_add(&b.import_population)?,
        export_initial_charge_value: a.export_initial_charge_value.checked_add(&b.export_initial_charge_value)?,
        export_initial_charge_consumption: a
            .export_initial_charge_consumption
            .checked_add(&b.export_initial_charge_consumption)?,
        bank_kg: a.bank_kg.checked_add(&b.bank_kg)?,
        bank_tco2e: a.bank_tco2e.checked_add(&b.bank_tco2e)?,
        bank_change_kg: a.bank_change_kg.checked_add(&b.bank_change_kg)?,
        bank_change_tco2e: a.bank_change_tco2e.checked_add(&b.bank_change_tco2e)?,
    })
}

/// Projects a row onto the exporter-attributed trade variant (§4.6, P5): a
/// pure transform rather than a wrapper type, since attribution is just a
/// read-only view over the same row's fields.
pub fn attribute_to_exporter(row: &ResultRow) -> ResultRow {
    let mut out = row.clone();
    let import_charge = non_negative(row.import_initial_charge_value.value);
    let import_charge_consumption = non_negative(row.import_initial_charge_consumption.value);
    let export_charge = non_negative(row.export_initial_charge_value.value);
    let export_charge_consumption = non_negative(row.export_initial_charge_consumption.value);

    out.import = EngineNumber::new(row.import.value - import_charge, row.import.units);
    out.import_consumption =
        EngineNumber::new(row.import_consumption.value - import_charge_consumption, row.import_consumption.units);
    out.export = EngineNumber::new(row.export.value + export_charge, row.export.units);
    out.export_consumption =
        EngineNumber::new(row.export_consumption.value + export_charge_consumption, row.export_consumption.units);
    out
}

fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
