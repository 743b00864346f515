//! Writes [`ResultRow`]s out in the exact header/quoting contract fixed by
//! §6: the `csv` crate handles quoting commas/quotes/newlines for us (its
//! default writer quotes a field only when it needs to), and every
//! `EngineNumber` field is rendered `"<number> <units>"` via
//! [`EngineNumber::format_for_csv`].

use std::io::Write;

use crate::error::{EngineResult, IoError};
use crate::result::ResultRow;

const HEADER: &[&str] = &[
    "scenario",
    "trial",
    "application",
    "substance",
    "year",
    "domestic",
    "import",
    "export",
    "recycle",
    "domesticConsumption",
    "importConsumption",
    "exportConsumption",
    "recycleConsumption",
    "population",
    "populationNew",
    "rechargeEmissions",
    "eolEmissions",
    "initialChargeEmissions",
    "energyConsumption",
    "importInitialChargeValue",
    "importInitialChargeConsumption",
    "importPopulation",
    "exportInitialChargeValue",
    "exportInitialChargeConsumption",
    "bankKg",
    "bankTCO2e",
    "bankChangeKg",
    "bankChangeTCO2e",
];

/// Writes the header row followed by one row per `rows` entry, in the
/// order given (the caller is expected to have already globally sorted
/// them per §5).
pub fn write_rows<W: Write>(writer: W, rows: &[ResultRow]) -> EngineResult<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(HEADER).map_err(IoError::Csv)?;
    for row in rows {
        csv_writer.write_record(row_fields(row)).map_err(IoError::Csv)?;
    }
    csv_writer.flush().map_err(|e| IoError::Open {
        path: "<writer>".to_string(),
        source: e,
    })?;
    Ok(())
}

fn row_fields(row: &ResultRow) -> Vec<String> {
    vec![
        row.scenario.clone(),
        row.trial.to_string(),
        row.application.clone(),
        row.substance.clone(),
        row.year.to_string(),
        row.domestic.format_for_csv(),
        row.import.format_for_csv(),
        row.export.format_for_csv(),
        row.recycle.format_for_csv(),
        row.domestic_consumption.format_for_csv(),
        row.import_consumption.format_for_csv(),
        row.export_consumption.format_for_csv(),
        row.recycle_consumption.format_for_csv(),
        row.population.format_for_csv(),
        row.population_new.format_for_csv(),
        row.recharge_emissions.format_for_csv(),
        row.eol_emissions.format_for_csv(),
        row.initial_charge_emissions.format_for_csv(),
        row.energy_consumption.format_for_csv(),
        row.import_initial_charge_value.format_for_csv(),
        row.import_initial_charge_consumption.format_for_csv(),
        row.import_population.format_for_csv(),
        row.export_initial_charge_value.format_for_csv(),
        row.export_initial_charge_consumption.format_for_csv(),
        row.bank_kg.format_for_csv(),
        row.bank_tco2e.format_for_csv(),
        row.bank_change_kg.format_for_csv(),
        row.bank_change_tco2e.format_for_csv(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::substance_state::SubstanceState;
    use crate::types::scope::UseKey;

    #[test]
    fn header_row_matches_the_pinned_contract() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let first_line = text.lines().next().unwrap();
        assert_eq!(
            first_line,
            "scenario,trial,application,substance,year,domestic,import,export,recycle,\
domesticConsumption,importConsumption,exportConsumption,recycleConsumption,\
population,populationNew,rechargeEmissions,eolEmissions,initialChargeEmissions,\
energyConsumption,importInitialChargeValue,importInitialChargeConsumption,importPopulation,\
exportInitialChargeValue,exportInitialChargeConsumption,bankKg,bankTCO2e,bankChangeKg,bankChangeTCO2e"
        );
    }

    #[test]
    fn row_values_are_formatted_as_number_space_units() {
        let state = SubstanceState::default();
        let key = UseKey::new("App", "Sub1");
        let row = ResultRow::collect("Baseline", 0, &key, 2025, &state);
        let mut buf = Vec::new();
        write_rows(&mut buf, &[row]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let data_line = text.lines().nth(1).unwrap();
        assert!(data_line.contains("0 kg"));
    }
}
