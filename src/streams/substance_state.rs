use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::streams::stream::{SalesStream, Stream};
use crate::types::number::EngineNumber;

/// Where recycled substance was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecycleStage {
    Eol,
    Recharge,
}

/// One `recover` program: `(recoveryRate, yieldRate, stage, induction?)`.
/// `induction` is resolved once, when the command is interpreted for the
/// year's recalc pass, and never re-resolved later in that same pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleProgram {
    pub recovery_rate: EngineNumber,
    pub yield_rate: EngineNumber,
    pub stage: RecycleStage,
    pub induction: Option<Decimal>,
    pub displacing: Option<String>,
}

/// Per (scope, year) substance parameters and stream values. One instance
/// lives per `UseKey` per year inside the [`super::keeper::StreamKeeper`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubstanceState {
    pub values: HashMap<Stream, EngineNumber>,
    pub enabled: Vec<SalesStream>,
    pub initial_charge: HashMap<SalesStream, EngineNumber>,
    pub gwp: Option<EngineNumber>,
    pub energy_intensity: Option<EngineNumber>,
    pub retire_rate: Option<EngineNumber>,
    pub retire_with_replacement: bool,
    pub recharge_population: Option<EngineNumber>,
    pub recharge_intensity: Option<EngineNumber>,
    pub recycle_programs: Vec<RecycleProgram>,
    pub last_specified: HashMap<Stream, EngineNumber>,
    /// Set by the most recent `set`/`change` on a sales stream: `true` when
    /// the user specified the stream in equipment units. Drives the
    /// unit-based/volume-based discriminator in the sales recalc (§4.3.2).
    pub sales_specified_in_units: bool,
    /// Displacement target recorded by the most recent `cap`/`floor`, if any.
    pub displacing: Option<String>,
    /// Informational emissions figures recomputed each recalc pass (§4.4);
    /// reported in the CSV but not fed back into the bank.
    pub recharge_emissions_tco2e: Decimal,
    pub eol_emissions_tco2e: Decimal,
    pub initial_charge_emissions_tco2e: Decimal,
}

impl SubstanceState {
    pub fn is_enabled(&self, stream: SalesStream) -> bool {
        self.enabled.contains(&stream)
    }

    pub fn get(&self, stream: Stream) -> Option<&EngineNumber> {
        self.values.get(&stream)
    }

    /// Writes a stream value. Only user commands should also update
    /// `last_specified`; derived recalculation writes go through
    /// [`Self::set_derived`] instead.
    pub fn set_user_specified(&mut self, stream: Stream, value: EngineNumber) {
        self.last_specified.insert(stream, value.clone());
        self.values.insert(stream, value);
    }

    pub fn set_derived(&mut self, stream: Stream, value: EngineNumber) {
        self.values.insert(stream, value);
    }

    pub fn last_specified_or_current(&self, stream: Stream) -> Option<&EngineNumber> {
        self.last_specified.get(&stream).or_else(|| self.values.get(&stream))
    }
}
