use crate::types::number::EngineNumber;

/// Read-only context a unit conversion may need. Bundled into an immutable
/// borrow passed to the converter rather than read from thread-local or
/// engine-wide mutable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionContext<'a> {
    /// The value being resolved against, when converting a bare `%`.
    pub last_specified: Option<&'a EngineNumber>,
    /// Falls back to the current stream value when no `last_specified` is recorded.
    pub current: Option<&'a EngineNumber>,
    pub population: Option<&'a EngineNumber>,
    pub prior_population: Option<&'a EngineNumber>,
    /// kg/unit, used for `kg <-> units` conversions.
    pub amortized_unit_volume: Option<&'a EngineNumber>,
    /// kgCO2e/kg or tCO2e/mt, used for `kg/mt <-> tCO2e/kgCO2e` conversions.
    pub gwp: Option<&'a EngineNumber>,
    /// kwh/unit or kwh/kg.
    pub energy_intensity: Option<&'a EngineNumber>,
}

impl<'a> ConversionContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current(mut self, value: &'a EngineNumber) -> Self {
        self.current = Some(value);
        self
    }

    pub fn with_last_specified(mut self, value: Option<&'a EngineNumber>) -> Self {
        self.last_specified = value;
        self
    }

    pub fn with_population(mut self, population: &'a EngineNumber, prior: &'a EngineNumber) -> Self {
        self.population = Some(population);
        self.prior_population = Some(prior);
        self
    }

    pub fn with_amortized_unit_volume(mut self, value: &'a EngineNumber) -> Self {
        self.amortized_unit_volume = Some(value);
        self
    }

    pub fn with_gwp(mut self, value: &'a EngineNumber) -> Self {
        self.gwp = Some(value);
        self
    }

    pub fn with_energy_intensity(mut self, value: &'a EngineNumber) -> Self {
        self.energy_intensity = Some(value);
        self
    }

    /// The base to resolve a bare `%` against: last-specified value for the
    /// governing stream if present, else the current stream value.
    pub fn percent_base(&self) -> Option<&'a EngineNumber> {
        self.last_specified.or(self.current)
    }
}
