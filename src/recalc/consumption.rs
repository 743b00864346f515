use rust_decimal::Decimal;

const ONE_THOUSAND: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Converts a kg volume to its tCO2e twin given a GWP intensity recorded as
/// kgCO2e/kg.
pub fn to_tco2e(kg: Decimal, gwp_kgco2e_per_kg: Decimal) -> Decimal {
    kg * gwp_kgco2e_per_kg / ONE_THOUSAND
}

/// Net emissions attributable to recharge this year: leaked recharge volume
/// that was not recovered by a recycling program, expressed in tCO2e.
pub fn recharge_emissions_tco2e(
    recharge_volume_kg: Decimal,
    recycled_recharge_kg: Decimal,
    gwp_kgco2e_per_kg: Decimal,
) -> Decimal {
    to_tco2e(recharge_volume_kg - recycled_recharge_kg, gwp_kgco2e_per_kg)
}

/// Net emissions attributable to end-of-life disposal this year: EoL volume
/// that was not recovered, expressed in tCO2e.
pub fn eol_emissions_tco2e(
    eol_volume_kg: Decimal,
    recycled_eol_kg: Decimal,
    gwp_kgco2e_per_kg: Decimal,
) -> Decimal {
    to_tco2e(eol_volume_kg - recycled_eol_kg, gwp_kgco2e_per_kg)
}

/// Informational: the emissions embodied in the initial charge of newly
/// added equipment this year. Does not feed back into the bank; reported
/// alongside it for context.
pub fn initial_charge_emissions_tco2e(
    population_change: Decimal,
    initial_charge_kg_per_unit: Decimal,
    gwp_kgco2e_per_kg: Decimal,
) -> Decimal {
    to_tco2e(population_change * initial_charge_kg_per_unit, gwp_kgco2e_per_kg)
}
