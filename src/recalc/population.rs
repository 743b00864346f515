use rust_decimal::Decimal;

/// Rolls `priorEquipment` forward into this year's `equipment` count, given
/// how many units retired and how many are newly added. Replacement
/// retirement keeps the replaced cohort's units alive in addition to any
/// organically added units.
pub fn roll_forward(
    prior_equipment: Decimal,
    retired_pop: Decimal,
    population_change: Decimal,
    with_replacement: bool,
) -> Decimal {
    let replacement = if with_replacement { retired_pop } else { Decimal::ZERO };
    prior_equipment - retired_pop + population_change + replacement
}

/// Bank is the cumulative kg of refrigerant sitting in installed equipment.
/// Its year-over-year change is sales minus what left the bank: retired
/// units that were not recycled, and recharge leakage that was not
/// recovered.
pub fn bank_change_kg(
    sales_kg: Decimal,
    eol_volume_kg: Decimal,
    recycled_eol_kg: Decimal,
    recharge_volume_kg: Decimal,
    recycled_recharge_kg: Decimal,
) -> Decimal {
    let retired_volume = eol_volume_kg - recycled_eol_kg;
    let leakage = recharge_volume_kg - recycled_recharge_kg;
    sales_kg - retired_volume - leakage
}
