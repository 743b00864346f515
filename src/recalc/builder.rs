//! Orchestrates one scope/year's sales recalculation: pulls the scalar
//! inputs [`super::sales::compute`] needs out of the [`SubstanceState`],
//! runs it, and writes every derived stream back. Population roll-forward
//! and bank propagation are folded in here too since they share the same
//! inputs and must stay consistent with each other within one pass.
//!
//! One function per concern, composed by the caller, rather than a single
//! god-object method.

use rust_decimal::Decimal;

use crate::convert::{ConversionContext, Converter};
use crate::engine::Engine;
use crate::error::{EngineResult, SalesError};
use crate::recalc::sales::{self, ResolvedRecycleProgram, SalesRecalcParams};
use crate::recalc::{consumption, population};
use crate::streams::stream::{SalesStream, Stream};
use crate::streams::substance_state::SubstanceState;
use crate::types::number::{EngineNumber, Unit};
use crate::types::scope::UseKey;

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Runs the full sales/population/bank recalc for one scope and writes the
/// result back into the [`crate::streams::keeper::StreamKeeper`]. Triggered
/// by any write to `domestic`/`import`/`export`/`sales`/`equipment` or a
/// program step that requires re-deriving them (§4.3).
pub fn recalc(engine: &mut Engine, key: &UseKey) -> EngineResult<()> {
    let gwp = engine
        .stream_keeper()
        .get(key)
        .and_then(|s| s.gwp.clone())
        .unwrap_or_else(|| EngineNumber::zero(Unit::kgco2e_per_kg()));
    let state = engine
        .stream_keeper_mut()
        .get_mut(key)
        .expect("recalc invoked only for scopes created by executors");

    zero_disabled_streams(state);

    let initial_charge = amortized_initial_charge(state);
    let prior_equipment = value_or_zero(state, Stream::PriorEquipment, Unit::units());
    let retire_rate = percent_value(state.retire_rate.as_ref());
    let (recharge_rate, recharge_intensity) = recharge_params(state);

    let (domestic_kg, import_kg) = enabled_sales_kg(state, initial_charge);
    let required_virgin_kg = domestic_kg + import_kg;

    let recharge_pop = recharge_rate * prior_equipment;
    let recharge_volume_kg = recharge_pop * recharge_intensity;
    let unit_based = state.sales_specified_in_units && !recharge_volume_kg.is_zero();
    let implicit_recharge_kg = if unit_based { recharge_volume_kg } else { Decimal::ZERO };

    let programs: Vec<ResolvedRecycleProgram> = state
        .recycle_programs
        .iter()
        .map(|p| ResolvedRecycleProgram {
            stage: p.stage,
            recovery_rate: percent_value(Some(&p.recovery_rate)),
            yield_rate: percent_value(Some(&p.yield_rate)),
            induction: sales::resolve_induction(p.induction, unit_based),
            displacing: p.displacing.clone(),
        })
        .collect();

    if required_virgin_kg > Decimal::ZERO && state.enabled.is_empty() {
        return Err(SalesError::NoEnabledSalesStream {
            application: key.application.clone(),
            substance: key.substance.clone(),
        }
        .into());
    }

    let params = SalesRecalcParams {
        prior_equipment,
        retire_rate,
        retire_with_replacement: state.retire_with_replacement,
        recharge_rate,
        recharge_intensity,
        initial_charge,
        required_virgin_kg,
        unit_based,
        implicit_recharge_kg,
    };
    let out = sales::compute(&params, &programs);

    let equipment = population::roll_forward(
        prior_equipment,
        out.retired_pop,
        out.population_change,
        state.retire_with_replacement,
    );

    let sales_kg = required_virgin_kg + out.recycled_eol_kg + out.recycled_recharge_kg;
    let bank_kg_prior = value_or_zero(state, Stream::BankKg, Unit::kg());
    let bank_change_kg = population::bank_change_kg(
        sales_kg,
        out.eol_volume_kg,
        out.recycled_eol_kg,
        out.recharge_volume_kg,
        out.recycled_recharge_kg,
    );
    let bank_kg = bank_kg_prior + bank_change_kg;

    let gwp_scalar = gwp.value;
    let recharge_emissions =
        consumption::recharge_emissions_tco2e(out.recharge_volume_kg, out.recycled_recharge_kg, gwp_scalar);
    let eol_emissions = consumption::eol_emissions_tco2e(out.eol_volume_kg, out.recycled_eol_kg, gwp_scalar);
    let initial_charge_emissions =
        consumption::initial_charge_emissions_tco2e(out.population_change, initial_charge, gwp_scalar);

    state.set_derived(Stream::Retired, EngineNumber::new(out.retired_pop, Unit::units()));
    state.set_derived(Stream::ImplicitRecharge, EngineNumber::new(implicit_recharge_kg, Unit::kg()));
    state.set_derived(Stream::RecycleEol, EngineNumber::new(out.recycled_eol_kg, Unit::kg()));
    state.set_derived(Stream::RecycleRecharge, EngineNumber::new(out.recycled_recharge_kg, Unit::kg()));
    state.set_derived(
        Stream::Recycle,
        EngineNumber::new(out.recycled_eol_kg + out.recycled_recharge_kg, Unit::kg()),
    );
    state.set_derived(Stream::Equipment, EngineNumber::new(equipment, Unit::units()));
    state.set_derived(Stream::Sales, EngineNumber::new(sales_kg, Unit::kg()));
    state.set_derived(Stream::BankKg, EngineNumber::new(bank_kg, Unit::kg()));
    state.set_derived(
        Stream::BankChangeKg,
        EngineNumber::new(bank_change_kg, Unit::kg()),
    );
    if !gwp_scalar.is_zero() {
        state.set_derived(Stream::BankTco2e, EngineNumber::new(consumption::to_tco2e(bank_kg, gwp_scalar), Unit::tco2e()));
        state.set_derived(
            Stream::BankChangeTco2e,
            EngineNumber::new(consumption::to_tco2e(bank_change_kg, gwp_scalar), Unit::tco2e()),
        );
    }

    state.recharge_emissions_tco2e = recharge_emissions;
    state.eol_emissions_tco2e = eol_emissions;
    state.initial_charge_emissions_tco2e = initial_charge_emissions;

    write_consumption_twins(state, &gwp);
    // energy intensity feeds energyConsumption at result-emission time (§6 CSV), not the bank.

    apply_displaced_transfers(engine, key, &out.displaced_transfers)
}

/// Applies recycling's cross-substance `displacing` steering (§4.5): the
/// displaced (non-induced) recycled volume that named programs carved out
/// of their own scope's `volumeForNew` equation is subtracted directly
/// from the named substance's sales streams instead, the same way
/// `limit()` steers a cap/floor delta to a sibling substance.
fn apply_displaced_transfers(engine: &mut Engine, key: &UseKey, transfers: &[(String, Decimal)]) -> EngineResult<()> {
    for (target_substance, kg) in transfers {
        if target_substance == &key.substance {
            return Err(crate::error::ScopeError::SelfReplacement(key.substance.clone()).into());
        }

        let dest_key = UseKey::new(key.application.clone(), target_substance.clone());
        engine.stream_keeper_mut().get_or_create(&dest_key);
        {
            let dest_state = engine.stream_keeper_mut().get_mut(&dest_key).expect("just created");
            let (domestic_kg, import_kg) = distribute_sales(dest_state, *kg);
            if dest_state.is_enabled(SalesStream::Domestic) {
                let current = dest_state.get(Stream::Domestic).cloned().unwrap_or_else(|| EngineNumber::zero(Unit::kg()));
                dest_state.set_user_specified(Stream::Domestic, EngineNumber::new(current.value - domestic_kg, Unit::kg()));
            }
            if dest_state.is_enabled(SalesStream::Import) {
                let current = dest_state.get(Stream::Import).cloned().unwrap_or_else(|| EngineNumber::zero(Unit::kg()));
                dest_state.set_user_specified(Stream::Import, EngineNumber::new(current.value - import_kg, Unit::kg()));
            }
        }
        recalc(engine, &dest_key)?;
    }
    Ok(())
}

fn zero_disabled_streams(state: &mut SubstanceState) {
    for stream in [SalesStream::Domestic, SalesStream::Import, SalesStream::Export] {
        if !state.is_enabled(stream) {
            state.set_derived(stream.as_stream(), EngineNumber::zero(Unit::kg()));
        }
    }
}

fn value_or_zero(state: &SubstanceState, stream: Stream, _unit: Unit) -> Decimal {
    state.get(stream).map(|n| n.value).unwrap_or(Decimal::ZERO)
}

/// Resolves a `%`/`% / year` EngineNumber to a bare fraction (e.g. `5%` -> `0.05`).
fn percent_value(value: Option<&EngineNumber>) -> Decimal {
    match value {
        Some(n) if n.units.is_percent() => n.value / HUNDRED,
        Some(n) => n.value,
        None => Decimal::ZERO,
    }
}

fn recharge_params(state: &SubstanceState) -> (Decimal, Decimal) {
    let rate = percent_value(state.recharge_population.as_ref());
    let intensity = state
        .recharge_intensity
        .as_ref()
        .map(|n| n.value)
        .unwrap_or(Decimal::ZERO);
    (rate, intensity)
}

/// Weighted average kg/unit across enabled sales streams, weighted by each
/// stream's current share of volume. Falls back to whichever initial
/// charge is registered when shares can't be computed yet (first year).
fn amortized_initial_charge(state: &SubstanceState) -> Decimal {
    let charges: Vec<(SalesStream, Decimal)> = [SalesStream::Domestic, SalesStream::Import, SalesStream::Export]
        .into_iter()
        .filter(|s| state.is_enabled(*s))
        .filter_map(|s| state.initial_charge.get(&s).map(|n| (s, n.value)))
        .collect();

    if charges.is_empty() {
        return Decimal::ZERO;
    }

    let weights: Vec<(Decimal, Decimal)> = charges
        .iter()
        .map(|(s, charge)| {
            let value = state.get(s.as_stream()).map(|n| n.value).unwrap_or(Decimal::ZERO);
            (value.abs(), *charge)
        })
        .collect();
    let total_weight: Decimal = weights.iter().map(|(w, _)| *w).sum();

    if total_weight.is_zero() {
        let count = Decimal::from(charges.len() as i64);
        charges.iter().map(|(_, c)| *c).sum::<Decimal>() / count
    } else {
        weights.iter().map(|(w, c)| w * c / total_weight).sum()
    }
}

/// Converts every enabled sales stream's current value to kg using its own
/// initial charge, returning `(domestic_kg, import_kg)`. `export` does not
/// feed the population/bank equations (§4.4/§4.5 open question: export is
/// a distinct outflow, see DESIGN.md).
fn enabled_sales_kg(state: &SubstanceState, amortized: Decimal) -> (Decimal, Decimal) {
    let to_kg = |stream: SalesStream| -> Decimal {
        if !state.is_enabled(stream) {
            return Decimal::ZERO;
        }
        let Some(value) = state.get(stream.as_stream()) else {
            return Decimal::ZERO;
        };
        if value.units.is_equipment() {
            value.value * amortized
        } else if value.units == Unit::mt() {
            value.value * Decimal::from(1000)
        } else {
            value.value
        }
    };
    (to_kg(SalesStream::Domestic), to_kg(SalesStream::Import))
}

fn write_consumption_twins(state: &mut SubstanceState, gwp: &EngineNumber) {
    use crate::streams::stream::ConsumptionSource;

    if gwp.value.is_zero() {
        return;
    }
    for (source, stream) in [
        (ConsumptionSource::Domestic, Stream::Domestic),
        (ConsumptionSource::Import, Stream::Import),
        (ConsumptionSource::Export, Stream::Export),
        (ConsumptionSource::Recycle, Stream::Recycle),
    ] {
        let Some(value) = state.get(stream) else { continue };
        let ctx = ConversionContext::new().with_current(value).with_gwp(gwp);
        if let Ok(converted) = Converter::convert(value, Unit::tco2e(), &ctx) {
            state.set_derived(Stream::Consumption(source), converted);
        }
    }
}

/// Splits an aggregate `sales` (or cap/floor displacement) target in kg
/// into `(domestic_kg, import_kg)` proportional to the current share of
/// each enabled stream; even split across enabled streams when both are
/// currently zero.
pub fn distribute_sales(state: &SubstanceState, total_kg: Decimal) -> (Decimal, Decimal) {
    let domestic_enabled = state.is_enabled(SalesStream::Domestic);
    let import_enabled = state.is_enabled(SalesStream::Import);
    let domestic_current = state.get(Stream::Domestic).map(|n| n.value).unwrap_or(Decimal::ZERO);
    let import_current = state.get(Stream::Import).map(|n| n.value).unwrap_or(Decimal::ZERO);
    let total_current = domestic_current + import_current;

    match (domestic_enabled, import_enabled) {
        (true, true) if !total_current.is_zero() => (
            total_kg * domestic_current / total_current,
            total_kg * import_current / total_current,
        ),
        (true, true) => {
            let half = total_kg / Decimal::from(2);
            (half, half)
        }
        (true, false) => (total_kg, Decimal::ZERO),
        (false, true) => (Decimal::ZERO, total_kg),
        (false, false) => (Decimal::ZERO, Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::streams::stream::SalesStream;
    use crate::types::number::Unit;
    use crate::types::scope::{Stanza, UseKey};

    fn scope_up(engine: &mut Engine, app: &str, sub: &str) -> UseKey {
        engine.set_stanza(Stanza::Default);
        engine.set_application(app);
        engine.set_substance(sub);
        engine.scope().use_key()
    }

    #[test]
    fn s1_bau_first_year_population_new_is_one_million() {
        let mut engine = Engine::new(1, 3, 42);
        let key = scope_up(&mut engine, "App", "Sub1");
        let state = engine.stream_keeper_mut().get_mut(&key).unwrap();
        state.enabled.push(SalesStream::Domestic);
        state.initial_charge.insert(
            SalesStream::Domestic,
            EngineNumber::new(Decimal::ONE, Unit::kg_per_unit()),
        );
        state.gwp = Some(EngineNumber::new(Decimal::ONE, Unit::kgco2e_per_kg()));
        state.set_user_specified(Stream::Domestic, EngineNumber::new(Decimal::from(1_000_000), Unit::kg()));

        recalc(&mut engine, &key).unwrap();

        let state = engine.stream_keeper().get(&key).unwrap();
        assert_eq!(state.get(Stream::Equipment).unwrap().value, Decimal::from(1_000_000));
        assert_eq!(
            state.get(Stream::Consumption(crate::streams::stream::ConsumptionSource::Domestic)).unwrap().value,
            Decimal::from(1000)
        );
    }

    #[test]
    fn disabled_streams_are_forced_to_zero() {
        let mut engine = Engine::new(1, 1, 1);
        let key = scope_up(&mut engine, "App", "Sub1");
        recalc(&mut engine, &key).unwrap();
        let state = engine.stream_keeper().get(&key).unwrap();
        assert_eq!(state.get(Stream::Domestic).unwrap().value, Decimal::ZERO);
    }
}
