use rust_decimal::Decimal;

use crate::streams::substance_state::RecycleStage;

/// One `recover` program after induction has been resolved to a concrete
/// fraction — resolved once per recalc pass, never re-resolved mid-pass.
#[derive(Debug, Clone)]
pub struct ResolvedRecycleProgram {
    pub stage: RecycleStage,
    pub recovery_rate: Decimal,
    pub yield_rate: Decimal,
    pub induction: Decimal,
    /// Named substance the displaced (non-induced) recycled volume is
    /// steered to, rather than reducing this scope's own new-equipment
    /// demand (§4.5 "Recycling displacing").
    pub displacing: Option<String>,
}

/// Everything the sales recalc algorithm needs for one scope/year.
/// `required_virgin_kg` is the domestic+import volume already resolved to
/// kg this pass — either freshly user-set/changed, or carried forward from
/// the prior year when no command touched the scope this year.
#[derive(Debug, Clone, Copy)]
pub struct SalesRecalcParams {
    pub prior_equipment: Decimal,
    pub retire_rate: Decimal,
    pub retire_with_replacement: bool,
    pub recharge_rate: Decimal,
    pub recharge_intensity: Decimal,
    pub initial_charge: Decimal,
    pub required_virgin_kg: Decimal,
    pub unit_based: bool,
    pub implicit_recharge_kg: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct SalesRecalcOutput {
    pub recharge_volume_kg: Decimal,
    pub eol_volume_kg: Decimal,
    pub retired_pop: Decimal,
    pub recycled_eol_kg: Decimal,
    pub recycled_recharge_kg: Decimal,
    pub volume_for_new_kg: Decimal,
    pub population_change: Decimal,
    /// `(destination substance, kg)` pairs for recycling programs that
    /// named a `displacing` target: this much virgin-sales-equivalent
    /// volume should be subtracted from that substance's own sales streams
    /// instead of from this scope's `volumeForNew` (§4.5).
    pub displaced_transfers: Vec<(String, Decimal)>,
}

/// Runs the demand-side half of the sales recalc for one scope/year, given
/// the recycle programs already resolved to concrete fractions. Splitting
/// the required virgin volume into `domestic`/`import` and writing back is
/// the caller's job (`recalc::builder`) since that needs the substance's
/// enabled-stream set and current distribution, not just scalars.
pub fn compute(params: &SalesRecalcParams, programs: &[ResolvedRecycleProgram]) -> SalesRecalcOutput {
    // Step 1: recharge demand.
    let recharge_pop = params.recharge_rate * params.prior_equipment;
    let recharge_volume_kg = recharge_pop * params.recharge_intensity;

    // Step 2: retirement & EoL volume.
    let retired_pop = params.retire_rate * params.prior_equipment;
    let eol_volume_kg = retired_pop * params.initial_charge;

    // Step 3: recycling per stage. A program naming a `displacing` target
    // still counts toward this scope's own `recycleEol`/`recycleRecharge`
    // totals (it was still recovered here), but its effect on *this*
    // scope's virgin-demand equation is carved out entirely: the displaced
    // (non-induced) share is reported in `displaced_transfers` for the
    // caller to subtract from the named substance instead.
    let mut recycled_eol_kg = Decimal::ZERO;
    let mut recycled_recharge_kg = Decimal::ZERO;
    let mut local_induced_eol_kg = Decimal::ZERO;
    let mut local_induced_recharge_kg = Decimal::ZERO;
    let mut local_recycled_eol_kg = Decimal::ZERO;
    let mut local_recycled_recharge_kg = Decimal::ZERO;
    let mut displaced_transfers: Vec<(String, Decimal)> = Vec::new();

    for program in programs {
        let base_volume = match program.stage {
            RecycleStage::Eol => eol_volume_kg,
            RecycleStage::Recharge => recharge_volume_kg,
        };
        let recovered = base_volume * program.recovery_rate;
        let recycled = recovered * program.yield_rate;
        match program.stage {
            RecycleStage::Eol => recycled_eol_kg += recycled,
            RecycleStage::Recharge => recycled_recharge_kg += recycled,
        }

        match &program.displacing {
            None => {
                let induced = recycled * program.induction;
                match program.stage {
                    RecycleStage::Eol => {
                        local_induced_eol_kg += induced;
                        local_recycled_eol_kg += recycled;
                    }
                    RecycleStage::Recharge => {
                        local_induced_recharge_kg += induced;
                        local_recycled_recharge_kg += recycled;
                    }
                }
            }
            Some(target) => {
                let displaced = recycled * (Decimal::ONE - program.induction);
                if !displaced.is_zero() {
                    displaced_transfers.push((target.clone(), displaced));
                }
            }
        }
    }
    let total_recycled_kg = local_recycled_eol_kg + local_recycled_recharge_kg;
    let total_induced_kg = local_induced_eol_kg + local_induced_recharge_kg;

    // Replacement retirement folds the EoL volume of the replaced cohort
    // back in as additional required virgin demand.
    let required = if params.retire_with_replacement {
        params.required_virgin_kg + eol_volume_kg
    } else {
        params.required_virgin_kg
    };

    // Steps 4-6, solved for `volumeForNew` given the already-known required
    // virgin sales volume (the value the user set/changed, or carried
    // forward) rather than the other way around (see DESIGN.md "Sales
    // recalc: solving direction").
    let volume_for_new_kg = if params.unit_based {
        required - recharge_volume_kg + params.implicit_recharge_kg - total_induced_kg
    } else {
        (required - recharge_volume_kg + params.implicit_recharge_kg + total_recycled_kg
            - total_induced_kg)
            .max(Decimal::ZERO)
    };

    let population_change = if params.initial_charge.is_zero() {
        Decimal::ZERO
    } else {
        (volume_for_new_kg / params.initial_charge).max(Decimal::ZERO)
    };

    SalesRecalcOutput {
        recharge_volume_kg,
        eol_volume_kg,
        retired_pop,
        recycled_eol_kg,
        recycled_recharge_kg,
        volume_for_new_kg,
        population_change,
        displaced_transfers,
    }
}

/// Resolves the induction rate for one recycling program. Explicit values
/// win; otherwise the default depends on whether this scope's recalc pass
/// is unit-based (full displacement, `0`) or volume-based (full induction,
/// `1`).
pub fn resolve_induction(explicit: Option<Decimal>, unit_based: bool) -> Decimal {
    explicit.unwrap_or(if unit_based { Decimal::ZERO } else { Decimal::ONE })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn frac(numerator: i64, denominator: i64) -> Decimal {
        Decimal::from(numerator) / Decimal::from(denominator)
    }

    #[test]
    fn s1_bau_first_year_population_new_is_one_million() {
        let params = SalesRecalcParams {
            prior_equipment: Decimal::ZERO,
            retire_rate: Decimal::ZERO,
            retire_with_replacement: false,
            recharge_rate: Decimal::ZERO,
            recharge_intensity: Decimal::ZERO,
            initial_charge: d(1),
            required_virgin_kg: d(1_000_000),
            unit_based: false,
            implicit_recharge_kg: Decimal::ZERO,
        };
        let out = compute(&params, &[]);
        assert_eq!(out.population_change, d(1_000_000));
        assert_eq!(out.retired_pop, Decimal::ZERO);
    }

    #[test]
    fn s2_retirement_with_recharge() {
        let params = SalesRecalcParams {
            prior_equipment: d(1_000_000),
            retire_rate: frac(5, 100),
            retire_with_replacement: false,
            recharge_rate: frac(5, 100),
            recharge_intensity: frac(1, 10),
            initial_charge: d(1),
            required_virgin_kg: d(1_000_000),
            unit_based: false,
            implicit_recharge_kg: Decimal::ZERO,
        };
        let out = compute(&params, &[]);
        assert_eq!(out.retired_pop, d(50_000));
        assert_eq!(out.recharge_volume_kg, d(5_000));
    }

    #[test]
    fn s6_recycling_unit_based_reduces_required_new_volume() {
        let params_no_recycle = SalesRecalcParams {
            prior_equipment: d(1_000_000),
            retire_rate: frac(5, 100),
            retire_with_replacement: false,
            recharge_rate: frac(5, 100),
            recharge_intensity: frac(1, 10),
            initial_charge: d(1),
            required_virgin_kg: d(1_000_000),
            unit_based: true,
            implicit_recharge_kg: Decimal::ZERO,
        };
        let baseline = compute(&params_no_recycle, &[]);

        let program = ResolvedRecycleProgram {
            stage: RecycleStage::Recharge,
            recovery_rate: frac(10, 100),
            yield_rate: frac(50, 100),
            induction: resolve_induction(None, true),
            displacing: None,
        };
        let with_recycle = compute(&params_no_recycle, &[program]);

        assert_eq!(with_recycle.recycled_recharge_kg, d(5_000) * frac(10, 100) * frac(50, 100));
        assert!(with_recycle.volume_for_new_kg <= baseline.volume_for_new_kg);
        assert!(with_recycle.displaced_transfers.is_empty());
    }

    #[test]
    fn displacing_target_steers_the_subtraction_away_from_this_scope() {
        let params = SalesRecalcParams {
            prior_equipment: d(1_000_000),
            retire_rate: frac(5, 100),
            retire_with_replacement: false,
            recharge_rate: frac(5, 100),
            recharge_intensity: frac(1, 10),
            initial_charge: d(1),
            required_virgin_kg: d(1_000_000),
            unit_based: true,
            implicit_recharge_kg: Decimal::ZERO,
        };
        let baseline = compute(&params, &[]);

        let program = ResolvedRecycleProgram {
            stage: RecycleStage::Recharge,
            recovery_rate: frac(10, 100),
            yield_rate: frac(50, 100),
            induction: resolve_induction(None, true),
            displacing: Some("Sub2".to_string()),
        };
        let with_displacing = compute(&params, &[program]);

        // recycled volume still counts toward this scope's own recycle
        // totals, but the virgin-demand reduction is steered away rather
        // than shrinking this scope's own volumeForNew.
        assert_eq!(with_displacing.recycled_recharge_kg, d(5_000) * frac(10, 100) * frac(50, 100));
        assert_eq!(with_displacing.volume_for_new_kg, baseline.volume_for_new_kg);
        assert_eq!(with_displacing.displaced_transfers, vec![("Sub2".to_string(), d(5_000) * frac(10, 100) * frac(50, 100))]);
    }
}
