//! One function per command verb (§4.4-§4.5), each taking `&mut Engine`
//! plus the typed payload carried on [`super::Command`]. This is the only
//! write path into substance state besides [`crate::recalc::builder::recalc`],
//! which every executor re-triggers once it has written its own piece.

use rust_decimal::Decimal;

use crate::command::{Command, CommandKind, EqualsKind, SetTarget};
use crate::convert::{ConversionContext, Converter};
use crate::engine::Engine;
use crate::error::{EngineResult, ScopeError};
use crate::recalc::builder;
use crate::streams::stream::{SalesStream, Stream};
use crate::streams::substance_state::{RecycleProgram, RecycleStage, SubstanceState};
use crate::types::number::{EngineNumber, Unit};
use crate::types::scope::UseKey;

/// Runs one command against the engine's current scope (which this function
/// sets from the command's `(stanza, application, substance)` first).
pub fn execute(engine: &mut Engine, cmd: &Command) -> EngineResult<()> {
    engine.set_stanza(cmd.stanza.clone());
    engine.set_application(cmd.application.clone());
    engine.set_substance(cmd.substance.clone());
    let key = engine.scope().use_key();

    match &cmd.kind {
        CommandKind::Enable { stream } => {
            enable(engine, &key, *stream);
            Ok(())
        }
        CommandKind::Equals { kind, value } => {
            equals(engine, &key, *kind, value);
            Ok(())
        }
        CommandKind::InitialCharge { stream, value } => {
            initial_charge(engine, &key, *stream, value);
            Ok(())
        }
        CommandKind::Set { target, value } => {
            set_target(engine, &key, *target, value)?;
            builder::recalc(engine, &key)
        }
        CommandKind::Change { target, delta } => {
            change_target(engine, &key, *target, delta)?;
            builder::recalc(engine, &key)
        }
        CommandKind::Retire { rate, with_replacement } => {
            retire(engine, &key, rate, *with_replacement);
            builder::recalc(engine, &key)
        }
        CommandKind::Recharge { population, intensity } => {
            recharge(engine, &key, population, intensity);
            builder::recalc(engine, &key)
        }
        CommandKind::Recycle { recovery_rate, yield_rate, stage, induction, displacing } => {
            recycle(engine, &key, recovery_rate, yield_rate, *stage, *induction, displacing.clone());
            builder::recalc(engine, &key)
        }
        CommandKind::Replace { amount, source, destination_substance } => {
            replace(engine, &key, amount, *source, destination_substance)
        }
        CommandKind::Cap { target, value, displacing } => {
            limit(engine, &key, *target, value, displacing.as_deref(), Limit::Cap)
        }
        CommandKind::Floor { target, value, displacing } => {
            limit(engine, &key, *target, value, displacing.as_deref(), Limit::Floor)
        }
    }
}

fn enable(engine: &mut Engine, key: &UseKey, stream: SalesStream) {
    let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
    if !state.enabled.contains(&stream) {
        state.enabled.push(stream);
    }
}

fn equals(engine: &mut Engine, key: &UseKey, kind: EqualsKind, value: &EngineNumber) {
    let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
    match kind {
        EqualsKind::Gwp => state.gwp = Some(value.clone()),
        EqualsKind::Energy => state.energy_intensity = Some(value.clone()),
    }
}

fn initial_charge(engine: &mut Engine, key: &UseKey, stream: SalesStream, value: &EngineNumber) {
    let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
    state.initial_charge.insert(stream, value.clone());
}

fn retire(engine: &mut Engine, key: &UseKey, rate: &EngineNumber, with_replacement: bool) {
    let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
    state.retire_rate = Some(rate.clone());
    state.retire_with_replacement = with_replacement;
}

fn recharge(engine: &mut Engine, key: &UseKey, population: &EngineNumber, intensity: &EngineNumber) {
    let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
    state.recharge_population = Some(population.clone());
    state.recharge_intensity = Some(intensity.clone());
}

fn recycle(
    engine: &mut Engine,
    key: &UseKey,
    recovery_rate: &EngineNumber,
    yield_rate: &EngineNumber,
    stage: RecycleStage,
    induction: Option<Decimal>,
    displacing: Option<String>,
) {
    let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
    state.recycle_programs.push(RecycleProgram {
        recovery_rate: recovery_rate.clone(),
        yield_rate: yield_rate.clone(),
        stage,
        induction,
        displacing,
    });
}

fn target_stream(target: SetTarget) -> Stream {
    match target {
        SetTarget::Domestic => Stream::Domestic,
        SetTarget::Import => Stream::Import,
        SetTarget::Export => Stream::Export,
        SetTarget::Sales | SetTarget::Consumption => Stream::Sales,
        SetTarget::Equipment => Stream::Equipment,
        SetTarget::PriorEquipment => Stream::PriorEquipment,
    }
}

/// Resolves `raw` (which may be a bare volume/unit literal, a `%`, or - for
/// `Consumption` - a GHG quantity) into the units the rest of the pipeline
/// should carry forward: `kg` for the aggregate `Sales`/`Consumption`
/// targets, the governing stream's own units for a bare `%`, or `raw`'s own
/// units unchanged otherwise (preserving whether the user specified this
/// command in equipment units, per §4.3.2).
fn resolve_value(
    state: &SubstanceState,
    target: SetTarget,
    raw: &EngineNumber,
    gwp: Option<&EngineNumber>,
) -> EngineResult<EngineNumber> {
    let stream = target_stream(target);
    let current = state.get(stream);
    let last = state.last_specified.get(&stream);
    let amortized = target
        .as_sales_stream()
        .and_then(|s| state.initial_charge.get(&s))
        .or_else(|| state.initial_charge.values().next());

    let mut ctx = ConversionContext::new().with_last_specified(last);
    if let Some(c) = current {
        ctx = ctx.with_current(c);
    }
    if let Some(a) = amortized {
        ctx = ctx.with_amortized_unit_volume(a);
    }
    if let Some(g) = gwp {
        ctx = ctx.with_gwp(g);
    }

    let native_units = match target {
        SetTarget::Sales | SetTarget::Consumption => Unit::kg(),
        _ if raw.units.is_percent() => last.map(|n| n.units).or_else(|| current.map(|n| n.units)).unwrap_or(Unit::kg()),
        _ => raw.units,
    };

    if raw.units == native_units {
        Ok(raw.clone())
    } else {
        Ok(Converter::convert(raw, native_units, &ctx)?)
    }
}

fn set_target(engine: &mut Engine, key: &UseKey, target: SetTarget, raw: &EngineNumber) -> EngineResult<()> {
    let state = engine.stream_keeper().get(key).expect("scope created by execute()");
    let gwp = state.gwp.clone();
    let resolved = resolve_value(state, target, raw, gwp.as_ref())?;
    apply_resolved(engine, key, target, resolved, false)
}

fn change_target(engine: &mut Engine, key: &UseKey, target: SetTarget, raw_delta: &EngineNumber) -> EngineResult<()> {
    let state = engine.stream_keeper().get(key).expect("scope created by execute()");
    let gwp = state.gwp.clone();
    let stream = target_stream(target);
    let current = state
        .get(stream)
        .cloned()
        .unwrap_or_else(|| EngineNumber::zero(Unit::kg()));
    let mut resolved_delta = resolve_value(state, target, raw_delta, gwp.as_ref())?;

    if resolved_delta.units != current.units {
        let amortized = target
            .as_sales_stream()
            .and_then(|s| state.initial_charge.get(&s))
            .or_else(|| state.initial_charge.values().next());
        let mut ctx = ConversionContext::new().with_current(&current);
        if let Some(a) = amortized {
            ctx = ctx.with_amortized_unit_volume(a);
        }
        if let Some(g) = gwp.as_ref() {
            ctx = ctx.with_gwp(g);
        }
        resolved_delta = Converter::convert(&resolved_delta, current.units, &ctx)?;
    }

    let new_value = EngineNumber::new(current.value + resolved_delta.value, current.units);
    apply_resolved(engine, key, target, new_value, true)
}

/// Writes a resolved `set`/`change` result back into the substance's
/// streams, splitting `Sales`/`Consumption` aggregates proportionally
/// across the enabled sales streams (§4.3 step 7).
fn apply_resolved(
    engine: &mut Engine,
    key: &UseKey,
    target: SetTarget,
    resolved: EngineNumber,
    is_change: bool,
) -> EngineResult<()> {
    let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");

    match target {
        SetTarget::Domestic | SetTarget::Import | SetTarget::Export => {
            let stream = target.as_sales_stream().expect("sales target");
            if !state.is_enabled(stream) {
                return Err(ScopeError::Unset {
                    application: key.application.clone(),
                    substance: key.substance.clone(),
                }
                .into());
            }
            state.sales_specified_in_units = resolved.units.is_equipment();
            state.set_user_specified(target_stream(target), resolved);
        }
        SetTarget::Sales | SetTarget::Consumption => {
            let total_kg = resolved.value;
            let (domestic_kg, import_kg) = builder::distribute_sales(state, total_kg);
            state.sales_specified_in_units = false;
            if state.is_enabled(SalesStream::Domestic) {
                state.set_derived(Stream::Domestic, EngineNumber::new(domestic_kg, Unit::kg()));
            }
            if state.is_enabled(SalesStream::Import) {
                state.set_derived(Stream::Import, EngineNumber::new(import_kg, Unit::kg()));
            }
            state.last_specified.insert(Stream::Sales, EngineNumber::new(total_kg, Unit::kg()));
        }
        SetTarget::Equipment => {
            if is_change {
                state.set_derived(Stream::Equipment, resolved);
            } else {
                state.set_user_specified(Stream::Equipment, resolved);
            }
        }
        SetTarget::PriorEquipment => {
            state.set_derived(Stream::PriorEquipment, resolved);
        }
    }
    Ok(())
}

/// `replace A of stream X with "S2"` (§4.5). Equipment-unit amounts convert
/// through each substance's own initial charge (actual kg transferred may
/// differ between source and destination); volume-unit amounts move the
/// same kg on both sides.
fn replace(
    engine: &mut Engine,
    key: &UseKey,
    amount: &EngineNumber,
    source: SetTarget,
    destination_substance: &str,
) -> EngineResult<()> {
    if destination_substance == key.substance {
        return Err(ScopeError::SelfReplacement(key.substance.clone()).into());
    }

    let source_stream = source.as_sales_stream().unwrap_or(SalesStream::Domestic);
    let dest_key = UseKey::new(key.application.clone(), destination_substance.to_string());
    engine.stream_keeper_mut().get_or_create(&dest_key);

    let src_charge = engine
        .stream_keeper()
        .get(key)
        .and_then(|s| s.initial_charge.get(&source_stream))
        .cloned();
    let dest_charge = engine
        .stream_keeper()
        .get(&dest_key)
        .and_then(|s| s.initial_charge.get(&source_stream))
        .cloned()
        .or_else(|| src_charge.clone());

    let (source_kg, dest_kg) = if amount.units.is_equipment() {
        let src_charge = src_charge.ok_or_else(|| crate::error::UnitError::MissingContext {
            needed: "initial charge (kg/unit) to replace equipment units".to_string(),
        })?;
        let dst_charge = dest_charge.unwrap_or_else(|| src_charge.clone());
        (amount.value * src_charge.value, amount.value * dst_charge.value)
    } else {
        let ctx = ConversionContext::new();
        let kg = Converter::convert(amount, Unit::kg(), &ctx)?;
        (kg.value, kg.value)
    };

    {
        let src_state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
        let current = src_state
            .get(source_stream.as_stream())
            .cloned()
            .unwrap_or_else(|| EngineNumber::zero(Unit::kg()));
        let new_value = EngineNumber::new(current.value - source_kg, Unit::kg());
        src_state.set_user_specified(source_stream.as_stream(), new_value);
    }
    {
        let dest_state = engine.stream_keeper_mut().get_mut(&dest_key).expect("just created");
        if !dest_state.is_enabled(source_stream) {
            dest_state.enabled.push(source_stream);
        }
        let current = dest_state
            .get(source_stream.as_stream())
            .cloned()
            .unwrap_or_else(|| EngineNumber::zero(Unit::kg()));
        let new_value = EngineNumber::new(current.value + dest_kg, Unit::kg());
        dest_state.set_user_specified(source_stream.as_stream(), new_value);
    }

    builder::recalc(engine, key)?;
    builder::recalc(engine, &dest_key)
}

enum Limit {
    Cap,
    Floor,
}

/// `cap`/`floor X to V [displacing S]` (§4.5): adjusts the target stream to
/// the limit when exceeded, optionally transferring the delta to a sibling
/// substance's same stream.
fn limit(
    engine: &mut Engine,
    key: &UseKey,
    target: SetTarget,
    value: &EngineNumber,
    displacing: Option<&str>,
    kind: Limit,
) -> EngineResult<()> {
    let stream = target_stream(target);
    let state = engine.stream_keeper().get(key).expect("scope created by execute()");
    let gwp = state.gwp.clone();
    let current = state.get(stream).cloned().unwrap_or_else(|| EngineNumber::zero(Unit::kg()));
    let last = state.last_specified.get(&stream).cloned();

    let mut ctx = ConversionContext::new().with_current(&current).with_last_specified(last.as_ref());
    if let Some(g) = gwp.as_ref() {
        ctx = ctx.with_gwp(g);
    }
    let resolved_limit = Converter::convert(value, current.units, &ctx)?;

    let exceeds = match kind {
        Limit::Cap => current.value > resolved_limit.value,
        Limit::Floor => current.value < resolved_limit.value,
    };
    if !exceeds {
        return builder::recalc(engine, key);
    }
    let delta = current.value - resolved_limit.value;

    if let Some(dest_substance) = displacing {
        if dest_substance == key.substance {
            return Err(ScopeError::SelfReplacement(key.substance.clone()).into());
        }
    }

    {
        let state = engine.stream_keeper_mut().get_mut(key).expect("scope created by execute()");
        state.set_user_specified(stream, resolved_limit.clone());
        state.displacing = displacing.map(|s| s.to_string());
    }

    if let Some(dest_substance) = displacing {
        let dest_key = UseKey::new(key.application.clone(), dest_substance.to_string());
        engine.stream_keeper_mut().get_or_create(&dest_key);
        let dest_state = engine.stream_keeper_mut().get_mut(&dest_key).expect("just created");
        if let Some(sales_stream) = target.as_sales_stream() {
            if !dest_state.is_enabled(sales_stream) {
                dest_state.enabled.push(sales_stream);
            }
        }
        let dest_current = dest_state.get(stream).cloned().unwrap_or_else(|| EngineNumber::zero(resolved_limit.units));
        let dest_new = EngineNumber::new(dest_current.value + delta, dest_current.units);
        dest_state.set_user_specified(stream, dest_new);
        builder::recalc(engine, &dest_key)?;
    }

    builder::recalc(engine, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::scope::Stanza;
    use crate::types::year_matcher::YearMatcher;

    fn enable_cmd(app: &str, sub: &str, stream: SalesStream) -> Command {
        Command::new(Stanza::Default, app, sub, YearMatcher::always(), CommandKind::Enable { stream })
    }

    #[test]
    fn s5_self_replacement_is_rejected() {
        let mut engine = Engine::new(1, 1, 1);
        execute(&mut engine, &enable_cmd("App", "A", SalesStream::Domestic)).unwrap();
        let replace_cmd = Command::new(
            Stanza::Default,
            "App",
            "A",
            YearMatcher::always(),
            CommandKind::Replace {
                amount: EngineNumber::new(Decimal::from(10), Unit::kg()),
                source: SetTarget::Domestic,
                destination_substance: "A".to_string(),
            },
        );
        let err = execute(&mut engine, &replace_cmd).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Scope(ScopeError::SelfReplacement(_))));
    }

    #[test]
    fn s3_unit_based_replacement_splits_by_each_sides_initial_charge() {
        let mut engine = Engine::new(1, 1, 1);
        execute(&mut engine, &enable_cmd("App", "A", SalesStream::Domestic)).unwrap();
        execute(&mut engine, &enable_cmd("App", "B", SalesStream::Domestic)).unwrap();
        execute(
            &mut engine,
            &Command::new(
                Stanza::Default,
                "App",
                "A",
                YearMatcher::always(),
                CommandKind::InitialCharge {
                    stream: SalesStream::Domestic,
                    value: EngineNumber::new(Decimal::ONE, Unit::kg_per_unit()),
                },
            ),
        )
        .unwrap();
        execute(
            &mut engine,
            &Command::new(
                Stanza::Default,
                "App",
                "B",
                YearMatcher::always(),
                CommandKind::InitialCharge {
                    stream: SalesStream::Domestic,
                    value: EngineNumber::new(Decimal::from(2), Unit::kg_per_unit()),
                },
            ),
        )
        .unwrap();
        execute(
            &mut engine,
            &Command::new(
                Stanza::Default,
                "App",
                "A",
                YearMatcher::always(),
                CommandKind::Set {
                    target: SetTarget::Domestic,
                    value: EngineNumber::new(Decimal::from(100), Unit::kg()),
                },
            ),
        )
        .unwrap();
        execute(
            &mut engine,
            &Command::new(
                Stanza::Default,
                "App",
                "A",
                YearMatcher::always(),
                CommandKind::Replace {
                    amount: EngineNumber::new(Decimal::from(20), Unit::units()),
                    source: SetTarget::Domestic,
                    destination_substance: "B".to_string(),
                },
            ),
        )
        .unwrap();

        let a = engine
            .stream_keeper()
            .get(&UseKey::new("App", "A"))
            .unwrap()
            .get(Stream::Domestic)
            .unwrap();
        let b = engine
            .stream_keeper()
            .get(&UseKey::new("App", "B"))
            .unwrap()
            .get(Stream::Domestic)
            .unwrap();
        assert_eq!(a.value, Decimal::from(80));
        assert_eq!(b.value, Decimal::from(40));
    }
}
