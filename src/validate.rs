//! Pre-execution checks over an ordered command list (the `validate` CLI
//! subcommand, §6). Catches I2-I4 up front rather than mid-run, since a
//! script author's intent ("duplicate initial charge target") is a
//! property of the whole command list, not of any one command's execution.

use std::collections::HashMap;

use crate::command::{Command, CommandKind, SetTarget};
use crate::error::{EngineResult, ScopeError};
use crate::streams::stream::SalesStream;
use crate::types::year_matcher::YearMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SingletonKind {
    Gwp,
    Energy,
    InitialCharge(SalesStreamKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SalesStreamKey {
    Domestic,
    Import,
    Export,
}

impl From<SalesStream> for SalesStreamKey {
    fn from(stream: SalesStream) -> Self {
        match stream {
            SalesStream::Domestic => SalesStreamKey::Domestic,
            SalesStream::Import => SalesStreamKey::Import,
            SalesStream::Export => SalesStreamKey::Export,
        }
    }
}

/// Validates I2 (one `equals` per kind), I3 (unique initial-charge targets)
/// and I4 (no substance replacing itself) across the whole command list,
/// per `(application, substance)` scope. Overlapping `YearMatcher` ranges
/// for the same singleton target are rejected; disjoint ranges are fine
/// (P8: disjoint matchers for the same kind of command compose cleanly).
pub fn validate_commands(commands: &[Command], scenario_start: i64, scenario_end: i64) -> EngineResult<()> {
    let mut singletons: HashMap<(String, String, SingletonKind), Vec<(YearMatcher, String)>> = HashMap::new();

    for cmd in commands {
        let scope_key = (cmd.application.clone(), cmd.substance.clone());
        match &cmd.kind {
            CommandKind::Equals { kind, .. } => {
                let singleton_kind = match kind {
                    crate::command::EqualsKind::Gwp => SingletonKind::Gwp,
                    crate::command::EqualsKind::Energy => SingletonKind::Energy,
                };
                check_and_record(
                    &mut singletons,
                    scope_key,
                    singleton_kind,
                    cmd,
                    "equals",
                    scenario_start,
                    scenario_end,
                )?;
            }
            CommandKind::InitialCharge { stream, .. } => {
                check_and_record(
                    &mut singletons,
                    scope_key,
                    SingletonKind::InitialCharge((*stream).into()),
                    cmd,
                    "initial charge",
                    scenario_start,
                    scenario_end,
                )?;
            }
            CommandKind::Replace { destination_substance, .. } => {
                if destination_substance == &cmd.substance {
                    return Err(ScopeError::SelfReplacement(cmd.substance.clone()).into());
                }
            }
            CommandKind::Cap { target, displacing: Some(dest), .. }
            | CommandKind::Floor { target, displacing: Some(dest), .. } => {
                if dest == &cmd.substance && matches!(target, SetTarget::Domestic | SetTarget::Import | SetTarget::Export) {
                    return Err(ScopeError::SelfReplacement(cmd.substance.clone()).into());
                }
            }
            CommandKind::Recycle { displacing: Some(dest), .. } => {
                if dest == &cmd.substance {
                    return Err(ScopeError::SelfReplacement(cmd.substance.clone()).into());
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn check_and_record(
    singletons: &mut HashMap<(String, String, SingletonKind), Vec<(YearMatcher, String)>>,
    scope_key: (String, String),
    kind: SingletonKind,
    cmd: &Command,
    kind_label: &'static str,
    scenario_start: i64,
    scenario_end: i64,
) -> EngineResult<()> {
    let key = (scope_key.0, scope_key.1, kind);
    let entries = singletons.entry(key.clone()).or_default();
    for (existing_matcher, existing_target) in entries.iter() {
        if matchers_overlap(existing_matcher, &cmd.year_matcher, scenario_start, scenario_end) {
            return Err(ScopeError::DuplicateSingleton {
                kind: kind_label,
                application: key.0.clone(),
                substance: key.1.clone(),
                year: scenario_start,
                target: existing_target.clone(),
            }
            .into());
        }
    }
    entries.push((cmd.year_matcher, command_target_label(cmd)));
    Ok(())
}

fn command_target_label(cmd: &Command) -> String {
    match &cmd.kind {
        CommandKind::InitialCharge { stream, .. } => stream.to_string(),
        CommandKind::Equals { kind, .. } => match kind {
            crate::command::EqualsKind::Gwp => "gwp".to_string(),
            crate::command::EqualsKind::Energy => "energy".to_string(),
        },
        _ => cmd.kind_name().to_string(),
    }
}

fn matchers_overlap(a: &YearMatcher, b: &YearMatcher, scenario_start: i64, scenario_end: i64) -> bool {
    (scenario_start..=scenario_end).any(|year| a.matches(year, scenario_start, scenario_end) && b.matches(year, scenario_start, scenario_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EqualsKind;
    use crate::types::number::{EngineNumber, Unit};
    use crate::types::scope::Stanza;
    use rust_decimal::Decimal;

    fn equals_cmd(value: Decimal) -> Command {
        Command::new(
            Stanza::Default,
            "App",
            "Sub1",
            YearMatcher::always(),
            CommandKind::Equals {
                kind: EqualsKind::Gwp,
                value: EngineNumber::new(value, Unit::kgco2e_per_kg()),
            },
        )
    }

    #[test]
    fn duplicate_equals_over_overlapping_years_is_rejected() {
        let commands = vec![equals_cmd(Decimal::ONE), equals_cmd(Decimal::from(2))];
        let err = validate_commands(&commands, 2025, 2030).unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Scope(ScopeError::DuplicateSingleton { .. })
        ));
    }

    #[test]
    fn disjoint_year_ranges_do_not_conflict() {
        let mut a = equals_cmd(Decimal::ONE);
        a.year_matcher = YearMatcher::single_year(2025);
        let mut b = equals_cmd(Decimal::from(2));
        b.year_matcher = YearMatcher::single_year(2026);
        assert!(validate_commands(&[a, b], 2025, 2030).is_ok());
    }

    #[test]
    fn self_replacement_is_rejected_at_validation_time() {
        let cmd = Command::new(
            Stanza::Default,
            "App",
            "Sub1",
            YearMatcher::always(),
            CommandKind::Replace {
                amount: EngineNumber::new(Decimal::from(10), Unit::kg()),
                source: SetTarget::Domestic,
                destination_substance: "Sub1".to_string(),
            },
        );
        let err = validate_commands(&[cmd], 2025, 2030).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Scope(ScopeError::SelfReplacement(_))));
    }
}
