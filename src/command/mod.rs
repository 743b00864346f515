//! The typed command list the parser hands the engine (§6). One [`Command`]
//! per stanza entry; [`executors`] is the only write path from a command
//! into the [`crate::engine::Engine`].

pub mod executors;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::streams::stream::SalesStream;
use crate::streams::substance_state::RecycleStage;
use crate::types::number::EngineNumber;
use crate::types::scope::Stanza;
use crate::types::year_matcher::YearMatcher;

/// Which singleton `equals` conversion a command installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqualsKind {
    Gwp,
    Energy,
}

/// The stream a `set`/`change`/`cap`/`floor` targets. `Consumption` sets the
/// substance's overall tCO2e level, which the engine re-expresses as a
/// `Sales` target via the GWP context (see `command::executors::target_stream`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetTarget {
    Domestic,
    Import,
    Export,
    Sales,
    Equipment,
    PriorEquipment,
    Consumption,
}

impl SetTarget {
    pub fn as_sales_stream(self) -> Option<SalesStream> {
        match self {
            SetTarget::Domestic => Some(SalesStream::Domestic),
            SetTarget::Import => Some(SalesStream::Import),
            SetTarget::Export => Some(SalesStream::Export),
            _ => None,
        }
    }
}

/// One typed, year-gated instruction for a single (stanza, application,
/// substance). Mirrors the command table in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommandKind {
    Enable {
        stream: SalesStream,
    },
    Equals {
        kind: EqualsKind,
        value: EngineNumber,
    },
    InitialCharge {
        stream: SalesStream,
        value: EngineNumber,
    },
    Set {
        target: SetTarget,
        value: EngineNumber,
    },
    Change {
        target: SetTarget,
        delta: EngineNumber,
    },
    Retire {
        rate: EngineNumber,
        with_replacement: bool,
    },
    Recharge {
        population: EngineNumber,
        intensity: EngineNumber,
    },
    Recycle {
        recovery_rate: EngineNumber,
        yield_rate: EngineNumber,
        stage: RecycleStage,
        induction: Option<Decimal>,
        displacing: Option<String>,
    },
    Replace {
        amount: EngineNumber,
        source: SetTarget,
        destination_substance: String,
    },
    Cap {
        target: SetTarget,
        value: EngineNumber,
        displacing: Option<String>,
    },
    Floor {
        target: SetTarget,
        value: EngineNumber,
        displacing: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub stanza: Stanza,
    pub application: String,
    pub substance: String,
    pub year_matcher: YearMatcher,
    pub kind: CommandKind,
}

impl Command {
    pub fn new(
        stanza: Stanza,
        application: impl Into<String>,
        substance: impl Into<String>,
        year_matcher: YearMatcher,
        kind: CommandKind,
    ) -> Self {
        Command {
            stanza,
            application: application.into(),
            substance: substance.into(),
            year_matcher,
            kind,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            CommandKind::Enable { .. } => "enable",
            CommandKind::Equals { .. } => "equals",
            CommandKind::InitialCharge { .. } => "initial charge",
            CommandKind::Set { .. } => "set",
            CommandKind::Change { .. } => "change",
            CommandKind::Retire { .. } => "retire",
            CommandKind::Recharge { .. } => "recharge",
            CommandKind::Recycle { .. } => "recycle",
            CommandKind::Replace { .. } => "replace",
            CommandKind::Cap { .. } => "cap",
            CommandKind::Floor { .. } => "floor",
        }
    }
}
