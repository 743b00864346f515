//! The engine driver (§4.2): owns the active [`Scope`], the current
//! simulated year, the [`StreamKeeper`], and a seeded RNG. `step_year` is
//! the only place a year boundary crosses; every other mutation flows
//! through a command executor.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::streams::keeper::StreamKeeper;
use crate::streams::stream::{SalesStream, Stream};
use crate::types::number::EngineNumber;
use crate::types::scope::{Scope, Stanza, UseKey};

pub struct Engine {
    scope: Scope,
    year: i64,
    scenario_start: i64,
    scenario_end: i64,
    keeper: StreamKeeper,
    rng: StdRng,
}

impl Engine {
    pub fn new(scenario_start: i64, scenario_end: i64, seed: u64) -> Self {
        Engine {
            scope: Scope::new(Stanza::Default, String::new(), String::new()),
            year: scenario_start,
            scenario_start,
            scenario_end,
            keeper: StreamKeeper::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn set_stanza(&mut self, stanza: Stanza) {
        self.scope.stanza = stanza;
    }

    pub fn set_application(&mut self, application: impl Into<String>) {
        self.scope.application = application.into();
    }

    /// Changes the active substance, lazily creating its state the first
    /// time it is addressed for this `(application, substance)` pair.
    pub fn set_substance(&mut self, substance: impl Into<String>) {
        self.scope.substance = substance.into();
        let key = self.scope.use_key();
        self.keeper.get_or_create(&key);
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn scenario_start(&self) -> i64 {
        self.scenario_start
    }

    pub fn scenario_end(&self) -> i64 {
        self.scenario_end
    }

    pub fn stream_keeper(&self) -> &StreamKeeper {
        &self.keeper
    }

    pub fn stream_keeper_mut(&mut self) -> &mut StreamKeeper {
        &mut self.keeper
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn get_stream(&self, use_key: &UseKey, stream: Stream) -> Option<&EngineNumber> {
        self.keeper.get(use_key).and_then(|s| s.get(stream))
    }

    pub fn get_initial_charge(&self, use_key: &UseKey, stream: SalesStream) -> Option<&EngineNumber> {
        self.keeper.get(use_key).and_then(|s| s.initial_charge.get(&stream))
    }

    /// Advances to the next year: snapshots `equipment -> priorEquipment`
    /// and resets every per-year stream across all known scopes (§4.2 step 1).
    #[tracing::instrument(skip(self))]
    pub fn step_year(&mut self) {
        self.keeper.begin_year();
        self.year += 1;
        info!(year = self.year, "advanced to next simulation year");
    }

    pub fn is_done(&self) -> bool {
        self.year > self.scenario_end
    }
}
