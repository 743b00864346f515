use crate::sorted_vec_map::SortedVecMap;
use crate::streams::stream::Stream;
use crate::streams::substance_state::SubstanceState;
use crate::types::number::{EngineNumber, Unit};
use crate::types::scope::UseKey;

/// Owns all per-scope state for one (scenario, trial) run. Scopes and
/// `UseKey`s are values; the keeper never hands out aliased mutable state
/// to more than one caller at a time.
#[derive(Debug, Clone, Default)]
pub struct StreamKeeper {
    states: SortedVecMap<UseKey, SubstanceState>,
}

impl StreamKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the substance's state lazily: a substance comes into
    /// existence the first time its `enable`/definitional commands execute
    /// for its scope.
    pub fn get_or_create(&mut self, key: &UseKey) -> &mut SubstanceState {
        self.states
            .get_or_insert_with(key.clone(), SubstanceState::default)
    }

    pub fn get(&self, key: &UseKey) -> Option<&SubstanceState> {
        self.states.get(key)
    }

    pub fn get_mut(&mut self, key: &UseKey) -> Option<&mut SubstanceState> {
        self.states.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &UseKey> {
        self.states.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UseKey, &SubstanceState)> {
        self.states.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// First step of the year loop: snapshot `equipment -> priorEquipment`
    /// and zero every per-year-reset stream for every known scope.
    pub fn begin_year(&mut self) {
        for state in self.states.values_mut() {
            let equipment = state
                .get(Stream::Equipment)
                .cloned()
                .unwrap_or_else(|| EngineNumber::zero(Unit::units()));
            state.set_derived(Stream::PriorEquipment, equipment);
            state.set_derived(Stream::Retired, EngineNumber::zero(Unit::units()));
            state.set_derived(Stream::RecycleEol, EngineNumber::zero(Unit::kg()));
            state.set_derived(Stream::RecycleRecharge, EngineNumber::zero(Unit::kg()));
            state.set_derived(Stream::Recycle, EngineNumber::zero(Unit::kg()));
            state.set_derived(Stream::ImplicitRecharge, EngineNumber::zero(Unit::kg()));
            state.set_derived(Stream::BankChangeKg, EngineNumber::zero(Unit::kg()));
            state.set_derived(Stream::BankChangeTco2e, EngineNumber::zero(Unit::tco2e()));
        }
    }
}
