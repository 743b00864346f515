//! Scenarios stack policies over a year range (§4.2, §5). A [`Scenario`]
//! names an ordered list of [`Policy`] stanzas applied on top of the
//! baseline commands for every year in `[start, end]`.

pub mod runner;

use serde::{Deserialize, Serialize};

/// One named policy stanza, applied in the order it appears in the
/// scenario's `policies` list (§5 "application order follows the
/// scenario's policy list").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Policy { name: name.into() }
    }
}

/// A named combination of policies over a year range (GLOSSARY
/// "Scenario"). `trials` is the number of Monte-Carlo realizations to run
/// for this scenario; each gets its own deterministically-derived seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub start_year: i64,
    pub end_year: i64,
    pub policies: Vec<Policy>,
    pub trials: u32,
}

impl Scenario {
    pub fn new(name: impl Into<String>, start_year: i64, end_year: i64) -> Self {
        Scenario {
            name: name.into(),
            start_year,
            end_year,
            policies: Vec::new(),
            trials: 1,
        }
    }

    pub fn with_policies(mut self, policies: Vec<Policy>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials.max(1);
        self
    }
}
