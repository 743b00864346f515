//! Loads the parser's stable output (§6 "Command input"): an ordered
//! command list plus the scenario declarations that stack policies over a
//! year range. The QubecTalk parser itself is out of scope (§1); this
//! crate consumes its pre-parsed JSON bridge directly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{EngineResult, IoError, ScriptError};
use crate::scenario::Scenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptFile {
    pub commands: Vec<Command>,
    pub scenarios: Vec<Scenario>,
}

impl ScriptFile {
    pub fn load(path: impl AsRef<Path>) -> EngineResult<ScriptFile> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IoError::Open {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ScriptError::Malformed {
                position: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Scenarios named `name`, or every declared scenario when `name` is
    /// `None` (§6 ADDED CLI surface: `--scenario` absent runs all).
    pub fn scenarios_matching(&self, name: Option<&str>) -> Vec<Scenario> {
        match name {
            Some(name) => self.scenarios.iter().filter(|s| s.name == name).cloned().collect(),
            None => self.scenarios.clone(),
        }
    }
}
