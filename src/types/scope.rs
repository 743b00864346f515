use serde::{Deserialize, Serialize};

/// `(stanza, application, substance)` — identifies the active context a
/// command executes against. `Scope`s and [`UseKey`]s are plain values: no
/// aliasing, no shared mutable state between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub stanza: Stanza,
    pub application: String,
    pub substance: String,
}

impl Scope {
    pub fn new(stanza: Stanza, application: impl Into<String>, substance: impl Into<String>) -> Self {
        Scope {
            stanza,
            application: application.into(),
            substance: substance.into(),
        }
    }

    pub fn use_key(&self) -> UseKey {
        UseKey {
            application: self.application.clone(),
            substance: self.substance.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stanza {
    Default,
    Policy(String),
    Simulations,
}

impl Stanza {
    pub fn name(&self) -> String {
        match self {
            Stanza::Default => "default".to_string(),
            Stanza::Policy(name) => name.clone(),
            Stanza::Simulations => "simulations".to_string(),
        }
    }
}

/// `(application, substance)` used as the map key into the `StreamKeeper`.
/// Two keys are equal iff both components are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UseKey {
    pub application: String,
    pub substance: String,
}

impl UseKey {
    pub fn new(application: impl Into<String>, substance: impl Into<String>) -> Self {
        UseKey {
            application: application.into(),
            substance: substance.into(),
        }
    }
}
