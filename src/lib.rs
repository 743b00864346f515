//! KigaliSim engine: projects consumption, equipment populations,
//! emissions, and refrigerant banks of halocarbon substances under
//! user-defined policy interventions, evaluating Kigali-Amendment-style
//! phase-down scenarios across (scenario, trial, application, substance,
//! year) rows.
//!
//! The QubecTalk parser, UI, and export dialogs are out of scope (§1); this
//! crate consumes an already-parsed [`command::Command`] list (see
//! [`script::ScriptFile`]) and produces CSV rows (see [`report`]).

pub mod command;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod recalc;
pub mod report;
pub mod result;
pub mod scenario;
pub mod script;
pub mod sorted_vec_map;
pub mod streams;
pub mod types;
pub mod validate;
