//! CSV emission (§6): the engine's only externally-visible output surface
//! besides the typed [`crate::error::EngineError`] summary.

pub mod csv_io;

pub use csv_io::write_rows;
