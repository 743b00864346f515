//! Simulation state: the closed [`stream::Stream`] tag set, per-scope
//! [`substance_state::SubstanceState`], and the [`keeper::StreamKeeper`]
//! that owns all of it for one (scenario, trial) run.

pub mod keeper;
pub mod stream;
pub mod substance_state;

pub use keeper::StreamKeeper;
pub use stream::{ConsumptionSource, SalesStream, Stream};
pub use substance_state::{RecycleProgram, RecycleStage, SubstanceState};
