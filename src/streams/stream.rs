use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The closed, tagged set of per-scope, per-year streams, as an `enum`
/// rather than a dynamic string key; strings only appear at the
/// command/CSV boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Stream {
    /// Primary sales stream, user-set, zero unless `enable`d.
    Domestic,
    /// Primary sales stream, user-set, zero unless `enable`d.
    Import,
    /// Primary sales stream, user-set, zero unless `enable`d.
    Export,
    /// Derived: `domestic + import + recycle` within a substance.
    Sales,
    /// Derived: current equipment stock, in units.
    Equipment,
    /// Derived: `equipment` as of the prior year (read-only snapshot).
    PriorEquipment,
    /// Derived: units retired this year.
    Retired,
    /// Derived: kg of recharge implied when the user specified sales in units.
    ImplicitRecharge,
    /// Derived: recycled kg recovered from end-of-life units.
    RecycleEol,
    /// Derived: recycled kg recovered during recharge.
    RecycleRecharge,
    /// Derived: `recycleEol + recycleRecharge`.
    Recycle,
    /// Derived: cumulative kg held in installed equipment.
    BankKg,
    /// Derived: `bankKg` expressed in tCO2e via GWP.
    BankTco2e,
    /// Derived: `bankKg[y] - bankKg[y-1]`.
    BankChangeKg,
    /// Derived: `bankChangeKg` expressed in tCO2e via GWP.
    BankChangeTco2e,
    /// Derived: tCO2e twin of a volume stream.
    Consumption(ConsumptionSource),
}

/// The volume streams that carry a paired `_consumption` twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum ConsumptionSource {
    Domestic,
    Import,
    Export,
    Recycle,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Domestic => write!(f, "domestic"),
            Stream::Import => write!(f, "import"),
            Stream::Export => write!(f, "export"),
            Stream::Sales => write!(f, "sales"),
            Stream::Equipment => write!(f, "equipment"),
            Stream::PriorEquipment => write!(f, "priorEquipment"),
            Stream::Retired => write!(f, "retired"),
            Stream::ImplicitRecharge => write!(f, "implicitRecharge"),
            Stream::RecycleEol => write!(f, "recycleEol"),
            Stream::RecycleRecharge => write!(f, "recycleRecharge"),
            Stream::Recycle => write!(f, "recycle"),
            Stream::BankKg => write!(f, "bankKg"),
            Stream::BankTco2e => write!(f, "bankTCO2e"),
            Stream::BankChangeKg => write!(f, "bankChangeKg"),
            Stream::BankChangeTco2e => write!(f, "bankChangeTCO2e"),
            Stream::Consumption(source) => write!(f, "{source}Consumption"),
        }
    }
}

/// Streams whose value is the user's direct responsibility (subset of
/// `{domestic, import, export}`); only set when the matching `enable`
/// command is present for the substance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum SalesStream {
    Domestic,
    Import,
    Export,
}

impl SalesStream {
    pub fn as_stream(self) -> Stream {
        match self {
            SalesStream::Domestic => Stream::Domestic,
            SalesStream::Import => Stream::Import,
            SalesStream::Export => Stream::Export,
        }
    }
}
