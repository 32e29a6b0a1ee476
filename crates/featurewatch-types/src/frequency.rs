//! Schedule class for a saved search's refresh.

use serde::{Deserialize, Serialize};

/// The schedule class for a saved search's refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    /// Refreshed as soon as a configuration/data change is observed.
    Immediate,
    /// Refreshed on the weekly batch trigger.
    Weekly,
}

impl Frequency {
    /// The wire representation used in envelope `data.frequency` fields.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Frequency::Immediate => "IMMEDIATE",
            Frequency::Weekly => "WEEKLY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}
