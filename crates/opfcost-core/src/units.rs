//! Generator unit identity.
//!
//! A solver addresses a generator by the bus it sits on plus an ordinal among
//! the generator rows of that bus. Scenario tables name perturbable units as
//! `"<bus>_Wind_<seq>"`, where `seq` counts only the perturbable units at that
//! bus; resolving such a name to a [`UnitKey`] needs the case's generator table
//! and happens in the costing engine.

use crate::error::{CostError, CostResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Solver-facing identity of one generator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    /// External bus number (`bus_i`).
    pub bus: usize,
    /// 1-based position among generator rows at `bus`.
    pub ordinal: usize,
}

impl UnitKey {
    pub const fn new(bus: usize, ordinal: usize) -> Self {
        Self { bus, ordinal }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.bus, self.ordinal)
    }
}

/// Parsed form of a scenario column name such as `"37_Wind_2"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PerturbableUnitName {
    pub bus: usize,
    pub kind: String,
    /// 1-based sequence among perturbable units at `bus`.
    pub sequence: usize,
}

impl PerturbableUnitName {
    pub fn new(bus: usize, kind: impl Into<String>, sequence: usize) -> Self {
        Self {
            bus,
            kind: kind.into(),
            sequence,
        }
    }

    pub fn wind(bus: usize, sequence: usize) -> Self {
        Self::new(bus, "Wind", sequence)
    }
}

impl FromStr for PerturbableUnitName {
    type Err = CostError;

    fn from_str(s: &str) -> CostResult<Self> {
        let parts: Vec<&str> = s.trim().split('_').collect();
        if parts.len() != 3 || parts[1].is_empty() {
            return Err(CostError::lookup(format!(
                "unit name '{s}' is not of the form <bus>_<kind>_<seq>"
            )));
        }
        let bus = parts[0]
            .parse::<usize>()
            .map_err(|_| CostError::lookup(format!("unit name '{s}' has a non-numeric bus")))?;
        let sequence = parts[2].parse::<usize>().map_err(|_| {
            CostError::lookup(format!("unit name '{s}' has a non-numeric sequence id"))
        })?;
        if sequence == 0 {
            return Err(CostError::lookup(format!(
                "unit name '{s}' has sequence 0; sequences start at 1"
            )));
        }
        Ok(Self {
            bus,
            kind: parts[1].to_string(),
            sequence,
        })
    }
}

impl fmt::Display for PerturbableUnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.bus, self.kind, self.sequence)
    }
}
