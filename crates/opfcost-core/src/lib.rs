//! # opfcost-core: shared vocabulary for OPF scenario costing
//!
//! Holds the pieces every other opfcost crate agrees on:
//!
//! - [`CostError`]: the failure taxonomy (format, parse, lookup,
//!   configuration, consistency, solver failure).
//! - [`UnitKey`] / [`PerturbableUnitName`]: how generators are addressed by
//!   solvers and by scenario tables.
//! - [`OpfSolver`] / [`SolverFactory`]: the contract for the external AC-OPF
//!   solver. The costing engine only ever talks to a solver through these
//!   traits; convergence internals are the solver's business.

pub mod error;
pub mod solver;
pub mod units;

pub use error::{CostError, CostResult};
pub use solver::*;
pub use units::{PerturbableUnitName, UnitKey};
