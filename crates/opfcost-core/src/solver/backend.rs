use crate::error::{CostError, CostResult};
use crate::units::UnitKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Outcome of one `solve()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    Converged,
    Infeasible,
    IterationLimit,
    NumericalError,
}

impl ConvergenceStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged)
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceStatus::Converged => write!(f, "converged"),
            ConvergenceStatus::Infeasible => write!(f, "infeasible"),
            ConvergenceStatus::IterationLimit => write!(f, "iteration_limit"),
            ConvergenceStatus::NumericalError => write!(f, "numerical_error"),
        }
    }
}

/// Real/reactive limits imposed on one unit before a solve.
///
/// `None` on a reactive bound leaves it at whatever the network definition
/// says; solvers that take a sentinel for "ignore" translate it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitBounds {
    pub p_min: f64,
    pub p_max: f64,
    pub q_min: Option<f64>,
    pub q_max: Option<f64>,
}

impl UnitBounds {
    /// Pin both real and reactive output (min = max).
    pub fn fixed(p: f64, q: f64) -> Self {
        Self {
            p_min: p,
            p_max: p,
            q_min: Some(q),
            q_max: Some(q),
        }
    }

    /// Pin real output, leave reactive unconstrained.
    pub fn fixed_real(p: f64) -> Self {
        Self {
            p_min: p,
            p_max: p,
            q_min: None,
            q_max: None,
        }
    }

    /// Allow real output anywhere in `[0, p_max]`, reactive unconstrained.
    pub fn curtailable(p_max: f64) -> Self {
        Self {
            p_min: 0.0,
            p_max,
            q_min: None,
            q_max: None,
        }
    }
}

/// Real and reactive dispatch of one unit after a solve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dispatch {
    pub p: f64,
    pub q: f64,
}

/// Contract for an AC-OPF solver instance.
///
/// One instance models one network snapshot: load it, adjust unit bounds,
/// solve, read results. Instances must not share mutable state, so that
/// independent scenarios can be solved concurrently on separate handles.
/// Identical inputs must give identical objective values.
pub trait OpfSolver: Send {
    /// Solver name for logs.
    fn name(&self) -> &'static str;

    /// Read the network definition from a case file.
    fn load_network(&mut self, path: &Path) -> CostResult<()>;

    /// Build internal state from the loaded network. Called once after
    /// `load_network` and before any bound changes.
    fn initialize_state(&mut self) -> CostResult<()>;

    /// Override the limits of one unit for the next solve.
    fn set_unit_bounds(&mut self, unit: UnitKey, bounds: UnitBounds) -> CostResult<()>;

    fn solve(&mut self) -> CostResult<ConvergenceStatus>;

    /// Objective of the last converged solve.
    fn objective_value(&self) -> CostResult<f64>;

    /// Dispatch of one unit in the last converged solve.
    fn dispatch(&self, unit: UnitKey) -> CostResult<Dispatch>;
}

/// Hands out fresh solver instances.
///
/// Each scenario acquires its own handle and drops it when the solve is done,
/// so a handle never outlives the scenario it priced.
pub trait SolverFactory: Send + Sync {
    type Solver: OpfSolver;

    fn acquire(&self) -> CostResult<Self::Solver>;
}

/// Run `solve()` and return the objective, turning any non-converged status
/// into [`CostError::SolverFailure`].
pub fn solve_to_objective<S: OpfSolver + ?Sized>(solver: &mut S) -> CostResult<f64> {
    let status = solver.solve()?;
    if !status.is_converged() {
        return Err(CostError::solver(format!(
            "{} finished with status {}",
            solver.name(),
            status
        )));
    }
    solver.objective_value()
}
