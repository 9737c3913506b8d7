pub mod backend;

pub use backend::{
    solve_to_objective, ConvergenceStatus, Dispatch, OpfSolver, SolverFactory, UnitBounds,
};
