//! Distributed scenario costing over an optimal power flow solver.
//!
//! A group of workers each loads the same case, solves the base case,
//! agrees on its cost, then prices a fair slice of the scenarios. The
//! coordinator receives every incremental cost in scenario order.

pub mod comm;
pub mod config;
pub mod engine;
pub mod fleet;
pub mod manifest;
pub mod merit;
pub mod partition;
pub mod scenario;

pub use comm::{CommGroup, SoloGroup, ThreadGroup, COORDINATOR};
pub use config::{CostingConfig, PerturbableBound, SolverFailurePolicy};
pub use engine::{
    check_base_costs, reconcile, BaseCase, CostVector, CostingEngine, CostingPhase, SetPoint,
};
pub use fleet::{unit_keys, GeneratorFleet, GeneratorUnit};
pub use manifest::{load_cost_manifest, write_cost_manifest, CostManifest, ScenarioCostRecord};
pub use merit::{MeritOrderFactory, MeritOrderSettings, MeritOrderSolver};
pub use partition::PartitionPlan;
pub use scenario::{clamp_to_capacity, Scenario, ScenarioSet};
