//! Distributed scenario costing.
//!
//! Each costing run walks the same phases on every rank:
//!
//! 1. **BaseSolve**: solve the unperturbed network with perturbable units at
//!    their reference values; keep the objective and the dispatch of every
//!    other unit.
//! 2. **Reconcile**: gather base costs on the coordinator and require them to
//!    agree within the configured tolerance.
//! 3. **Partition**: split the requested scenarios fairly over the group.
//! 4. **LocalEvaluate**: price this rank's slice, every fixed unit pinned to
//!    its base set-point and every perturbable unit to its scenario value.
//! 5. **Aggregate**: gather all slices, in global scenario order, on the
//!    coordinator.
//!
//! A rank that fails in BaseSolve or LocalEvaluate still takes part in the
//! next agreement round (see [`CommGroup::all_ok`]), so every rank returns an
//! error instead of waiting in a collective the failed rank never reaches.

use opfcost_core::{
    solve_to_objective, CostError, CostResult, Dispatch, OpfSolver, SolverFactory, UnitBounds,
    UnitKey,
};
use opfcost_io::{parse_case_file, write_case_file, CaseDocument};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::comm::CommGroup;
use crate::config::{CostingConfig, PerturbableBound, SolverFailurePolicy};
use crate::fleet::GeneratorFleet;
use crate::partition::PartitionPlan;
use crate::scenario::{Scenario, ScenarioSet};

/// Generator table columns reset from the pristine case before each base solve.
const RESTORED_GEN_COLUMNS: &[&str] = &["Pmax", "Pmin", "Pg", "Qmax", "Qmin", "Qg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostingPhase {
    BaseSolve,
    Reconcile,
    Partition,
    LocalEvaluate,
    Aggregate,
    Done,
}

impl fmt::Display for CostingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CostingPhase::BaseSolve => "base-solve",
            CostingPhase::Reconcile => "reconcile",
            CostingPhase::Partition => "partition",
            CostingPhase::LocalEvaluate => "local-evaluate",
            CostingPhase::Aggregate => "aggregate",
            CostingPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Set-point of one fixed unit from the base solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetPoint {
    pub row: usize,
    pub unit: UnitKey,
    pub dispatch: Dispatch,
}

/// Result of the unperturbed solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseCase {
    pub cost: f64,
    /// Boundary condition reused by every scenario solve.
    pub set_points: Vec<SetPoint>,
}

/// Incremental costs in global scenario order, held by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostVector {
    pub base_cost: f64,
    pub labels: Vec<String>,
    pub costs: Vec<f64>,
    pub workers: usize,
}

impl CostVector {
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Largest cost, ignoring NaN entries.
    pub fn max(&self) -> Option<f64> {
        self.costs
            .iter()
            .copied()
            .filter(|c| !c.is_nan())
            .fold(None, |acc, c| Some(acc.map_or(c, |m: f64| m.max(c))))
    }

    /// Smallest cost, ignoring NaN entries.
    pub fn min(&self) -> Option<f64> {
        self.costs
            .iter()
            .copied()
            .filter(|c| !c.is_nan())
            .fold(None, |acc, c| Some(acc.map_or(c, |m: f64| m.min(c))))
    }
}

/// Coordinator-side check that every rank saw the same base cost.
pub fn check_base_costs(costs: &[f64], expected: f64, tolerance: f64) -> CostResult<()> {
    let offenders: Vec<String> = costs
        .iter()
        .enumerate()
        .filter(|(_, c)| !((*c - expected).abs() <= tolerance))
        .map(|(rank, c)| format!("rank {rank}: {c}"))
        .collect();
    if offenders.is_empty() {
        Ok(())
    } else {
        Err(CostError::Consistency(format!(
            "base cost {expected} not reproduced within {tolerance} ({}); \
             workers hold divergent network state or the solver is not deterministic",
            offenders.join(", ")
        )))
    }
}

/// Gather base costs on the coordinator, compare them, and agree on the
/// outcome.
///
/// `base_cost` is `None` on a rank whose base solve failed. Any mismatch or
/// failure makes every rank return an error, so the group leaves this call
/// together either way.
pub fn reconcile<C: CommGroup + ?Sized>(
    comm: &C,
    base_cost: Option<f64>,
    tolerance: f64,
) -> CostResult<()> {
    let own = base_cost.unwrap_or(f64::NAN);
    comm.barrier();
    let verdict = match comm.gather(own) {
        Some(costs) => check_base_costs(&costs, own, tolerance),
        None => Ok(()),
    };
    let agreed = comm.all_ok(base_cost.is_some() && verdict.is_ok());
    match verdict {
        Err(err) => {
            error!(rank = comm.rank(), "{err}");
            Err(err)
        }
        Ok(()) if !agreed => Err(CostError::Consistency(
            "base case rejected by the coordinator or failed on another rank; run aborted"
                .to_string(),
        )),
        Ok(()) => Ok(()),
    }
}

/// Prices scenarios for one rank of a worker group.
pub struct CostingEngine<F> {
    network_path: PathBuf,
    pristine: CaseDocument,
    working: CaseDocument,
    fleet: GeneratorFleet,
    factory: F,
    config: CostingConfig,
    phase: CostingPhase,
}

impl<F: SolverFactory> CostingEngine<F> {
    /// Parse the case at `network_path` and classify its generators.
    pub fn open(
        network_path: impl Into<PathBuf>,
        factory: F,
        config: CostingConfig,
    ) -> CostResult<Self> {
        let network_path = network_path.into();
        let doc = parse_case_file(&network_path, &config.dynamic_table_names())?;
        Self::from_document(network_path, doc, factory, config)
    }

    /// Build an engine over an already parsed document. Solvers still load the
    /// network from `network_path`.
    pub fn from_document(
        network_path: impl Into<PathBuf>,
        doc: CaseDocument,
        factory: F,
        config: CostingConfig,
    ) -> CostResult<Self> {
        let fleet = GeneratorFleet::from_document(&doc, &config.perturbable_fuels)?;
        info!(
            generators = fleet.units().len(),
            perturbable = fleet.perturbable().count(),
            "case loaded"
        );
        Ok(Self {
            network_path: network_path.into(),
            working: doc.clone(),
            pristine: doc,
            fleet,
            factory,
            config,
            phase: CostingPhase::Done,
        })
    }

    pub fn fleet(&self) -> &GeneratorFleet {
        &self.fleet
    }

    pub fn document(&self) -> &CaseDocument {
        &self.working
    }

    pub fn config(&self) -> &CostingConfig {
        &self.config
    }

    pub fn network_path(&self) -> &Path {
        &self.network_path
    }

    /// Phase the last (or current) costing run reached.
    pub fn phase(&self) -> CostingPhase {
        self.phase
    }

    /// Real-power capacity of every perturbable unit, by scenario column name.
    pub fn capacities(&self) -> HashMap<String, f64> {
        self.fleet.capacities()
    }

    fn enter(&mut self, phase: CostingPhase) {
        debug!(from = %self.phase, to = %phase, "costing phase");
        self.phase = phase;
    }

    /// Write the working document to `path` and have solvers load it from
    /// there from now on.
    pub fn stage_case(&mut self, path: &Path) -> CostResult<()> {
        write_case_file(&self.working, path)?;
        info!(path = %path.display(), "staged case file for solver input");
        self.network_path = path.to_path_buf();
        Ok(())
    }

    fn perturbable_bounds(&self, value: f64) -> UnitBounds {
        match self.config.perturbable_bound {
            PerturbableBound::Fixed => UnitBounds::fixed_real(value),
            PerturbableBound::Curtailable => UnitBounds::curtailable(value),
        }
    }

    /// Solver keys for scenario columns, in column order.
    pub fn resolve_units(&self, names: &[String]) -> CostResult<Vec<UnitKey>> {
        let keys = names
            .iter()
            .map(|name| self.fleet.resolve(name).map(|u| u.key))
            .collect::<CostResult<Vec<_>>>()?;
        let named: HashSet<&str> = names.iter().map(String::as_str).collect();
        for unit in self.fleet.perturbable() {
            if let Some(name) = &unit.name {
                if !named.contains(name.as_str()) {
                    warn!(unit = %name, "perturbable unit has no scenario column; keeping case limits");
                }
            }
        }
        Ok(keys)
    }

    fn fresh_solver(&self) -> CostResult<F::Solver> {
        let mut solver = self.factory.acquire()?;
        solver.load_network(&self.network_path)?;
        solver.initialize_state()?;
        Ok(solver)
    }

    /// Solve the unperturbed network with perturbable units held at
    /// `reference` (column name, value).
    pub fn base_solve<'a, I>(&mut self, reference: I) -> CostResult<BaseCase>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.enter(CostingPhase::BaseSolve);
        let pristine_gen = self.pristine.table("gen")?;
        self.working
            .table_mut("gen")?
            .restore_columns(pristine_gen, RESTORED_GEN_COLUMNS)?;

        let (names, values): (Vec<String>, Vec<f64>) = reference
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .unzip();
        let keys = self.resolve_units(&names)?;

        let mut solver = self.fresh_solver()?;
        for (key, value) in keys.iter().zip(&values) {
            solver.set_unit_bounds(*key, self.perturbable_bounds(*value))?;
        }
        let cost = solve_to_objective(&mut solver)?;

        let mut set_points = Vec::with_capacity(self.fleet.units().len());
        for unit in self.fleet.fixed() {
            set_points.push(SetPoint {
                row: unit.row,
                unit: unit.key,
                dispatch: solver.dispatch(unit.key)?,
            });
        }
        drop(solver);

        let gen = self.working.table_mut("gen")?;
        for sp in &set_points {
            gen.set_value(sp.row, "Pg", sp.dispatch.p)?;
            gen.set_value(sp.row, "Qg", sp.dispatch.q)?;
        }

        info!(base_cost = cost, fixed_units = set_points.len(), "base case solved");
        Ok(BaseCase { cost, set_points })
    }

    /// Incremental cost of one scenario over the base case, on a fresh solver.
    pub fn price_scenario(
        &self,
        base: &BaseCase,
        keys: &[UnitKey],
        scenario: &Scenario,
    ) -> CostResult<f64> {
        let mut solver = self.fresh_solver()?;
        for sp in &base.set_points {
            solver.set_unit_bounds(sp.unit, UnitBounds::fixed(sp.dispatch.p, sp.dispatch.q))?;
        }
        for (key, value) in keys.iter().zip(&scenario.values) {
            solver.set_unit_bounds(*key, self.perturbable_bounds(*value))?;
        }
        let objective = solve_to_objective(&mut solver)?;
        debug!(
            scenario = scenario.index,
            label = %scenario.label,
            objective,
            "scenario solved"
        );
        Ok(objective - base.cost)
    }

    /// Price the scenarios with global indices in `range`, in order.
    pub fn evaluate_local(
        &self,
        base: &BaseCase,
        set: &ScenarioSet,
        range: Range<usize>,
    ) -> CostResult<Vec<f64>> {
        let keys = self.resolve_units(set.units())?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.thread_count())
            .build()
            .map_err(|e| CostError::config(format!("building local evaluation pool: {e}")))?;
        let policy = self.config.failure_policy;

        pool.install(|| {
            range
                .into_par_iter()
                .map(|index| {
                    let priced = set
                        .scenario(index)
                        .and_then(|scenario| self.price_scenario(base, &keys, &scenario));
                    match (priced, policy) {
                        (Ok(cost), _) => Ok(cost),
                        (Err(err), SolverFailurePolicy::RecordNan) => {
                            warn!(scenario = index, "scenario failed, recording NaN: {err}");
                            Ok(f64::NAN)
                        }
                        (Err(err), SolverFailurePolicy::Abort) => Err(err),
                    }
                })
                .collect()
        })
    }

    /// Run a full costing over `set` as one rank of `comm`.
    ///
    /// Returns the global cost vector on the coordinator and `None` on every
    /// other rank.
    pub fn cost_scenarios<C: CommGroup + ?Sized>(
        &mut self,
        comm: &C,
        set: &ScenarioSet,
    ) -> CostResult<Option<CostVector>> {
        let rank = comm.rank();
        let available = set.len();
        let requested = self.config.n_scenarios.unwrap_or(available);
        if comm.is_coordinator() {
            info!(available, requested, "scenario counts");
        }
        // every rank holds the same set, so all ranks fail here together
        if available < requested {
            return Err(CostError::config(format!(
                "{requested} scenarios requested but only {available} available"
            )));
        }

        let base = self.base_solve(set.reference());
        if let Err(err) = &base {
            error!(rank, "base solve failed: {err}");
        }

        self.enter(CostingPhase::Reconcile);
        let reconciled = reconcile(
            comm,
            base.as_ref().ok().map(|b| b.cost),
            self.config.consistency_tolerance,
        );
        let base = base?;
        reconciled?;

        self.enter(CostingPhase::Partition);
        let plan = PartitionPlan::new(requested, comm.size())?;
        let range = plan.range_for(rank)?;
        if comm.is_coordinator() {
            info!(workers = plan.workers(), counts = ?plan.counts(), "scenarios partitioned");
        }
        debug!(rank, start = range.start, count = range.len(), "local slice");

        self.enter(CostingPhase::LocalEvaluate);
        let local = self.evaluate_local(&base, set, range);
        if let Err(err) = &local {
            error!(rank, "local evaluation aborted: {err}");
        }
        if !comm.all_ok(local.is_ok()) {
            return Err(match local {
                Err(err) => err,
                Ok(_) => CostError::solver("another rank aborted local evaluation; run abandoned"),
            });
        }
        let local = local?;

        self.enter(CostingPhase::Aggregate);
        comm.barrier();
        let gathered = comm.gatherv(&local, plan.counts())?;
        comm.barrier();

        self.enter(CostingPhase::Done);
        Ok(gathered.map(|costs| {
            let vector = CostVector {
                base_cost: base.cost,
                labels: set.labels()[..requested].to_vec(),
                costs,
                workers: comm.size(),
            };
            info!(
                scenarios = vector.len(),
                max = vector.max().unwrap_or(f64::NAN),
                min = vector.min().unwrap_or(f64::NAN),
                "gathered scenario costs"
            );
            vector
        }))
    }
}
