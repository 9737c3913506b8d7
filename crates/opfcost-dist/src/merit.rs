//! Merit-order economic dispatch behind the [`OpfSolver`] contract.
//!
//! Dispatches in-service generators in order of marginal cost to cover the
//! total bus demand. Does not model network constraints, losses, or voltage.
//! Demand left unserved and generation in excess of demand (from units pinned
//! above what is needed) are priced with fixed penalties, so every solve with
//! consistent bounds converges. Deterministic for identical inputs.

use opfcost_core::{
    ConvergenceStatus, CostError, CostResult, Dispatch, OpfSolver, SolverFactory, UnitBounds,
    UnitKey,
};
use opfcost_io::{generator_costs, parse_case_file, GenCost};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::fleet::unit_keys;

const BALANCE_TOL: f64 = 1e-9;

/// Penalty prices of the merit-order solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeritOrderSettings {
    /// $/MWh for demand that cannot be served.
    pub loss_of_load_cost: f64,
    /// $/MWh for generation above demand.
    pub spilled_power_cost: f64,
}

impl Default for MeritOrderSettings {
    fn default() -> Self {
        Self {
            loss_of_load_cost: 1000.0,
            spilled_power_cost: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct MeritUnit {
    key: UnitKey,
    in_service: bool,
    bounds: UnitBounds,
    q_range: (f64, f64),
    cost: GenCost,
}

#[derive(Debug, Clone, Default)]
struct MeritSolution {
    objective: f64,
    dispatch: HashMap<UnitKey, Dispatch>,
}

/// Single-snapshot merit-order solver.
#[derive(Debug, Default)]
pub struct MeritOrderSolver {
    settings: MeritOrderSettings,
    demand_mw: f64,
    units: Vec<MeritUnit>,
    solution: Option<MeritSolution>,
    initialized: bool,
    loaded: Option<LoadedCase>,
}

#[derive(Debug)]
struct LoadedCase {
    demand_mw: f64,
    units: Vec<MeritUnit>,
}

impl MeritOrderSolver {
    pub fn new(settings: MeritOrderSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    fn unit_index(&self, unit: UnitKey) -> CostResult<usize> {
        self.units
            .iter()
            .position(|u| u.key == unit)
            .ok_or_else(|| CostError::lookup(format!("no generator {unit} in the loaded network")))
    }

    fn dispatch_units(&self) -> CostResult<(ConvergenceStatus, MeritSolution)> {
        for unit in &self.units {
            let b = unit.bounds;
            if !(b.p_min.is_finite() && b.p_max.is_finite()) {
                return Ok((ConvergenceStatus::NumericalError, MeritSolution::default()));
            }
            if unit.in_service && b.p_min > b.p_max + BALANCE_TOL {
                return Ok((ConvergenceStatus::Infeasible, MeritSolution::default()));
            }
        }

        let mut p: Vec<f64> = self
            .units
            .iter()
            .map(|u| if u.in_service { u.bounds.p_min } else { 0.0 })
            .collect();
        let mut remaining = self.demand_mw - p.iter().sum::<f64>();

        let mut order: Vec<usize> = (0..self.units.len())
            .filter(|&i| self.units[i].in_service)
            .collect();
        order.sort_by(|&a, &b| {
            let mc_a = self.units[a].cost.marginal_cost(p[a]);
            let mc_b = self.units[b].cost.marginal_cost(p[b]);
            mc_a.partial_cmp(&mc_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        for &idx in &order {
            if remaining <= BALANCE_TOL {
                break;
            }
            let headroom = (self.units[idx].bounds.p_max - p[idx]).max(0.0);
            let increment = remaining.min(headroom);
            p[idx] += increment;
            remaining -= increment;
        }

        let unserved = remaining.max(0.0);
        let spilled = (-remaining).max(0.0);
        let mut objective = unserved * self.settings.loss_of_load_cost
            + spilled * self.settings.spilled_power_cost;
        let mut dispatch = HashMap::with_capacity(self.units.len());
        for (unit, &pg) in self.units.iter().zip(&p) {
            if unit.in_service {
                objective += unit.cost.evaluate(pg);
            }
            let q_lo = unit.bounds.q_min.unwrap_or(unit.q_range.0);
            let q_hi = unit.bounds.q_max.unwrap_or(unit.q_range.1);
            let q = if unit.in_service { 0.0_f64.max(q_lo).min(q_hi) } else { 0.0 };
            dispatch.insert(unit.key, Dispatch { p: pg, q });
        }
        if !objective.is_finite() {
            return Ok((ConvergenceStatus::NumericalError, MeritSolution::default()));
        }
        debug!(unserved, spilled, objective, "merit-order dispatch complete");
        Ok((ConvergenceStatus::Converged, MeritSolution { objective, dispatch }))
    }
}

fn load_case(path: &Path) -> CostResult<LoadedCase> {
    let doc = parse_case_file(path, &["bus", "gen"])?;
    let bus = doc.table("bus")?;
    let gen = doc.table("gen")?;
    let costs = generator_costs(&doc)?;
    if costs.len() < gen.len() {
        return Err(CostError::lookup(format!(
            "gencost has {} rows for {} generators",
            costs.len(),
            gen.len()
        )));
    }
    let demand_mw = bus.column("Pd")?.iter().sum();
    let keys = unit_keys(gen)?;
    let mut units = Vec::with_capacity(gen.len());
    for (row, (key, cost)) in keys.into_iter().zip(costs).enumerate() {
        units.push(MeritUnit {
            key,
            in_service: gen.value(row, "status")? > 0.0,
            bounds: UnitBounds {
                p_min: gen.value(row, "Pmin")?,
                p_max: gen.value(row, "Pmax")?,
                q_min: None,
                q_max: None,
            },
            q_range: (gen.value(row, "Qmin")?, gen.value(row, "Qmax")?),
            cost,
        });
    }
    Ok(LoadedCase { demand_mw, units })
}

impl OpfSolver for MeritOrderSolver {
    fn name(&self) -> &'static str {
        "merit-order"
    }

    fn load_network(&mut self, path: &Path) -> CostResult<()> {
        self.loaded = Some(load_case(path)?);
        self.initialized = false;
        self.solution = None;
        Ok(())
    }

    fn initialize_state(&mut self) -> CostResult<()> {
        let loaded = self
            .loaded
            .take()
            .ok_or_else(|| CostError::solver("initialize_state called before load_network"))?;
        self.demand_mw = loaded.demand_mw;
        self.units = loaded.units;
        self.initialized = true;
        Ok(())
    }

    fn set_unit_bounds(&mut self, unit: UnitKey, bounds: UnitBounds) -> CostResult<()> {
        if !self.initialized {
            return Err(CostError::solver(format!(
                "bounds for {unit} set before initialize_state"
            )));
        }
        let idx = self.unit_index(unit)?;
        self.units[idx].bounds = bounds;
        self.solution = None;
        Ok(())
    }

    fn solve(&mut self) -> CostResult<ConvergenceStatus> {
        if !self.initialized {
            return Err(CostError::solver("solve called before initialize_state"));
        }
        let (status, solution) = self.dispatch_units()?;
        self.solution = status.is_converged().then_some(solution);
        Ok(status)
    }

    fn objective_value(&self) -> CostResult<f64> {
        self.solution
            .as_ref()
            .map(|s| s.objective)
            .ok_or_else(|| CostError::solver("no converged solution available"))
    }

    fn dispatch(&self, unit: UnitKey) -> CostResult<Dispatch> {
        let solution = self
            .solution
            .as_ref()
            .ok_or_else(|| CostError::solver("no converged solution available"))?;
        solution
            .dispatch
            .get(&unit)
            .copied()
            .ok_or_else(|| CostError::lookup(format!("no generator {unit} in the solution")))
    }
}

/// Hands out fresh [`MeritOrderSolver`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeritOrderFactory {
    pub settings: MeritOrderSettings,
}

impl MeritOrderFactory {
    pub fn new(settings: MeritOrderSettings) -> Self {
        Self { settings }
    }
}

impl SolverFactory for MeritOrderFactory {
    type Solver = MeritOrderSolver;

    fn acquire(&self) -> CostResult<MeritOrderSolver> {
        Ok(MeritOrderSolver::new(self.settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfcost_core::solve_to_objective;
    use std::io::Write;

    const CASE: &str = "\
function mpc = merit
mpc.baseMVA = 100;
mpc.bus = [
\t1\t3\t0\t0\t0\t0\t1\t1\t0\t230\t1\t1.1\t0.9;
\t2\t1\t150\t20\t0\t0\t1\t1\t0\t230\t1\t1.1\t0.9;
];
mpc.gen = [
\t1\t0\t0\t50\t-50\t1\t100\t1\t100\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0;
\t1\t0\t0\t50\t-50\t1\t100\t1\t100\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0;
\t2\t0\t0\t10\t-10\t1\t100\t0\t100\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0\t0;
];
mpc.gencost = [
\t2\t0\t0\t3\t0\t30\t0;
\t2\t0\t0\t3\t0\t10\t0;
\t2\t0\t0\t3\t0\t1\t0;
];
";

    fn loaded_solver() -> (tempfile::NamedTempFile, MeritOrderSolver) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CASE.as_bytes()).unwrap();
        let mut solver = MeritOrderFactory::default().acquire().unwrap();
        solver.load_network(file.path()).unwrap();
        solver.initialize_state().unwrap();
        (file, solver)
    }

    #[test]
    fn cheapest_units_are_dispatched_first() {
        let (_file, mut solver) = loaded_solver();
        let objective = solve_to_objective(&mut solver).unwrap();
        // 100 MW from the $10 unit, 50 MW from the $30 unit; bus 2 unit is out
        assert!((objective - (100.0 * 10.0 + 50.0 * 30.0)).abs() < 1e-9);
        assert_eq!(solver.dispatch(UnitKey::new(1, 2)).unwrap().p, 100.0);
        assert_eq!(solver.dispatch(UnitKey::new(1, 1)).unwrap().p, 50.0);
        assert_eq!(solver.dispatch(UnitKey::new(2, 1)).unwrap().p, 0.0);
    }

    #[test]
    fn pinned_units_shift_the_dispatch() {
        let (_file, mut solver) = loaded_solver();
        solver
            .set_unit_bounds(UnitKey::new(1, 2), UnitBounds::fixed(20.0, 0.0))
            .unwrap();
        let objective = solve_to_objective(&mut solver).unwrap();
        // the $30 unit tops out at 100 MW, leaving 30 MW unserved
        let expected = 20.0 * 10.0 + 100.0 * 30.0 + 30.0 * 1000.0;
        assert!((objective - expected).abs() < 1e-9);
    }

    #[test]
    fn inverted_bounds_are_infeasible() {
        let (_file, mut solver) = loaded_solver();
        let bounds = UnitBounds {
            p_min: 60.0,
            p_max: 10.0,
            q_min: None,
            q_max: None,
        };
        solver.set_unit_bounds(UnitKey::new(1, 1), bounds).unwrap();
        assert_eq!(solver.solve().unwrap(), ConvergenceStatus::Infeasible);
        assert!(solver.objective_value().is_err());
    }

    #[test]
    fn identical_inputs_give_identical_objectives() {
        let (_f1, mut a) = loaded_solver();
        let (_f2, mut b) = loaded_solver();
        assert_eq!(
            solve_to_objective(&mut a).unwrap().to_bits(),
            solve_to_objective(&mut b).unwrap().to_bits()
        );
    }

    #[test]
    fn calls_out_of_order_are_rejected() {
        let mut solver = MeritOrderSolver::default();
        assert!(solver.solve().is_err());
        assert!(solver
            .set_unit_bounds(UnitKey::new(1, 1), UnitBounds::fixed_real(1.0))
            .is_err());
        assert!(solver.initialize_state().is_err());
    }
}
