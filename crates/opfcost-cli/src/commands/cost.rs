//! Scenario costing on an in-process worker group.

use anyhow::{anyhow, Context, Result};
use opfcost_cli::cli::CostArgs;
use opfcost_cli::config::OpfcostConfig;
use opfcost_dist::{
    write_cost_manifest, CostManifest, CostVector, CostingConfig, CostingEngine,
    MeritOrderFactory, ScenarioSet, ThreadGroup,
};
use opfcost_io::read_labeled_csv;
use std::collections::HashMap;
use std::io::{self, Write};
use tabwriter::TabWriter;
use tracing::info;

fn costing_config(args: &CostArgs, config: &OpfcostConfig) -> CostingConfig {
    let mut costing = config.costing.clone();
    if args.scenarios.is_some() {
        costing.n_scenarios = args.scenarios;
    }
    if let Some(threads) = args.threads {
        costing.local_threads = threads;
    }
    if let Some(policy) = args.failure_policy {
        costing.failure_policy = policy.into();
    }
    if let Some(bound) = args.bound {
        costing.perturbable_bound = bound.into();
    }
    costing
}

pub fn handle(args: &CostArgs, config: &OpfcostConfig) -> Result<()> {
    let costing = costing_config(args, config);
    let factory = MeritOrderFactory::new(config.solver);

    let deviations = read_labeled_csv(&args.deviations)?;
    let reference: HashMap<String, f64> = read_labeled_csv(&args.reference)?
        .first_row()
        .with_context(|| format!("reading reference point '{}'", args.reference.display()))?
        .into_iter()
        .collect();
    let capacities = CostingEngine::open(&args.case, factory, costing.clone())?.capacities();
    let set = ScenarioSet::new(&deviations, &reference, &capacities)?;
    info!(
        workers = args.workers,
        scenarios = set.len(),
        units = set.units().len(),
        "starting costing run"
    );

    let results = ThreadGroup::run(args.workers, |member| {
        let mut engine = CostingEngine::open(&args.case, factory, costing.clone())?;
        engine.cost_scenarios(&member, &set)
    })?;

    let mut gathered: Option<CostVector> = None;
    for result in results {
        if let Some(costs) = result? {
            gathered = Some(costs);
        }
    }
    let costs = gathered.ok_or_else(|| anyhow!("coordinator returned no costs"))?;

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "INDEX\tSCENARIO\tCOST")?;
    for (index, (label, cost)) in costs.labels.iter().zip(&costs.costs).enumerate() {
        writeln!(writer, "{index}\t{label}\t{cost:.4}")?;
    }
    writer.flush()?;
    println!(
        "base cost {:.4}; max {:.4}; min {:.4}",
        costs.base_cost,
        costs.max().unwrap_or(f64::NAN),
        costs.min().unwrap_or(f64::NAN)
    );

    if let Some(path) = &args.manifest {
        let manifest = CostManifest::from_costs(args.case.display().to_string(), &costs);
        write_cost_manifest(path, &manifest)?;
        info!(path = %path.display(), "cost manifest written");
    }
    Ok(())
}
