use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::CostVector;

/// One priced scenario. `cost` is `None` when the solve failed and NaN was
/// recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCostRecord {
    pub index: usize,
    pub label: String,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostManifest {
    pub created_at: DateTime<Utc>,
    pub case: String,
    pub base_cost: f64,
    pub requested_scenarios: usize,
    pub workers: usize,
    pub scenarios: Vec<ScenarioCostRecord>,
    pub max: Option<f64>,
    pub min: Option<f64>,
}

impl CostManifest {
    pub fn from_costs(case: impl Into<String>, costs: &CostVector) -> Self {
        let scenarios = costs
            .labels
            .iter()
            .zip(&costs.costs)
            .enumerate()
            .map(|(index, (label, cost))| ScenarioCostRecord {
                index,
                label: label.clone(),
                cost: (!cost.is_nan()).then_some(*cost),
            })
            .collect();
        Self {
            created_at: Utc::now(),
            case: case.into(),
            base_cost: costs.base_cost,
            requested_scenarios: costs.len(),
            workers: costs.workers,
            scenarios,
            max: costs.max(),
            min: costs.min(),
        }
    }
}

pub fn write_cost_manifest(path: &Path, manifest: &CostManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing cost manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing cost manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_cost_manifest(path: &Path) -> Result<CostManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening cost manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing cost manifest '{}'", path.display()))
}
