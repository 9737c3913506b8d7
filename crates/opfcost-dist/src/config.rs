use serde::{Deserialize, Serialize};

/// What to do when one scenario's solve fails during local evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverFailurePolicy {
    /// Abort this worker's whole local loop with the error.
    #[default]
    Abort,
    /// Log the failure, record NaN for the scenario and carry on.
    RecordNan,
}

/// How a perturbable unit is bounded to its scenario value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PerturbableBound {
    /// `p_min = p_max = value`.
    #[default]
    Fixed,
    /// `0 <= p <= value`; the solver may spill.
    Curtailable,
}

/// Settings for one costing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostingConfig {
    /// Scenarios to price; `None` prices every available scenario.
    #[serde(default)]
    pub n_scenarios: Option<usize>,
    /// Largest allowed base-cost difference between workers.
    #[serde(default = "default_tolerance")]
    pub consistency_tolerance: f64,
    #[serde(default)]
    pub failure_policy: SolverFailurePolicy,
    #[serde(default)]
    pub perturbable_bound: PerturbableBound,
    /// Threads for local evaluation; 0 uses every CPU.
    #[serde(default)]
    pub local_threads: usize,
    /// Case sections parsed into typed rows.
    #[serde(default = "default_dynamic_tables")]
    pub dynamic_tables: Vec<String>,
    /// Fuel names (from `genfuel`) whose units follow the scenarios.
    #[serde(default = "default_perturbable_fuels")]
    pub perturbable_fuels: Vec<String>,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_dynamic_tables() -> Vec<String> {
    vec!["bus".to_string(), "gen".to_string()]
}

fn default_perturbable_fuels() -> Vec<String> {
    vec!["wind".to_string()]
}

impl Default for CostingConfig {
    fn default() -> Self {
        Self {
            n_scenarios: None,
            consistency_tolerance: default_tolerance(),
            failure_policy: SolverFailurePolicy::default(),
            perturbable_bound: PerturbableBound::default(),
            local_threads: 0,
            dynamic_tables: default_dynamic_tables(),
            perturbable_fuels: default_perturbable_fuels(),
        }
    }
}

impl CostingConfig {
    pub fn dynamic_table_names(&self) -> Vec<&str> {
        self.dynamic_tables.iter().map(String::as_str).collect()
    }

    pub fn thread_count(&self) -> usize {
        if self.local_threads == 0 {
            num_cpus::get()
        } else {
            self.local_threads
        }
    }
}
