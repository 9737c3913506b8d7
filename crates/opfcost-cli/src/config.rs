//! `~/.opfcost/config.toml`: costing defaults and logging.

use anyhow::{Context, Result};
use opfcost_dist::{CostingConfig, MeritOrderSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpfcostConfig {
    #[serde(default)]
    pub costing: CostingConfig,
    /// Penalty prices of the built-in merit-order solver
    #[serde(default)]
    pub solver: MeritOrderSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Location: ~/.opfcost/config.toml
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("unable to determine home directory")?;
    Ok(home.join(".opfcost").join("config.toml"))
}

/// Load `path`, or the default location when `path` is `None`. A missing
/// default file yields the built-in defaults; a missing explicit file is an
/// error.
pub fn load_config(path: Option<&Path>) -> Result<OpfcostConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                return Ok(OpfcostConfig::default());
            }
            path
        }
    };
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfcost_dist::SolverFailurePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[costing]\nn_scenarios = 24\nfailure_policy = \"record_nan\"\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.costing.n_scenarios, Some(24));
        assert_eq!(config.costing.failure_policy, SolverFailurePolicy::RecordNan);
        assert_eq!(config.costing.consistency_tolerance, 1e-6);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.solver, MeritOrderSettings::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn defaults_serialize_to_toml() {
        let text = toml::to_string_pretty(&OpfcostConfig::default()).unwrap();
        let back: OpfcostConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.costing.dynamic_tables, vec!["bus", "gen"]);
    }
}
