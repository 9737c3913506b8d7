use clap::{Args, Parser, Subcommand, ValueEnum};
use opfcost_dist::{PerturbableBound, SolverFailurePolicy};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Configuration file (defaults to ~/.opfcost/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the sections, tables and generators of a case file
    Inspect {
        /// MATPOWER case file
        case: PathBuf,
        /// Print the document summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a case file and write it back out
    Roundtrip {
        /// MATPOWER case file
        case: PathBuf,
        /// Destination file
        out: PathBuf,
    },
    /// Show how scenarios would be split over workers
    Plan {
        /// Number of scenarios
        #[arg(long)]
        scenarios: usize,
        /// Number of workers
        #[arg(long)]
        workers: usize,
    },
    /// Price scenarios against the base case
    Cost(CostArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CostArgs {
    /// MATPOWER case file
    pub case: PathBuf,

    /// CSV of per-unit deviations; first column labels the scenario
    #[arg(long)]
    pub deviations: PathBuf,

    /// CSV whose first row is the reference (forecast) point
    #[arg(long)]
    pub reference: PathBuf,

    /// Number of workers in the group
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Number of scenarios to price (defaults to all)
    #[arg(long)]
    pub scenarios: Option<usize>,

    /// Threads per worker for local evaluation (0 = all CPUs)
    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long, value_enum)]
    pub failure_policy: Option<FailurePolicyArg>,

    #[arg(long, value_enum)]
    pub bound: Option<BoundArg>,

    /// Write a JSON cost manifest here
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FailurePolicyArg {
    /// Stop the worker on the first failed scenario
    Abort,
    /// Record NaN for the failed scenario and continue
    RecordNan,
}

impl From<FailurePolicyArg> for SolverFailurePolicy {
    fn from(arg: FailurePolicyArg) -> Self {
        match arg {
            FailurePolicyArg::Abort => SolverFailurePolicy::Abort,
            FailurePolicyArg::RecordNan => SolverFailurePolicy::RecordNan,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BoundArg {
    /// Pin perturbable units at their scenario value
    Fixed,
    /// Allow perturbable units anywhere in [0, value]
    Curtailable,
}

impl From<BoundArg> for PerturbableBound {
    fn from(arg: BoundArg) -> Self {
        match arg {
            BoundArg::Fixed => PerturbableBound::Fixed,
            BoundArg::Curtailable => PerturbableBound::Curtailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cost_flags_parse() {
        let cli = Cli::try_parse_from([
            "opfcost",
            "cost",
            "case.m",
            "--deviations",
            "dev.csv",
            "--reference",
            "ref.csv",
            "--workers",
            "3",
            "--failure-policy",
            "record-nan",
        ])
        .unwrap();
        match cli.command {
            Commands::Cost(args) => {
                assert_eq!(args.workers, 3);
                assert!(matches!(args.failure_policy, Some(FailurePolicyArg::RecordNan)));
                assert!(args.scenarios.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
