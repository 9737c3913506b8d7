use anyhow::Result;
use clap::Parser;
use opfcost_cli::cli::{Cli, Commands};
use opfcost_cli::config::load_config;
use std::io;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    match &cli.command {
        Commands::Inspect { case, json } => commands::inspect::handle(case, *json, &config),
        Commands::Roundtrip { case, out } => commands::roundtrip::handle(case, out, &config),
        Commands::Plan { scenarios, workers } => commands::plan::handle(*scenarios, *workers),
        Commands::Cost(args) => commands::cost::handle(args, &config),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
