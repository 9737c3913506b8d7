//! Case file inspection.

use anyhow::Result;
use opfcost_cli::config::OpfcostConfig;
use opfcost_dist::GeneratorFleet;
use opfcost_io::parse_case_file;
use std::io::{self, Write};
use std::path::Path;
use tabwriter::TabWriter;
use tracing::warn;

pub fn handle(case: &Path, json: bool, config: &OpfcostConfig) -> Result<()> {
    let doc = parse_case_file(case, &config.costing.dynamic_table_names())?;
    let summary = doc.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "SECTION\tKIND\tROWS")?;
    for name in &summary.section_order {
        match summary.dynamic_tables.iter().find(|(n, _)| n == name) {
            Some((_, rows)) => writeln!(writer, "{name}\tdynamic\t{rows}")?,
            None => writeln!(writer, "{name}\tstatic\t-")?,
        }
    }
    writer.flush()?;

    // cases without genfuel or gen still get the section listing
    let fleet = match GeneratorFleet::from_document(&doc, &config.costing.perturbable_fuels) {
        Ok(fleet) => fleet,
        Err(err) => {
            warn!("generator classification unavailable: {err}");
            return Ok(());
        }
    };
    println!();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "ROW\tUNIT\tFUEL\tPMAX\tSCENARIO COLUMN")?;
    for unit in fleet.units() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            unit.row,
            unit.key,
            unit.fuel,
            unit.p_max,
            unit.name.as_deref().unwrap_or("-")
        )?;
    }
    writer.flush()?;
    Ok(())
}
