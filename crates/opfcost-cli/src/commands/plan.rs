use anyhow::Result;
use opfcost_dist::PartitionPlan;
use std::io::{self, Write};
use tabwriter::TabWriter;

pub fn handle(scenarios: usize, workers: usize) -> Result<()> {
    let plan = PartitionPlan::new(scenarios, workers)?;
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "RANK\tCOUNT\tOFFSET")?;
    for rank in 0..plan.workers() {
        writeln!(
            writer,
            "{rank}\t{}\t{}",
            plan.count_for(rank)?,
            plan.offset_for(rank)?
        )?;
    }
    writer.flush()?;
    Ok(())
}
