use anyhow::{bail, Result};
use opfcost_cli::config::OpfcostConfig;
use opfcost_io::{parse_case_file, write_case_file};
use std::path::Path;
use tracing::info;

pub fn handle(case: &Path, out: &Path, config: &OpfcostConfig) -> Result<()> {
    let dynamic = config.costing.dynamic_table_names();
    let doc = parse_case_file(case, &dynamic)?;
    write_case_file(&doc, out)?;

    let written = parse_case_file(out, &dynamic)?;
    if written.section_order() != doc.section_order() {
        bail!(
            "section order changed on re-read: {:?} -> {:?}",
            doc.section_order(),
            written.section_order()
        );
    }
    info!(
        sections = doc.sections().len(),
        out = %out.display(),
        "case written"
    );
    Ok(())
}
