//! Case document serializer.
//!
//! Writes header, sections in their recorded order, then footer. Static
//! sections and both blobs go out verbatim; dynamic tables are re-emitted from
//! their rows, one tab-separated line per row in schema column order.

use anyhow::Context;
use opfcost_core::CostResult;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::warn;

use super::model::{CaseDocument, SectionBody, Table};

/// Render a document back to case text. Never fails.
pub fn serialize_case(doc: &CaseDocument) -> String {
    let mut out = String::with_capacity(doc.header.len() + doc.footer.len() + 4096);
    out.push_str(&doc.header);

    let mut wrote_section = false;
    let mut open_line = false;
    for section in doc.sections() {
        let chunk = match &section.body {
            SectionBody::Dynamic(table) => render_table(table),
            SectionBody::Static(text) => text.clone(),
            SectionBody::Detached => {
                warn!(
                    section = %section.name,
                    "table {} neither dynamic nor static; unable to write it",
                    section.name
                );
                continue;
            }
        };
        if wrote_section {
            if open_line {
                out.push('\n');
            }
            // blank separator; dropped again on re-parse
            out.push('\n');
        }
        out.push_str(&chunk);
        open_line = !chunk.ends_with('\n');
        wrote_section = true;
    }

    if open_line && !doc.footer.is_empty() {
        out.push('\n');
    }
    out.push_str(&doc.footer);
    out
}

fn render_table(table: &Table) -> String {
    let mut text = String::with_capacity(table.len() * table.schema().arity() * 12);
    text.push_str(&table.open_marker);
    if !table.open_marker.ends_with('\n') {
        text.push('\n');
    }
    for row in table.rows() {
        for value in row.values() {
            // writing into a String cannot fail
            let _ = write!(text, "\t{value}");
        }
        text.push_str(";\n");
    }
    text.push_str(&table.close_marker);
    text
}

/// Serialize a document and write it to `path`.
pub fn write_case_file(doc: &CaseDocument, path: &Path) -> CostResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating case directory '{}'", parent.display()))?;
    }
    fs::write(path, serialize_case(doc))
        .with_context(|| format!("writing case file '{}'", path.display()))?;
    Ok(())
}
