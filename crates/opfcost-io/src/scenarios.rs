//! Scenario table ingestion.
//!
//! Deviation and forecast tables are CSV files whose first column is a row
//! label (usually a timestamp) and whose remaining columns are one per
//! perturbable unit, named `"<bus>_Wind_<seq>"`.

use anyhow::Context;
use opfcost_core::{CostError, CostResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One labelled row of unit values.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub label: String,
    pub values: Vec<f64>,
}

/// Column-named numeric table with row labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledTable {
    pub columns: Vec<String>,
    pub rows: Vec<LabeledRow>,
}

impl LabeledTable {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row as `(column, value)` pairs.
    pub fn first_row(&self) -> CostResult<Vec<(String, f64)>> {
        let row = self
            .rows
            .first()
            .ok_or_else(|| CostError::lookup("table has no rows"))?;
        Ok(self
            .columns
            .iter()
            .cloned()
            .zip(row.values.iter().copied())
            .collect())
    }
}

/// Read a labelled CSV table from disk.
pub fn read_labeled_csv(path: &Path) -> CostResult<LabeledTable> {
    let file =
        File::open(path).with_context(|| format!("opening scenario table '{}'", path.display()))?;
    read_labeled_csv_from(file, &path.display().to_string())
}

/// Read a labelled CSV table from any reader; `source` names it in errors.
pub fn read_labeled_csv_from<R: Read>(reader: R, source: &str) -> CostResult<LabeledTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let parse_err = |row: usize, message: String| CostError::Parse {
        table: source.to_string(),
        row,
        message,
    };

    let headers = rdr
        .headers()
        .map_err(|e| parse_err(0, format!("reading header: {e}")))?
        .clone();
    if headers.len() < 2 {
        return Err(parse_err(
            0,
            "expected a label column followed by at least one unit column".to_string(),
        ));
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = record.map_err(|e| parse_err(row, e.to_string()))?;
        let label = record.get(0).unwrap_or_default().to_string();
        let values = record
            .iter()
            .skip(1)
            .zip(columns.iter())
            .map(|(field, column)| {
                field.parse::<f64>().map_err(|_| {
                    parse_err(row, format!("column '{column}' is not numeric: '{field}'"))
                })
            })
            .collect::<CostResult<Vec<f64>>>()?;
        if values.len() != columns.len() {
            return Err(parse_err(
                row,
                format!("expected {} values, found {}", columns.len(), values.len()),
            ));
        }
        rows.push(LabeledRow { label, values });
    }
    Ok(LabeledTable { columns, rows })
}
