//! In-memory case document.
//!
//! A document is the header blob, the named sections in source order, and the
//! footer blob. Each section is either a typed [`Table`] of numeric rows or an
//! opaque text blob kept byte-for-byte, markers included.

use opfcost_core::{CostError, CostResult};
use serde::Serialize;

use super::schema::TableSchema;

/// One row of a dynamic table. Values are positional against the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<f64>,
}

impl Row {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }
}

/// Typed rows of a dynamic section plus the marker lines that framed them.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: &'static TableSchema,
    pub(crate) open_marker: String,
    pub(crate) close_marker: String,
    rows: Vec<Row>,
}

impl Table {
    /// Empty table framed by canonical `mpc.<name> = [` / `];` markers.
    pub fn new(schema: &'static TableSchema) -> Self {
        Self {
            schema,
            open_marker: format!("mpc.{} = [\n", schema.name),
            close_marker: "];\n".to_string(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn with_markers(
        schema: &'static TableSchema,
        open_marker: String,
        close_marker: String,
        rows: Vec<Row>,
    ) -> Self {
        Self {
            schema,
            open_marker,
            close_marker,
            rows,
        }
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; its width must fit the schema.
    pub fn push_row(&mut self, values: Vec<f64>) -> CostResult<()> {
        if !self.schema.accepts_width(values.len()) {
            return Err(CostError::Parse {
                table: self.schema.name.to_string(),
                row: self.rows.len() + 1,
                message: format!(
                    "expected {} or {} fields, found {}",
                    self.schema.input_arity,
                    self.schema.arity(),
                    values.len()
                ),
            });
        }
        self.rows.push(Row::new(values));
        Ok(())
    }

    fn column_position(&self, column: &str) -> CostResult<usize> {
        self.schema.column_index(column).ok_or_else(|| {
            CostError::lookup(format!(
                "table '{}' has no column '{}'",
                self.schema.name, column
            ))
        })
    }

    fn row_ref(&self, row: usize) -> CostResult<&Row> {
        self.rows.get(row).ok_or_else(|| {
            CostError::lookup(format!(
                "table '{}' has {} rows, row index {} requested",
                self.schema.name,
                self.rows.len(),
                row
            ))
        })
    }

    /// Value of `column` in zero-based `row`.
    pub fn value(&self, row: usize, column: &str) -> CostResult<f64> {
        let col = self.column_position(column)?;
        let r = self.row_ref(row)?;
        r.values.get(col).copied().ok_or_else(|| {
            CostError::lookup(format!(
                "row {} of table '{}' carries no '{}' column (width {})",
                row,
                self.schema.name,
                column,
                r.width()
            ))
        })
    }

    pub fn set_value(&mut self, row: usize, column: &str, value: f64) -> CostResult<()> {
        let col = self.column_position(column)?;
        let name = self.schema.name;
        let r = self.rows.get_mut(row).ok_or_else(|| {
            CostError::lookup(format!("table '{name}' has no row index {row}"))
        })?;
        let width = r.width();
        let slot = r.values.get_mut(col).ok_or_else(|| {
            CostError::lookup(format!(
                "row {row} of table '{name}' carries no '{column}' column (width {width})"
            ))
        })?;
        *slot = value;
        Ok(())
    }

    /// Whole column as a vector, in row order.
    pub fn column(&self, column: &str) -> CostResult<Vec<f64>> {
        (0..self.rows.len())
            .map(|row| self.value(row, column))
            .collect()
    }

    /// Copy `columns` from `source` row-by-row. Both tables must have the same
    /// schema and row count.
    pub fn restore_columns(&mut self, source: &Table, columns: &[&str]) -> CostResult<()> {
        if source.schema != self.schema || source.len() != self.len() {
            return Err(CostError::lookup(format!(
                "cannot restore '{}' ({} rows) from '{}' ({} rows)",
                self.schema.name,
                self.len(),
                source.schema.name,
                source.len()
            )));
        }
        for column in columns {
            for row in 0..self.len() {
                let value = source.value(row, column)?;
                self.set_value(row, column, value)?;
            }
        }
        Ok(())
    }
}

/// Content of one named section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Dynamic(Table),
    Static(String),
    /// Table moved out with [`CaseDocument::take_table`]; the name keeps its
    /// slot in the order but nothing is written for it.
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub body: SectionBody,
}

/// Parsed case file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseDocument {
    pub header: String,
    pub footer: String,
    pub(crate) sections: Vec<Section>,
}

/// Shape of a document, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CaseSummary {
    pub section_order: Vec<String>,
    pub dynamic_tables: Vec<(String, usize)>,
    pub static_sections: Vec<String>,
    pub header_bytes: usize,
    pub footer_bytes: usize,
}

impl CaseDocument {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section names in source order.
    pub fn section_order(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Dynamic table by name. Static or unknown names are a lookup error.
    pub fn table(&self, name: &str) -> CostResult<&Table> {
        match self.section(name).map(|s| &s.body) {
            Some(SectionBody::Dynamic(table)) => Ok(table),
            _ => Err(CostError::lookup(format!(
                "unknown or static table: {name}"
            ))),
        }
    }

    pub fn table_mut(&mut self, name: &str) -> CostResult<&mut Table> {
        match self
            .sections
            .iter_mut()
            .find(|s| s.name == name)
            .map(|s| &mut s.body)
        {
            Some(SectionBody::Dynamic(table)) => Ok(table),
            _ => Err(CostError::lookup(format!(
                "unknown or static table: {name}"
            ))),
        }
    }

    /// Verbatim text of a static section, markers included.
    pub fn static_text(&self, name: &str) -> CostResult<&str> {
        match self.section(name).map(|s| &s.body) {
            Some(SectionBody::Static(text)) => Ok(text.as_str()),
            _ => Err(CostError::lookup(format!(
                "unknown or dynamic section: {name}"
            ))),
        }
    }

    /// Move a dynamic table out of the document, leaving its slot detached.
    pub fn take_table(&mut self, name: &str) -> CostResult<Table> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| CostError::lookup(format!("unknown or static table: {name}")))?;
        match std::mem::replace(&mut section.body, SectionBody::Detached) {
            SectionBody::Dynamic(table) => Ok(table),
            other => {
                section.body = other;
                Err(CostError::lookup(format!("unknown or static table: {name}")))
            }
        }
    }

    /// Put a table back into a detached (or dynamic) slot.
    pub fn restore_table(&mut self, name: &str, table: Table) -> CostResult<()> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| CostError::lookup(format!("no section named {name}")))?;
        match section.body {
            SectionBody::Static(_) => Err(CostError::lookup(format!(
                "section {name} is static and cannot hold a table"
            ))),
            _ => {
                section.body = SectionBody::Dynamic(table);
                Ok(())
            }
        }
    }

    pub fn summary(&self) -> CaseSummary {
        let mut dynamic_tables = Vec::new();
        let mut static_sections = Vec::new();
        for section in &self.sections {
            match &section.body {
                SectionBody::Dynamic(table) => {
                    dynamic_tables.push((section.name.clone(), table.len()))
                }
                SectionBody::Static(_) => static_sections.push(section.name.clone()),
                SectionBody::Detached => {}
            }
        }
        CaseSummary {
            section_order: self.sections.iter().map(|s| s.name.clone()).collect(),
            dynamic_tables,
            static_sections,
            header_bytes: self.header.len(),
            footer_bytes: self.footer.len(),
        }
    }
}
