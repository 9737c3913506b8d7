//! Case file parser.
//!
//! Scans the text line by line, keeping every line terminator so that header,
//! footer and static sections come back byte-for-byte. Sections open on a line
//! of the form `mpc.<name> = [` (or `{`) and close on a line starting with
//! `];` (or `};`). Text between two sections is dropped; only text after the
//! last section survives, as the footer.

use anyhow::Context;
use opfcost_core::{CostError, CostResult};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::model::{CaseDocument, Row, Section, SectionBody, Table};
use super::schema::{schema_for, TableSchema};

/// Default set of sections parsed into typed rows.
pub const DEFAULT_DYNAMIC_TABLES: &[&str] = &["bus", "gen"];

/// Parse a case file from disk.
pub fn parse_case_file(path: &Path, dynamic: &[&str]) -> CostResult<CaseDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading case file: {}", path.display()))?;
    parse_case(&text, dynamic)
}

/// Section name if `line` opens a section.
fn section_start(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("mpc.")?;
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let (name, after) = rest.split_at(name_len);
    let after = after.strip_prefix(" = ")?;
    let after = after
        .strip_prefix('[')
        .or_else(|| after.strip_prefix('{'))?;
    if after.is_empty() || after.starts_with(char::is_whitespace) {
        Some(name)
    } else {
        None
    }
}

fn section_end(line: &str) -> bool {
    let after = match line.strip_prefix("];").or_else(|| line.strip_prefix("};")) {
        Some(after) => after,
        None => return false,
    };
    after.is_empty() || after.starts_with(char::is_whitespace)
}

struct RawSection {
    name: String,
    text: String,
    start_line: usize,
}

enum Cursor {
    Header,
    InSection(RawSection),
    Footer,
}

/// Parse case text, turning the sections named in `dynamic` into tables.
pub fn parse_case(text: &str, dynamic: &[&str]) -> CostResult<CaseDocument> {
    let mut header = String::new();
    let mut footer = String::new();
    let mut raw_sections: Vec<RawSection> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor = Cursor::Header;

    for (idx, line) in text.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let starts = section_start(line);
        let ends = section_end(line);

        cursor = match cursor {
            Cursor::InSection(mut raw) => {
                if let Some(name) = starts {
                    return Err(CostError::Format {
                        line: line_no,
                        message: format!(
                            "section '{}' starts inside section '{}' (opened at line {})",
                            name, raw.name, raw.start_line
                        ),
                    });
                }
                raw.text.push_str(line);
                if ends {
                    raw_sections.push(raw);
                    Cursor::Footer
                } else {
                    Cursor::InSection(raw)
                }
            }
            outside => {
                if ends {
                    return Err(CostError::Format {
                        line: line_no,
                        message: "section end marker outside of any section".to_string(),
                    });
                }
                match starts {
                    Some(name) => {
                        if !seen.insert(name.to_string()) {
                            return Err(CostError::Format {
                                line: line_no,
                                message: format!("section '{name}' appears more than once"),
                            });
                        }
                        // anything between the previous section and this one is dropped
                        footer.clear();
                        Cursor::InSection(RawSection {
                            name: name.to_string(),
                            text: line.to_string(),
                            start_line: line_no,
                        })
                    }
                    None => {
                        match outside {
                            Cursor::Header => header.push_str(line),
                            _ => footer.push_str(line),
                        }
                        outside
                    }
                }
            }
        };
    }

    if let Cursor::InSection(raw) = cursor {
        return Err(CostError::Format {
            line: raw.start_line,
            message: format!("section '{}' is never closed", raw.name),
        });
    }

    let mut sections = Vec::with_capacity(raw_sections.len());
    for raw in raw_sections {
        let body = if dynamic.contains(&raw.name.as_str()) {
            let schema = schema_for(&raw.name).ok_or_else(|| {
                CostError::lookup(format!("no row schema for dynamic table '{}'", raw.name))
            })?;
            SectionBody::Dynamic(parse_table(schema, &raw.text)?)
        } else {
            SectionBody::Static(raw.text)
        };
        sections.push(Section {
            name: raw.name,
            body,
        });
    }

    Ok(CaseDocument {
        header,
        footer,
        sections,
    })
}

/// Turn a section's text (markers included) into typed rows.
fn parse_table(schema: &'static TableSchema, text: &str) -> CostResult<Table> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    // a section always has at least its open and close marker lines
    let (open, rest) = lines.split_first().ok_or_else(|| CostError::Format {
        line: 0,
        message: format!("empty section text for '{}'", schema.name),
    })?;
    let (close, body) = rest.split_last().ok_or_else(|| CostError::Format {
        line: 0,
        message: format!("section '{}' has no close marker", schema.name),
    })?;

    let mut rows = Vec::with_capacity(body.len());
    for line in body {
        let trimmed = line.trim_matches(|c: char| matches!(c, ' ' | '\n' | '\r' | '\t' | ';'));
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let row_no = rows.len() + 1;
        let tokens: Vec<&str> = trimmed.split('\t').map(str::trim).collect();
        if !schema.accepts_width(tokens.len()) {
            return Err(CostError::Parse {
                table: schema.name.to_string(),
                row: row_no,
                message: format!(
                    "expected {} or {} tab-separated fields, found {}",
                    schema.input_arity,
                    schema.arity(),
                    tokens.len()
                ),
            });
        }
        let mut values = Vec::with_capacity(tokens.len());
        for (col, token) in schema.columns.iter().zip(tokens.iter()) {
            let value = token.parse::<f64>().map_err(|_| CostError::Parse {
                table: schema.name.to_string(),
                row: row_no,
                message: format!("column '{col}' is not numeric: '{token}'"),
            })?;
            values.push(value);
        }
        rows.push(Row::new(values));
    }

    Ok(Table::with_markers(
        schema,
        open.to_string(),
        close.to_string(),
        rows,
    ))
}
