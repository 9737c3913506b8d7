//! # opfcost-io: case documents and scenario tables
//!
//! The case parser keeps document order and every byte of the sections it does
//! not need to understand, while turning selected tables (by default `bus` and
//! `gen`) into numeric rows that can be read and mutated by column name.
//! Serializing a parsed document reproduces the header, footer and static
//! sections exactly and the dynamic tables value-for-value.

pub mod case;
pub mod scenarios;

pub use case::*;
pub use scenarios::{read_labeled_csv, read_labeled_csv_from, LabeledRow, LabeledTable};
