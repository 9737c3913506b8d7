//! MATPOWER-style case documents: model, parser, serializer.

pub mod model;
pub mod parser;
pub mod schema;
pub mod serializer;
pub mod static_sections;

pub use model::{CaseDocument, CaseSummary, Row, Section, SectionBody, Table};
pub use parser::{parse_case, parse_case_file, DEFAULT_DYNAMIC_TABLES};
pub use schema::{schema_for, TableSchema, BRANCH_SCHEMA, BUS_SCHEMA, GEN_SCHEMA};
pub use serializer::{serialize_case, write_case_file};
pub use static_sections::{cell_entries, generator_costs, generator_fuels, GenCost};
