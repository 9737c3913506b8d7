//! Fixed column layouts for the case tables that can be parsed into rows.
//!
//! Column order is significant: it is the order fields appear in a row and the
//! order they are written back out.

/// Column layout of one dynamic table type.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    /// Full column list, including solver result columns.
    pub columns: &'static [&'static str],
    /// Width of a row that carries only the MATPOWER input columns.
    pub input_arity: usize,
}

impl TableSchema {
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Whether a row with `width` fields fits this schema.
    pub fn accepts_width(&self, width: usize) -> bool {
        width == self.arity() || width == self.input_arity
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

pub static BUS_SCHEMA: TableSchema = TableSchema {
    name: "bus",
    columns: &[
        "bus_i", "type", "Pd", "Qd", "Gs", "Bs", "area", "Vm", "Va", "baseKV", "zone", "Vmax",
        "Vmin", "lam_P", "lam_Q", "mu_Vmax", "mu_Vmin",
    ],
    input_arity: 13,
};

pub static GEN_SCHEMA: TableSchema = TableSchema {
    name: "gen",
    columns: &[
        "bus", "Pg", "Qg", "Qmax", "Qmin", "Vg", "mBase", "status", "Pmax", "Pmin", "Pc1", "Pc2",
        "Qc1min", "Qc1max", "Qc2min", "Qc2max", "ramp_agc", "ramp_10", "ramp_30", "ramp_q", "apf",
        "mu_Pmax", "mu_Pmin", "mu_Qmax", "mu_Qmin",
    ],
    input_arity: 21,
};

pub static BRANCH_SCHEMA: TableSchema = TableSchema {
    name: "branch",
    columns: &[
        "fbus", "tbus", "r", "x", "b", "rateA", "rateB", "rateC", "ratio", "angle", "status",
        "angmin", "angmax", "Pf", "Qf", "Pt", "Qt", "mu_Sf", "mu_St", "mu_angmin", "mu_angmax",
    ],
    input_arity: 13,
};

/// Schema registry keyed by table name.
pub fn schema_for(name: &str) -> Option<&'static TableSchema> {
    match name {
        "bus" => Some(&BUS_SCHEMA),
        "gen" => Some(&GEN_SCHEMA),
        "branch" => Some(&BRANCH_SCHEMA),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_arities() {
        assert_eq!(BUS_SCHEMA.arity(), 17);
        assert_eq!(GEN_SCHEMA.arity(), 25);
        assert_eq!(BRANCH_SCHEMA.arity(), 21);
        assert!(GEN_SCHEMA.accepts_width(21));
        assert!(GEN_SCHEMA.accepts_width(25));
        assert!(!GEN_SCHEMA.accepts_width(24));
    }

    #[test]
    fn column_lookup_follows_declared_order() {
        assert_eq!(GEN_SCHEMA.column_index("bus"), Some(0));
        assert_eq!(GEN_SCHEMA.column_index("Pmax"), Some(8));
        assert_eq!(BUS_SCHEMA.column_index("Pd"), Some(2));
        assert_eq!(BUS_SCHEMA.column_index("nope"), None);
    }

    #[test]
    fn unknown_tables_have_no_schema() {
        assert!(schema_for("gencost").is_none());
        assert_eq!(schema_for("gen").map(|s| s.name), Some("gen"));
    }
}
