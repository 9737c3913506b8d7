//! Readers for sections that stay opaque in the document but whose content is
//! still needed: the `genfuel` cell array and the `gencost` matrix.

use opfcost_core::{CostError, CostResult};

use super::model::CaseDocument;

/// Body lines of a section's text, open and close markers excluded, blank and
/// comment lines skipped.
fn body_lines(text: &str) -> impl Iterator<Item = &str> {
    let lines: Vec<&str> = text.lines().collect();
    let body = if lines.len() >= 2 {
        &lines[1..lines.len() - 1]
    } else {
        &[][..]
    };
    body.iter()
        .copied()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('%'))
        .collect::<Vec<_>>()
        .into_iter()
}

/// Entries of a string cell array such as
///
/// ```text
/// mpc.genfuel = {
///     'coal';
///     'wind';
/// };
/// ```
pub fn cell_entries(text: &str) -> Vec<String> {
    body_lines(text)
        .map(|line| {
            line.trim_matches(|c: char| c.is_whitespace() || matches!(c, '\'' | '"' | ';' | ')'))
                .to_string()
        })
        .collect()
}

/// Fuel name of every generator row, from the static `genfuel` section.
pub fn generator_fuels(doc: &CaseDocument) -> CostResult<Vec<String>> {
    Ok(cell_entries(doc.static_text("genfuel")?))
}

/// One `gencost` row.
#[derive(Debug, Clone, PartialEq)]
pub struct GenCost {
    /// 1 = piecewise linear, 2 = polynomial.
    pub model: i32,
    pub startup: f64,
    pub shutdown: f64,
    /// Polynomial coefficients, highest order first, or flattened (p, f)
    /// breakpoints for piecewise linear costs.
    pub coefficients: Vec<f64>,
}

impl GenCost {
    /// Cost of producing `p` MW (startup/shutdown excluded).
    pub fn evaluate(&self, p: f64) -> f64 {
        match self.model {
            1 => piecewise_cost(&self.coefficients, p),
            _ => self.coefficients.iter().fold(0.0, |acc, c| acc * p + c),
        }
    }

    /// Derivative of [`GenCost::evaluate`] at `p`.
    pub fn marginal_cost(&self, p: f64) -> f64 {
        match self.model {
            1 => {
                let pts = breakpoints(&self.coefficients);
                pts.windows(2)
                    .find(|w| p <= w[1].0)
                    .or_else(|| pts.windows(2).last())
                    .map(|w| slope(w[0], w[1]))
                    .unwrap_or(0.0)
            }
            _ => {
                let n = self.coefficients.len();
                self.coefficients
                    .iter()
                    .take(n.saturating_sub(1))
                    .enumerate()
                    .fold(0.0, |acc, (i, c)| acc * p + c * (n - 1 - i) as f64)
            }
        }
    }
}

fn breakpoints(flat: &[f64]) -> Vec<(f64, f64)> {
    flat.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

fn slope(a: (f64, f64), b: (f64, f64)) -> f64 {
    if (b.0 - a.0).abs() < f64::EPSILON {
        0.0
    } else {
        (b.1 - a.1) / (b.0 - a.0)
    }
}

fn piecewise_cost(flat: &[f64], p: f64) -> f64 {
    let pts = breakpoints(flat);
    match pts.windows(2).find(|w| p <= w[1].0).or_else(|| pts.windows(2).last()) {
        Some(w) => w[0].1 + slope(w[0], w[1]) * (p - w[0].0),
        None => pts.first().map(|pt| pt.1).unwrap_or(0.0),
    }
}

/// Rows of the static `gencost` section.
pub fn generator_costs(doc: &CaseDocument) -> CostResult<Vec<GenCost>> {
    let text = doc.static_text("gencost")?;
    let mut costs = Vec::new();
    for (idx, line) in body_lines(text).enumerate() {
        let row = idx + 1;
        let parse_err = |message: String| CostError::Parse {
            table: "gencost".to_string(),
            row,
            message,
        };
        let values = line
            .split(|c: char| c.is_whitespace() || c == ';')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| parse_err(format!("'{s}' is not numeric")))
            })
            .collect::<CostResult<Vec<f64>>>()?;
        if values.len() < 4 {
            return Err(parse_err(format!(
                "expected at least 4 fields, found {}",
                values.len()
            )));
        }
        let model = match values[0] {
            m if m == 1.0 => 1,
            m if m == 2.0 => 2,
            m => return Err(parse_err(format!("cost model {m} is neither 1 nor 2"))),
        };
        let available = values.len() - 4;
        let n = values[3];
        if !(n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= available as f64) {
            return Err(parse_err(format!(
                "ncost {n} is not a count of at most {available} coefficients"
            )));
        }
        let ncost = n as usize;
        let width = if model == 1 { ncost.checked_mul(2) } else { Some(ncost) }
            .filter(|&w| w <= available)
            .ok_or_else(|| {
                parse_err(format!(
                    "model {model} with ncost {ncost} needs more than the {available} coefficients given"
                ))
            })?;
        let coefficients = values[4..4 + width].to_vec();
        costs.push(GenCost {
            model,
            startup: values[1],
            shutdown: values[2],
            coefficients,
        });
    }
    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::parser::parse_case;

    const CASE: &str = "\
mpc.gencost = [
\t2\t0\t0\t3\t0.01\t14\t0;
\t1\t0\t0\t2\t0\t0\t100\t2000;
];
mpc.genfuel = {
\t'coal';
\t'wind';
};
";

    #[test]
    fn reads_fuel_cell_array() {
        let doc = parse_case(CASE, &[]).unwrap();
        assert_eq!(generator_fuels(&doc).unwrap(), vec!["coal", "wind"]);
    }

    #[test]
    fn reads_polynomial_and_piecewise_costs() {
        let doc = parse_case(CASE, &[]).unwrap();
        let costs = generator_costs(&doc).unwrap();
        assert_eq!(costs.len(), 2);
        assert_eq!(costs[0].coefficients, vec![0.01, 14.0, 0.0]);
        assert!((costs[0].evaluate(10.0) - 141.0).abs() < 1e-12);
        assert!((costs[0].marginal_cost(10.0) - 14.2).abs() < 1e-12);
        assert!((costs[1].evaluate(50.0) - 1000.0).abs() < 1e-12);
        assert!((costs[1].marginal_cost(50.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn missing_sections_are_lookup_errors() {
        let doc = parse_case("header only\n", &[]).unwrap();
        assert!(matches!(generator_fuels(&doc), Err(CostError::Lookup(_))));
        assert!(matches!(generator_costs(&doc), Err(CostError::Lookup(_))));
    }

    #[test]
    fn short_cost_row_is_parse_error() {
        let doc = parse_case("mpc.gencost = [\n2 0 0 3 1;\n];\n", &[]).unwrap();
        assert!(matches!(
            generator_costs(&doc),
            Err(CostError::Parse { row: 1, .. })
        ));
    }

    #[test]
    fn malformed_cost_counts_are_parse_errors() {
        for row in [
            "1 0 0 1e19 0",
            "2 0 0 1e300 0 0",
            "2 0 0 -1 0",
            "2 0 0 1.5 0 0",
            "2 0 0 NaN 0",
            "1 0 0 2 0 10",
            "3 0 0 1 0",
            "2.5 0 0 1 0",
        ] {
            let doc = parse_case(&format!("mpc.gencost = [\n{row};\n];\n"), &[]).unwrap();
            assert!(
                matches!(generator_costs(&doc), Err(CostError::Parse { row: 1, .. })),
                "{row} should be rejected"
            );
        }
    }
}
