//! Scenario construction.
//!
//! A scenario is the reference (forecast) operating point plus one row of
//! per-unit deviations, clamped unit by unit to `[0, capacity]`.

use opfcost_core::{CostError, CostResult};
use opfcost_io::LabeledTable;
use std::collections::HashMap;
use tracing::warn;

/// Clamp one unit's scenario value to its physical range.
pub fn clamp_to_capacity(value: f64, capacity: f64) -> f64 {
    value.min(capacity).max(0.0)
}

/// One priced operating condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub index: usize,
    pub label: String,
    /// Clamped real power per unit, aligned with [`ScenarioSet::units`].
    pub values: Vec<f64>,
}

/// Candidate scenarios with everything needed to build them.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    units: Vec<String>,
    labels: Vec<String>,
    deviations: Vec<Vec<f64>>,
    reference: Vec<f64>,
    capacity: Vec<f64>,
}

impl ScenarioSet {
    /// Align deviations, reference point and capacities by unit name.
    pub fn new(
        deviations: &LabeledTable,
        reference: &HashMap<String, f64>,
        capacity: &HashMap<String, f64>,
    ) -> CostResult<Self> {
        let mut ref_values = Vec::with_capacity(deviations.columns.len());
        let mut cap_values = Vec::with_capacity(deviations.columns.len());
        for unit in &deviations.columns {
            let r = reference.get(unit).ok_or_else(|| {
                CostError::lookup(format!("unit {unit} has no reference (forecast) value"))
            })?;
            let c = capacity.get(unit).ok_or_else(|| {
                CostError::lookup(format!("unit {unit} has no capacity in the case"))
            })?;
            if clamp_to_capacity(*r, *c) != *r {
                warn!(
                    unit = %unit,
                    reference = *r,
                    capacity = *c,
                    "reference value outside [0, capacity]; base case uses the clamped value"
                );
            }
            ref_values.push(*r);
            cap_values.push(*c);
        }
        Ok(Self {
            units: deviations.columns.clone(),
            labels: deviations.rows.iter().map(|r| r.label.clone()).collect(),
            deviations: deviations.rows.iter().map(|r| r.values.clone()).collect(),
            reference: ref_values,
            capacity: cap_values,
        })
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.deviations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deviations.is_empty()
    }

    /// Reference point as `(unit, value)` pairs, clamped per unit like every
    /// scenario so that a zero deviation reproduces the base case.
    pub fn reference(&self) -> impl Iterator<Item = (&str, f64)> {
        self.units
            .iter()
            .map(String::as_str)
            .zip(self.reference.iter().zip(&self.capacity))
            .map(|(unit, (r, c))| (unit, clamp_to_capacity(*r, *c)))
    }

    /// Build scenario `index`: reference + deviation, clamped per unit.
    pub fn scenario(&self, index: usize) -> CostResult<Scenario> {
        let deviation = self.deviations.get(index).ok_or_else(|| {
            CostError::lookup(format!(
                "scenario {index} requested from a set of {}",
                self.len()
            ))
        })?;
        let values = deviation
            .iter()
            .zip(&self.reference)
            .zip(&self.capacity)
            .map(|((d, r), c)| clamp_to_capacity(d + r, *c))
            .collect();
        Ok(Scenario {
            index,
            label: self.labels[index].clone(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfcost_io::LabeledRow;

    fn set() -> ScenarioSet {
        let deviations = LabeledTable {
            columns: vec!["4_Wind_1".into(), "5_Wind_1".into()],
            rows: vec![
                LabeledRow {
                    label: "t0".into(),
                    values: vec![0.0, 0.0],
                },
                LabeledRow {
                    label: "t1".into(),
                    values: vec![500.0, -500.0],
                },
                LabeledRow {
                    label: "t2".into(),
                    values: vec![-10.0, 15.5],
                },
            ],
        };
        let reference = HashMap::from([("4_Wind_1".to_string(), 100.0), ("5_Wind_1".to_string(), 120.0)]);
        let capacity = HashMap::from([("4_Wind_1".to_string(), 150.0), ("5_Wind_1".to_string(), 200.0)]);
        ScenarioSet::new(&deviations, &reference, &capacity).unwrap()
    }

    #[test]
    fn scenario_is_reference_plus_deviation() {
        let s = set().scenario(2).unwrap();
        assert_eq!(s.label, "t2");
        assert_eq!(s.values, vec![90.0, 135.5]);
    }

    #[test]
    fn values_are_clamped_to_capacity_and_zero() {
        let s = set().scenario(1).unwrap();
        assert_eq!(s.values, vec![150.0, 0.0]);
    }

    #[test]
    fn every_scenario_stays_in_range() {
        let set = set();
        for index in 0..set.len() {
            let scenario = set.scenario(index).unwrap();
            for (v, cap) in scenario.values.iter().zip([150.0, 200.0]) {
                assert!(*v >= 0.0 && *v <= cap);
            }
        }
    }

    #[test]
    fn clamp_handles_grid_of_deviations() {
        for dev in [-1e9, -200.0, -100.0, -0.5, 0.0, 0.5, 49.9, 50.0, 1e9] {
            let v = clamp_to_capacity(100.0 + dev, 150.0);
            assert!((0.0..=150.0).contains(&v), "{dev} -> {v}");
        }
    }

    #[test]
    fn reference_above_capacity_matches_zero_deviation_scenario() {
        let deviations = LabeledTable {
            columns: vec!["4_Wind_1".into()],
            rows: vec![LabeledRow {
                label: "t0".into(),
                values: vec![0.0],
            }],
        };
        let reference = HashMap::from([("4_Wind_1".to_string(), 400.0)]);
        let capacity = HashMap::from([("4_Wind_1".to_string(), 150.0)]);
        let set = ScenarioSet::new(&deviations, &reference, &capacity).unwrap();
        let base: Vec<(&str, f64)> = set.reference().collect();
        assert_eq!(base, vec![("4_Wind_1", 150.0)]);
        assert_eq!(set.scenario(0).unwrap().values, vec![150.0]);
    }

    #[test]
    fn missing_reference_is_lookup_error() {
        let deviations = LabeledTable {
            columns: vec!["9_Wind_1".into()],
            rows: vec![],
        };
        let err = ScenarioSet::new(&deviations, &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, CostError::Lookup(_)));
    }

    #[test]
    fn out_of_range_index_is_lookup_error() {
        assert!(set().scenario(3).is_err());
    }
}
