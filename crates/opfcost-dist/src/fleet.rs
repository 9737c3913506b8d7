//! Generator fleet: unit identities, fuel classification and capacities.

use opfcost_core::{CostError, CostResult, PerturbableUnitName, UnitKey};
use opfcost_io::{generator_fuels, CaseDocument, Table};
use std::collections::HashMap;

/// Exact integer value of a float table field.
fn table_integer(value: f64, what: &str, row: usize) -> CostResult<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > usize::MAX as f64 {
        return Err(CostError::lookup(format!(
            "{what} {value} in gen row {row} is not a non-negative integer"
        )));
    }
    Ok(value as usize)
}

/// Solver keys for every row of a `gen` table: bus plus 1-based ordinal among
/// the rows at that bus.
pub fn unit_keys(gen: &Table) -> CostResult<Vec<UnitKey>> {
    let mut per_bus: HashMap<usize, usize> = HashMap::new();
    let mut keys = Vec::with_capacity(gen.len());
    for row in 0..gen.len() {
        let bus = table_integer(gen.value(row, "bus")?, "bus", row)?;
        let ordinal = per_bus.entry(bus).or_insert(0);
        *ordinal += 1;
        keys.push(UnitKey::new(bus, *ordinal));
    }
    Ok(keys)
}

/// Scenario-table label for a fuel: "wind" -> "Wind".
fn kind_label(fuel: &str) -> String {
    let mut chars = fuel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorUnit {
    /// Zero-based row in the `gen` table.
    pub row: usize,
    pub key: UnitKey,
    pub fuel: String,
    /// Scenario column name, for perturbable units only.
    pub name: Option<String>,
    pub p_max: f64,
}

impl GeneratorUnit {
    pub fn is_perturbable(&self) -> bool {
        self.name.is_some()
    }
}

/// All generator rows of a case, classified.
#[derive(Debug, Clone, Default)]
pub struct GeneratorFleet {
    units: Vec<GeneratorUnit>,
    by_name: HashMap<String, usize>,
}

impl GeneratorFleet {
    /// Classify the generators of `doc` using the static `genfuel` section.
    pub fn from_document(doc: &CaseDocument, perturbable_fuels: &[String]) -> CostResult<Self> {
        let gen = doc.table("gen")?;
        let fuels = generator_fuels(doc)?;
        if fuels.len() != gen.len() {
            return Err(CostError::config(format!(
                "genfuel lists {} entries but the gen table has {} rows",
                fuels.len(),
                gen.len()
            )));
        }
        Self::from_parts(gen, fuels, perturbable_fuels)
    }

    pub fn from_parts(
        gen: &Table,
        fuels: Vec<String>,
        perturbable_fuels: &[String],
    ) -> CostResult<Self> {
        let keys = unit_keys(gen)?;
        let mut sequence: HashMap<(usize, String), usize> = HashMap::new();
        let mut units = Vec::with_capacity(keys.len());
        let mut by_name = HashMap::new();
        for (row, (key, fuel)) in keys.into_iter().zip(fuels).enumerate() {
            let perturbable = perturbable_fuels
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&fuel));
            let name = if perturbable {
                let kind = kind_label(&fuel.to_ascii_lowercase());
                let seq = sequence.entry((key.bus, kind.clone())).or_insert(0);
                *seq += 1;
                let name = PerturbableUnitName::new(key.bus, kind, *seq).to_string();
                by_name.insert(name.clone(), row);
                Some(name)
            } else {
                None
            };
            units.push(GeneratorUnit {
                row,
                key,
                fuel,
                name,
                p_max: gen.value(row, "Pmax")?,
            });
        }
        Ok(Self { units, by_name })
    }

    pub fn units(&self) -> &[GeneratorUnit] {
        &self.units
    }

    pub fn perturbable(&self) -> impl Iterator<Item = &GeneratorUnit> {
        self.units.iter().filter(|u| u.is_perturbable())
    }

    pub fn fixed(&self) -> impl Iterator<Item = &GeneratorUnit> {
        self.units.iter().filter(|u| !u.is_perturbable())
    }

    /// Resolve a scenario column name such as `"37_Wind_2"`.
    pub fn resolve(&self, name: &str) -> CostResult<&GeneratorUnit> {
        let parsed: PerturbableUnitName = name.parse()?;
        self.by_name
            .get(&parsed.to_string())
            .map(|&row| &self.units[row])
            .ok_or_else(|| {
                CostError::lookup(format!(
                    "unable to identify a generator row for unit {name} at bus {}",
                    parsed.bus
                ))
            })
    }

    /// Real-power upper bound of every perturbable unit, by column name.
    pub fn capacities(&self) -> HashMap<String, f64> {
        self.perturbable()
            .filter_map(|u| u.name.clone().map(|n| (n, u.p_max)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opfcost_io::GEN_SCHEMA;

    fn gen_table(rows: &[(f64, f64)]) -> Table {
        let mut table = Table::new(&GEN_SCHEMA);
        for &(bus, pmax) in rows {
            let mut values = vec![0.0; 21];
            values[0] = bus;
            values[7] = 1.0;
            values[8] = pmax;
            table.push_row(values).unwrap();
        }
        table
    }

    fn fuels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ordinals_count_rows_per_bus() {
        let gen = gen_table(&[(1.0, 10.0), (4.0, 20.0), (1.0, 30.0), (4.0, 40.0)]);
        let keys = unit_keys(&gen).unwrap();
        assert_eq!(
            keys,
            vec![
                UnitKey::new(1, 1),
                UnitKey::new(4, 1),
                UnitKey::new(1, 2),
                UnitKey::new(4, 2)
            ]
        );
    }

    #[test]
    fn wind_units_get_per_bus_sequence_names() {
        let gen = gen_table(&[(4.0, 500.0), (4.0, 150.0), (4.0, 100.0), (5.0, 200.0)]);
        let fleet = GeneratorFleet::from_parts(
            &gen,
            fuels(&["coal", "wind", "wind", "Wind"]),
            &["wind".to_string()],
        )
        .unwrap();
        let names: Vec<_> = fleet.perturbable().filter_map(|u| u.name.clone()).collect();
        assert_eq!(names, vec!["4_Wind_1", "4_Wind_2", "5_Wind_1"]);
        // key ordinal counts all rows at the bus, the name counts only wind rows
        assert_eq!(fleet.resolve("4_Wind_2").unwrap().key, UnitKey::new(4, 3));
        assert_eq!(fleet.capacities()["5_Wind_1"], 200.0);
        assert_eq!(fleet.fixed().count(), 1);
    }

    #[test]
    fn unresolvable_units_are_lookup_errors() {
        let gen = gen_table(&[(4.0, 150.0)]);
        let fleet =
            GeneratorFleet::from_parts(&gen, fuels(&["wind"]), &["wind".to_string()]).unwrap();
        assert!(matches!(fleet.resolve("4_Wind_2"), Err(CostError::Lookup(_))));
        assert!(matches!(fleet.resolve("9_Wind_1"), Err(CostError::Lookup(_))));
        assert!(matches!(fleet.resolve("garbage"), Err(CostError::Lookup(_))));
    }

    #[test]
    fn fractional_bus_is_rejected() {
        let gen = gen_table(&[(1.5, 10.0)]);
        assert!(unit_keys(&gen).is_err());
    }
}
