use super::topology::BondOrder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A molecule as read from an input file, before any topology is generated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Molecule {
    pub name: String,
    #[serde(default)]
    pub formula: Option<String>,
    /// Net charge in elementary charges.
    #[serde(default)]
    pub charge: i32,
    #[serde(default = "default_multiplicity")]
    pub multiplicity: u32,
    #[serde(default)]
    pub bonds: Vec<MoleculeBond>,
    #[serde(default, rename = "calculation")]
    pub calculations: Vec<Calculation>,
    #[serde(default)]
    pub reference: Option<ReferenceData>,
}

fn default_multiplicity() -> u32 {
    1
}

/// A bond between two atoms, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoleculeBond {
    pub ai: usize,
    pub aj: usize,
    #[serde(default)]
    pub order: BondOrder,
}

/// Results of one quantum-chemical calculation at a given level of theory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Calculation {
    pub level_of_theory: String,
    pub atoms: Vec<CalculationAtom>,
    #[serde(default)]
    pub potential: Vec<EspPoint>,
    /// CSV file with `x,y,z,v` columns, loaded alongside the molecule file.
    #[serde(default)]
    pub potential_file: Option<PathBuf>,
    #[serde(default = "default_potential_unit")]
    pub potential_unit: String,
    #[serde(default = "default_length_unit")]
    pub potential_length_unit: String,
    /// Dipole moment in Debye.
    #[serde(default)]
    pub dipole: Option<[f64; 3]>,
}

fn default_potential_unit() -> String {
    "hartree/e".to_string()
}

fn default_length_unit() -> String {
    "angstrom".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CalculationAtom {
    pub element: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Atom type assigned by the structure perception step.
    #[serde(rename = "type")]
    pub atom_type: String,
    pub position: [f64; 3],
    #[serde(default = "default_length_unit")]
    pub unit: String,
    /// Partial charges keyed by the model that produced them.
    #[serde(default)]
    pub charges: BTreeMap<String, f64>,
}

impl CalculationAtom {
    pub fn charge(&self, model: &str) -> Option<f64> {
        self.charges
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(model))
            .map(|(_, q)| *q)
    }
}

/// One electrostatic potential sample.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EspPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub v: f64,
}

/// Experimental or high-level reference properties.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReferenceData {
    /// Dipole vector in Debye.
    #[serde(default)]
    pub dipole: Option<[f64; 3]>,
    /// Quadrupole tensor in Buckingham.
    #[serde(default)]
    pub quadrupole: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub polarizability: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
}

impl Molecule {
    /// The calculation at the requested level of theory, or the first one
    /// when none is requested.
    pub fn calculation(&self, level_of_theory: Option<&str>) -> Option<&Calculation> {
        match level_of_theory {
            Some(lot) => self
                .calculations
                .iter()
                .find(|c| c.level_of_theory.eq_ignore_ascii_case(lot)),
            None => self.calculations.first(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER: &str = r#"
        name = "water"
        formula = "H2O"

        [[bonds]]
        ai = 1
        aj = 2

        [[bonds]]
        ai = 1
        aj = 3
        order = 1

        [[calculation]]
        level-of-theory = "B3LYP/aug-cc-pVTZ"
        dipole = [0.0, 0.0, 1.85]

        [[calculation.atoms]]
        element = "O"
        type = "oh"
        position = [0.0, 0.0, 0.1173]
        charges = { esp = -0.8, Mulliken = -0.6 }

        [[calculation.atoms]]
        element = "H"
        type = "ho"
        position = [0.0, 0.7572, -0.4692]
        charges = { esp = 0.4 }

        [[calculation.atoms]]
        element = "H"
        type = "ho"
        position = [0.0, -0.7572, -0.4692]
        charges = { esp = 0.4 }
    "#;

    #[test]
    fn molecule_deserializes_with_defaults() {
        let mol: Molecule = toml::from_str(WATER).unwrap();
        assert_eq!(mol.name, "water");
        assert_eq!(mol.charge, 0);
        assert_eq!(mol.multiplicity, 1);
        assert_eq!(mol.bonds.len(), 2);
        assert_eq!(mol.bonds[0].order, BondOrder::Single);
        let calc = &mol.calculations[0];
        assert_eq!(calc.atoms.len(), 3);
        assert_eq!(calc.atoms[0].unit, "angstrom");
        assert_eq!(calc.potential_unit, "hartree/e");
        assert!(calc.potential.is_empty());
    }

    #[test]
    fn named_charges_are_matched_case_insensitively() {
        let mol: Molecule = toml::from_str(WATER).unwrap();
        let oxygen = &mol.calculations[0].atoms[0];
        assert_eq!(oxygen.charge("ESP"), Some(-0.8));
        assert_eq!(oxygen.charge("mulliken"), Some(-0.6));
        assert_eq!(oxygen.charge("hirshfeld"), None);
    }

    #[test]
    fn calculation_selection_by_level_of_theory() {
        let mol: Molecule = toml::from_str(WATER).unwrap();
        assert!(mol.calculation(None).is_some());
        assert!(mol.calculation(Some("b3lyp/aug-cc-pvtz")).is_some());
        assert!(mol.calculation(Some("MP2/aug-cc-pVTZ")).is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = toml::from_str::<Molecule>("name = \"x\"\ncolour = \"blue\"");
        assert!(result.is_err());
    }
}
