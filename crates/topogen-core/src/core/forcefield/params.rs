use super::combination::CombinationRule;
use super::functional::{FunctionalType, InteractionClass};
use crate::core::utils::units::{LengthUnit, UnknownUnitError};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::num::ParseFloatError;
use std::path::Path;
use thiserror::Error;

pub const WILDCARD: &str = "X";
pub const DEFAULT_NREXCL: usize = 3;
pub const DEFAULT_LINEAR_ANGLE_KLIN: f64 = 10000.0;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GlobalParams {
    pub bond_function: Option<String>,
    pub angle_function: Option<String>,
    pub dihedral_function: Option<String>,
    pub improper_function: Option<String>,
    pub vdw_function: Option<String>,
    pub combination_rule: Option<String>,
    #[serde(default = "default_nrexcl")]
    pub nrexcl: usize,
    #[serde(default = "unity")]
    pub fudge_qq: f64,
    #[serde(default = "unity")]
    pub fudge_lj: f64,
    #[serde(default = "default_length_unit")]
    pub length_unit: String,
    #[serde(default = "default_klin")]
    pub linear_angle_force_constant: f64,
    #[serde(default)]
    pub charge_model: Option<String>,
}

fn default_nrexcl() -> usize {
    DEFAULT_NREXCL
}
fn unity() -> f64 {
    1.0
}
fn default_length_unit() -> String {
    "pm".to_string()
}
fn default_klin() -> f64 {
    DEFAULT_LINEAR_ANGLE_KLIN
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AtomTypeParam {
    pub element: String,
    pub bond_type: String,
    /// Per-type van der Waals parameters, interpreted by the combination rule.
    #[serde(default)]
    pub vdw: Vec<f64>,
    #[serde(default)]
    pub polarizability: Option<f64>,
    #[serde(default)]
    pub polarizability_sigma: Option<f64>,
    /// Charge-spreading exponents, one per charge component.
    #[serde(default)]
    pub zeta: Vec<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BondedParam {
    pub atoms: Vec<String>,
    /// Reference value: bond length in the store's length unit, or angle in degrees.
    pub value: f64,
    #[serde(default)]
    pub sigma: f64,
    /// Whitespace-separated remaining coefficients.
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub bond_order: Option<f64>,
}

impl BondedParam {
    pub fn parse_params(&self) -> Result<Vec<f64>, ParseFloatError> {
        self.params.split_whitespace().map(str::parse).collect()
    }

    fn wildcards(&self) -> usize {
        self.atoms.iter().filter(|a| a.as_str() == WILDCARD).count()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ForceFieldFile {
    globals: GlobalParams,
    #[serde(default)]
    atomtypes: BTreeMap<String, AtomTypeParam>,
    #[serde(default)]
    type_aliases: HashMap<String, String>,
    #[serde(default)]
    bonds: Vec<BondedParam>,
    #[serde(default)]
    angles: Vec<BondedParam>,
    #[serde(default)]
    dihedrals: Vec<BondedParam>,
    #[serde(default)]
    impropers: Vec<BondedParam>,
}

#[derive(Debug, Error)]
pub enum ForceFieldError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Force field does not declare a {0} function")]
    MissingFunction(&'static str),
    #[error("Invalid {kind} function '{name}'")]
    InvalidFunction { kind: &'static str, name: String },
    #[error("Force field does not declare a combination rule")]
    MissingCombinationRule,
    #[error("Unsupported combination rule '{0}'")]
    UnsupportedCombinationRule(String),
    #[error("Combination rules are not defined for functional type {0}")]
    UnsupportedFunctionalType(FunctionalType),
    #[error("Invalid length unit in force field: {0}")]
    Unit(#[from] UnknownUnitError),
    #[error("Entry {index} of [{section}] lists {found} atom types, expected {expected}")]
    Arity {
        section: &'static str,
        index: usize,
        found: usize,
        expected: usize,
    },
    #[error("Atom type '{atom_type}' refers to unknown element '{element}'")]
    UnknownElement { atom_type: String, element: String },
}

/// The functional forms and combination rule a force field declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDeclarations {
    pub bond: FunctionalType,
    pub angle: FunctionalType,
    pub proper_dihedral: FunctionalType,
    pub improper_dihedral: FunctionalType,
    pub vdw: FunctionalType,
    pub combination_rule: CombinationRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DihedralKind {
    Proper,
    Improper,
}

/// Read-only force-field parameter database.
///
/// Lookups are by bond type, the coarser classification every atom type maps
/// to. Once loaded the store is never mutated, so one instance can be shared
/// by any number of concurrent generation runs.
#[derive(Debug, Clone)]
pub struct ForceField {
    globals: GlobalParams,
    atomtypes: BTreeMap<String, AtomTypeParam>,
    type_aliases: HashMap<String, String>,
    bonds: Vec<BondedParam>,
    angles: Vec<BondedParam>,
    dihedrals: Vec<BondedParam>,
    impropers: Vec<BondedParam>,
    bond_index: HashMap<(String, String), usize>,
    angle_index: HashMap<(String, String, String), usize>,
}

impl ForceField {
    pub fn load(path: &Path) -> Result<Self, ForceFieldError> {
        let content = std::fs::read_to_string(path).map_err(|e| ForceFieldError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: ForceFieldFile = toml::from_str(&content).map_err(|e| ForceFieldError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_file(file)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ForceFieldError> {
        let file: ForceFieldFile = toml::from_str(content).map_err(|e| ForceFieldError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: ForceFieldFile) -> Result<Self, ForceFieldError> {
        check_arity("bonds", &file.bonds, 2)?;
        check_arity("angles", &file.angles, 3)?;
        check_arity("dihedrals", &file.dihedrals, 4)?;
        check_arity("impropers", &file.impropers, 4)?;
        file.globals.length_unit.parse::<LengthUnit>()?;
        for (name, atomtype) in &file.atomtypes {
            if crate::core::utils::elements::element(&atomtype.element).is_none() {
                return Err(ForceFieldError::UnknownElement {
                    atom_type: name.clone(),
                    element: atomtype.element.clone(),
                });
            }
        }

        let mut bond_index = HashMap::new();
        for (i, entry) in file.bonds.iter().enumerate() {
            let (a, b) = (&entry.atoms[0], &entry.atoms[1]);
            bond_index.entry((a.clone(), b.clone())).or_insert(i);
            bond_index.entry((b.clone(), a.clone())).or_insert(i);
        }
        let mut angle_index = HashMap::new();
        for (i, entry) in file.angles.iter().enumerate() {
            let (a, b, c) = (&entry.atoms[0], &entry.atoms[1], &entry.atoms[2]);
            angle_index
                .entry((a.clone(), b.clone(), c.clone()))
                .or_insert(i);
            angle_index
                .entry((c.clone(), b.clone(), a.clone()))
                .or_insert(i);
        }

        Ok(Self {
            globals: file.globals,
            atomtypes: file.atomtypes,
            type_aliases: file.type_aliases,
            bonds: file.bonds,
            angles: file.angles,
            dihedrals: file.dihedrals,
            impropers: file.impropers,
            bond_index,
            angle_index,
        })
    }

    pub fn globals(&self) -> &GlobalParams {
        &self.globals
    }

    /// Resolves every functional-form declaration and the combination rule.
    ///
    /// # Errors
    ///
    /// Returns an error if a declaration is missing, names an unknown
    /// functional type, or names a type of the wrong family.
    pub fn declarations(&self) -> Result<FunctionDeclarations, ForceFieldError> {
        let g = &self.globals;
        let combination_rule = g
            .combination_rule
            .as_deref()
            .ok_or(ForceFieldError::MissingCombinationRule)?
            .parse::<CombinationRule>()
            .map_err(|e| ForceFieldError::UnsupportedCombinationRule(e.0))?;
        Ok(FunctionDeclarations {
            bond: declared("bond", g.bond_function.as_deref(), &[InteractionClass::Bond])?,
            angle: declared("angle", g.angle_function.as_deref(), &[InteractionClass::Angle])?,
            proper_dihedral: declared(
                "dihedral",
                g.dihedral_function.as_deref(),
                &[InteractionClass::ProperDihedral],
            )?,
            improper_dihedral: declared(
                "improper",
                g.improper_function.as_deref(),
                &[InteractionClass::ImproperDihedral],
            )?,
            vdw: declared("vdw", g.vdw_function.as_deref(), &[InteractionClass::Nonbonded])?,
            combination_rule,
        })
    }

    pub fn length_unit(&self) -> LengthUnit {
        self.globals.length_unit.parse().unwrap_or_default()
    }

    pub fn nrexcl(&self) -> usize {
        self.globals.nrexcl
    }

    pub fn fudge_qq(&self) -> f64 {
        self.globals.fudge_qq
    }

    pub fn fudge_lj(&self) -> f64 {
        self.globals.fudge_lj
    }

    pub fn linear_angle_force_constant(&self) -> f64 {
        self.globals.linear_angle_force_constant
    }

    pub fn charge_model(&self) -> Option<&str> {
        self.globals.charge_model.as_deref()
    }

    /// Maps an externally assigned atom type onto this force field's types.
    pub fn translate_type<'a>(&'a self, external: &'a str) -> &'a str {
        self.type_aliases
            .get(external)
            .map(String::as_str)
            .unwrap_or(external)
    }

    pub fn atom_type(&self, name: &str) -> Option<&AtomTypeParam> {
        self.atomtypes.get(name)
    }

    pub fn atom_types(&self) -> impl Iterator<Item = (&str, &AtomTypeParam)> {
        self.atomtypes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn bond_type(&self, atom_type: &str) -> Option<&str> {
        self.atomtypes.get(atom_type).map(|t| t.bond_type.as_str())
    }

    /// Polarizability and its uncertainty for an atom type.
    pub fn polarizability(&self, atom_type: &str) -> Option<(f64, f64)> {
        let entry = self.atomtypes.get(atom_type)?;
        entry
            .polarizability
            .map(|alpha| (alpha, entry.polarizability_sigma.unwrap_or(0.0)))
    }

    pub fn vdw_params(&self, atom_type: &str) -> Option<[f64; 2]> {
        match self.atomtypes.get(atom_type)?.vdw.as_slice() {
            [c0, c1, ..] => Some([*c0, *c1]),
            _ => None,
        }
    }

    pub fn zeta(&self, atom_type: &str) -> &[f64] {
        self.atomtypes
            .get(atom_type)
            .map(|t| t.zeta.as_slice())
            .unwrap_or(&[])
    }

    pub fn search_bond(&self, bt1: &str, bt2: &str) -> Option<&BondedParam> {
        self.bond_index
            .get(&(bt1.to_string(), bt2.to_string()))
            .map(|&i| &self.bonds[i])
    }

    /// Angle lookup with the centre fixed and the outer types in either order.
    pub fn search_angle(&self, bt1: &str, bt2: &str, bt3: &str) -> Option<&BondedParam> {
        self.angle_index
            .get(&(bt1.to_string(), bt2.to_string(), bt3.to_string()))
            .map(|&i| &self.angles[i])
    }

    /// Dihedral lookup in either direction. An exact entry wins; otherwise the
    /// matching entry with the fewest wildcards, earliest first.
    pub fn search_dihedral(&self, kind: DihedralKind, types: [&str; 4]) -> Option<&BondedParam> {
        let table = match kind {
            DihedralKind::Proper => &self.dihedrals,
            DihedralKind::Improper => &self.impropers,
        };
        let reversed = [types[3], types[2], types[1], types[0]];
        let matches = |entry: &BondedParam, wanted: &[&str; 4]| {
            entry
                .atoms
                .iter()
                .zip(wanted)
                .all(|(have, want)| have == WILDCARD || have == want)
        };
        table
            .iter()
            .filter(|entry| matches(entry, &types) || matches(entry, &reversed))
            .min_by_key(|entry| entry.wildcards())
    }

    pub fn counts(&self) -> ForceFieldCounts {
        ForceFieldCounts {
            atom_types: self.atomtypes.len(),
            bonds: self.bonds.len(),
            angles: self.angles.len(),
            dihedrals: self.dihedrals.len(),
            impropers: self.impropers.len(),
            polarizable_types: self
                .atomtypes
                .values()
                .filter(|t| t.polarizability.is_some())
                .count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceFieldCounts {
    pub atom_types: usize,
    pub bonds: usize,
    pub angles: usize,
    pub dihedrals: usize,
    pub impropers: usize,
    pub polarizable_types: usize,
}

fn check_arity(
    section: &'static str,
    entries: &[BondedParam],
    expected: usize,
) -> Result<(), ForceFieldError> {
    match entries.iter().position(|e| e.atoms.len() != expected) {
        Some(index) => Err(ForceFieldError::Arity {
            section,
            index,
            found: entries[index].atoms.len(),
            expected,
        }),
        None => Ok(()),
    }
}

fn declared(
    kind: &'static str,
    name: Option<&str>,
    allowed: &[InteractionClass],
) -> Result<FunctionalType, ForceFieldError> {
    let name = name.ok_or(ForceFieldError::MissingFunction(kind))?;
    let ftype = name
        .parse::<FunctionalType>()
        .map_err(|_| ForceFieldError::InvalidFunction {
            kind,
            name: name.to_string(),
        })?;
    if !allowed.contains(&ftype.class()) {
        return Err(ForceFieldError::InvalidFunction {
            kind,
            name: name.to_string(),
        });
    }
    Ok(ftype)
}
