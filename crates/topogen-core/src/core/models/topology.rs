use super::atom::{Atom, AtomType, ParticleKind};
use super::exclusions::Exclusions;
use super::interaction::InteractionLists;
use super::symbols::SymbolTable;
use crate::core::forcefield::functional::FunctionalType;
use crate::core::topology::motifs::GeometricMotifs;
use nalgebra::Point3;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "RawBondOrder")]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Single => 1.0,
            Self::Double => 2.0,
            Self::Triple => 3.0,
            Self::Aromatic => 1.5,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "1.5" | "ar" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBondOrder {
    Number(f64),
    Text(String),
}

impl TryFrom<RawBondOrder> for BondOrder {
    type Error = ParseBondOrderError;

    fn try_from(raw: RawBondOrder) -> Result<Self, Self::Error> {
        match raw {
            RawBondOrder::Number(n) if n == 1.0 => Ok(Self::Single),
            RawBondOrder::Number(n) if n == 2.0 => Ok(Self::Double),
            RawBondOrder::Number(n) if n == 3.0 => Ok(Self::Triple),
            RawBondOrder::Number(n) if n == 1.5 => Ok(Self::Aromatic),
            RawBondOrder::Number(_) => Err(ParseBondOrderError),
            RawBondOrder::Text(s) => s.parse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1: usize,     // 0-based index of the first atom
    pub atom2: usize,     // 0-based index of the second atom
    pub order: BondOrder, // Bond order (e.g., single, double, etc.)
}

impl Bond {
    pub fn new(atom1: usize, atom2: usize, order: BondOrder) -> Self {
        Self {
            atom1,
            atom2,
            order,
        }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atom1 == atom || self.atom2 == atom
    }

    /// The bonded partner of `atom`, if `atom` is part of this bond.
    pub fn partner(&self, atom: usize) -> Option<usize> {
        if self.atom1 == atom {
            Some(self.atom2)
        } else if self.atom2 == atom {
            Some(self.atom1)
        } else {
            None
        }
    }
}

/// One row of a bonded listing: atoms, directive function number and coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct BondedRow<'a> {
    pub atoms: &'a [usize],
    pub directive_index: u8,
    pub params: &'a [f64],
}

/// The working topology of one molecule.
///
/// This aggregate owns everything the generation pipeline reads and mutates:
/// the atom arena, the per-molecule atom-type registry, interned names, the
/// canonical bond list, every interaction list and the exclusion relation.
/// Atoms are addressed by their index in `atoms`; insertion of shells rebuilds
/// the arena and rewrites all indices through an explicit permutation.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub name: String,
    pub symbols: SymbolTable,
    pub atoms: Vec<Atom>,
    pub atom_types: Vec<AtomType>,
    pub bonds: Vec<Bond>,
    pub interactions: InteractionLists,
    pub exclusions: Exclusions,
    pub nrexcl: usize,
    pub ring_atoms: Vec<bool>,
    pub motifs: GeometricMotifs,
    /// Charge-group number per atom; empty until charge groups are generated.
    pub charge_groups: Vec<usize>,
    pub net_charge: i32,
    pub multiplicity: u32,
}

impl Topology {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            multiplicity: 1,
            ..Default::default()
        }
    }

    /// Registers an atom type, returning the index of an existing entry with
    /// the same name if there is one.
    pub fn add_atom_type(&mut self, name: &str, kind: ParticleKind, atomic_number: u8) -> usize {
        let id = self.symbols.intern(name);
        if let Some(index) = self.atom_types.iter().position(|t| t.name == id) {
            return index;
        }
        self.atom_types.push(AtomType {
            name: id,
            kind,
            atomic_number,
        });
        self.atom_types.len() - 1
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.exclusions.resize(self.atoms.len());
        self.atoms.len() - 1
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atom_name(&self, index: usize) -> &str {
        self.symbols.resolve(self.atoms[index].name)
    }

    pub fn type_name(&self, index: usize) -> &str {
        self.symbols.resolve(self.atoms[index].type_name)
    }

    pub fn residue_name(&self, index: usize) -> &str {
        self.symbols.resolve(self.atoms[index].residue)
    }

    pub fn has_shells(&self) -> bool {
        self.atoms.iter().any(Atom::is_shell)
    }

    pub fn has_virtual_sites(&self) -> bool {
        self.atoms
            .iter()
            .any(|atom| atom.kind == ParticleKind::VirtualSite)
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|atom| atom.position).collect()
    }

    pub fn total_charge(&self) -> f64 {
        self.atoms.iter().map(|atom| atom.charge).sum()
    }

    pub fn total_mass(&self) -> f64 {
        self.atoms.iter().map(|atom| atom.mass).sum()
    }

    pub fn is_hydrogen(&self, index: usize) -> bool {
        self.atoms[index].atomic_number == 1
    }

    /// Ordered rows of one interaction list, as written to topology files.
    pub fn rows(&self, ftype: FunctionalType) -> Vec<BondedRow<'_>> {
        self.interactions
            .get(ftype)
            .iter()
            .map(|interaction| BondedRow {
                atoms: &interaction.atoms,
                directive_index: ftype.directive_index(),
                params: &interaction.params[..ftype.nparams()],
            })
            .collect()
    }
}
