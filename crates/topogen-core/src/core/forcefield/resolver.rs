use super::functional::FunctionalType;
use super::params::{BondedParam, DihedralKind, ForceField, FunctionDeclarations};
use crate::core::models::ids::SymbolId;
use crate::core::models::interaction::Interaction;
use crate::core::models::topology::Topology;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Atom type '{0}' is not defined in the force field")]
    UnknownAtomType(String),
    #[error("No {kind} parameters for bond types {}", .types.join("-"))]
    MissingParameters {
        kind: &'static str,
        types: Vec<String>,
    },
    #[error("Invalid parameter string '{params}' for {kind} {}", .types.join("-"))]
    InvalidParameterString {
        kind: &'static str,
        types: Vec<String>,
        params: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermKind {
    Bond,
    Angle,
    Dihedral,
    Improper,
}

impl TermKind {
    fn label(self) -> &'static str {
        match self {
            TermKind::Bond => "bond",
            TermKind::Angle => "angle",
            TermKind::Dihedral => "dihedral",
            TermKind::Improper => "improper",
        }
    }

    fn search<'s>(self, store: &'s ForceField, types: &[&str]) -> Option<&'s BondedParam> {
        match self {
            TermKind::Bond => store.search_bond(types[0], types[1]),
            TermKind::Angle => store.search_angle(types[0], types[1], types[2]),
            TermKind::Dihedral => store.search_dihedral(
                DihedralKind::Proper,
                [types[0], types[1], types[2], types[3]],
            ),
            TermKind::Improper => store.search_dihedral(
                DihedralKind::Improper,
                [types[0], types[1], types[2], types[3]],
            ),
        }
    }
}

/// Fills the coefficients of bonded interactions from the force field.
///
/// Atom types are mapped to bond types once per distinct interned type name.
pub struct ParameterResolver<'a> {
    store: &'a ForceField,
    bond_types: HashMap<SymbolId, Option<&'a str>>,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(store: &'a ForceField) -> Self {
        Self {
            store,
            bond_types: HashMap::new(),
        }
    }

    /// Resolves every bond, angle, proper and improper dihedral of the
    /// declared functional types.
    ///
    /// # Arguments
    ///
    /// * `topology` - The topology whose interaction lists are filled in place.
    /// * `declarations` - The functional types the lists were moved to.
    ///
    /// # Return
    ///
    /// The number of interactions that received coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] naming the offending types on the first term
    /// that cannot be resolved; the topology is then partially filled and
    /// should be discarded.
    #[instrument(skip_all, name = "resolve_parameters", fields(molecule = %topology.name))]
    pub fn resolve(
        &mut self,
        topology: &mut Topology,
        declarations: &FunctionDeclarations,
    ) -> Result<usize, ResolveError> {
        let atom_bond_types = self.atom_bond_types(topology);
        let length_factor = self.store.length_unit().nm_per_unit();
        let store = self.store;
        let mut resolved = 0;

        let jobs = [
            (declarations.bond, TermKind::Bond),
            (declarations.angle, TermKind::Angle),
            (declarations.proper_dihedral, TermKind::Dihedral),
            (declarations.improper_dihedral, TermKind::Improper),
        ];
        for (ftype, kind) in jobs {
            let Some(list) = topology.interactions.get_mut(ftype) else {
                continue;
            };
            for interaction in list.iter_mut() {
                let types = interaction
                    .atoms
                    .iter()
                    .map(|&atom| atom_bond_types[atom].ok_or(atom))
                    .collect::<Result<Vec<&str>, usize>>()
                    .map_err(|atom| {
                        ResolveError::UnknownAtomType(topology.symbols.resolve(topology.atoms[atom].type_name).to_string())
                    })?;
                let entry = kind.search(store, &types).ok_or_else(|| {
                    ResolveError::MissingParameters {
                        kind: kind.label(),
                        types: types.iter().map(|t| t.to_string()).collect(),
                    }
                })?;
                let value = if kind == TermKind::Bond {
                    entry.value * length_factor
                } else {
                    entry.value
                };
                fill(interaction, ftype, value, entry).map_err(|_| {
                    ResolveError::InvalidParameterString {
                        kind: kind.label(),
                        types: types.iter().map(|t| t.to_string()).collect(),
                        params: entry.params.clone(),
                    }
                })?;
                resolved += 1;
            }
        }
        debug!(resolved, "Bonded parameters resolved.");
        Ok(resolved)
    }

    fn atom_bond_types(&mut self, topology: &Topology) -> Vec<Option<&'a str>> {
        let store = self.store;
        topology
            .atoms
            .iter()
            .map(|atom| {
                *self.bond_types.entry(atom.type_name).or_insert_with(|| {
                    store.bond_type(topology.symbols.resolve(atom.type_name))
                })
            })
            .collect()
    }
}

fn fill(
    interaction: &mut Interaction,
    ftype: FunctionalType,
    value: f64,
    entry: &BondedParam,
) -> Result<(), std::num::ParseFloatError> {
    let extra = entry.parse_params()?;
    interaction.params[0] = value;
    for (slot, coefficient) in interaction.params[1..ftype.nparams()]
        .iter_mut()
        .zip(extra)
    {
        *slot = coefficient;
    }
    Ok(())
}
