use super::config::ChargeModel;
use super::error::GenerationError;
use crate::core::forcefield::functional::FunctionalType;
use crate::core::forcefield::params::ForceField;
use crate::core::models::atom::{Atom, ParticleKind};
use crate::core::models::interaction::Interaction;
use crate::core::models::molecule::{Calculation, Molecule};
use crate::core::models::topology::{Bond, Topology};
use crate::core::utils::elements;
use crate::core::utils::units::LengthUnit;
use nalgebra::Point3;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Builds the atoms of `molecule` from the calculation at the requested level
/// of theory.
///
/// Coordinates are converted to nm, external atom types are translated
/// through the force field's alias table, masses come from the element
/// table, and with a [`ChargeModel::Named`] model each atom takes its tagged
/// charge (zero when absent).
///
/// # Errors
///
/// Fails when no matching calculation exists, the calculation has no atoms,
/// or an atom has an unknown unit, element or type.
pub fn generate_atoms(
    molecule: &Molecule,
    store: &ForceField,
    level_of_theory: Option<&str>,
    charge_model: &ChargeModel,
) -> Result<Topology, GenerationError> {
    let calculation = molecule
        .calculation(level_of_theory)
        .ok_or_else(|| GenerationError::LevelOfTheory(level_of_theory.map(str::to_string)))?;
    if calculation.atoms.is_empty() {
        return Err(GenerationError::NoAtoms);
    }

    let mut topology = Topology::new(&molecule.name);
    topology.net_charge = molecule.charge;
    topology.multiplicity = molecule.multiplicity;
    let residue = topology.symbols.intern(&molecule.name);

    for (i, source) in calculation.atoms.iter().enumerate() {
        let unit: LengthUnit = source.unit.parse()?;
        let element =
            elements::element(&source.element).ok_or_else(|| GenerationError::UnknownElement {
                atom: i + 1,
                element: source.element.clone(),
            })?;
        let type_name = store.translate_type(&source.atom_type);
        if store.atom_type(type_name).is_none() {
            return Err(GenerationError::UnknownAtomType {
                atom: i + 1,
                atom_type: source.atom_type.clone(),
            });
        }
        let [x, y, z] = source.position.map(|c| unit.to_nm(c));
        let name = source
            .name
            .clone()
            .unwrap_or_else(|| format!("{}{}", element.symbol, i + 1));

        let type_index = topology.add_atom_type(type_name, ParticleKind::Atom, element.atomic_number);
        let type_id = topology.symbols.intern(type_name);
        let name_id = topology.symbols.intern(&name);
        let mut atom = Atom::new(
            name_id,
            type_id,
            residue,
            type_index,
            element.atomic_number,
            element.mass,
            Point3::new(x, y, z),
        );
        if let ChargeModel::Named(model) = charge_model {
            atom.set_charge(source.charge(model).unwrap_or(0.0));
        }
        topology.add_atom(atom);
    }
    topology.ring_atoms = vec![false; topology.atom_count()];

    debug!(
        atoms = topology.atom_count(),
        level_of_theory = %calculation.level_of_theory,
        "Generated atoms"
    );
    Ok(topology)
}

/// Copies the molecule's bonds into the topology, converting the 1-based
/// input indices and storing each bond once, lower index first.
///
/// The bonds also seed the canonical harmonic-bond list from which angles
/// and dihedrals are derived.
///
/// # Errors
///
/// Fails when a bond references a missing atom or an atom bonded to itself,
/// or when a molecule of more than one atom has no bonds at all.
pub fn generate_bonds(molecule: &Molecule, topology: &mut Topology) -> Result<usize, GenerationError> {
    let n_atoms = topology.atom_count();
    let mut seen = BTreeSet::new();
    topology.bonds.clear();
    topology.interactions.clear(FunctionalType::Bonds);

    for bond in &molecule.bonds {
        let invalid = || GenerationError::InvalidBond {
            ai: bond.ai,
            aj: bond.aj,
            atoms: n_atoms,
        };
        if bond.ai == 0 || bond.aj == 0 || bond.ai > n_atoms || bond.aj > n_atoms || bond.ai == bond.aj {
            return Err(invalid());
        }
        let (i, j) = (bond.ai.min(bond.aj) - 1, bond.ai.max(bond.aj) - 1);
        if !seen.insert((i, j)) {
            warn!(molecule = %molecule.name, "Duplicate bond {}-{} ignored", i + 1, j + 1);
            continue;
        }
        topology.bonds.push(Bond::new(i, j, bond.order));
        topology
            .interactions
            .push(FunctionalType::Bonds, Interaction::new(&[i, j]));
    }

    if topology.bonds.is_empty() && n_atoms > 1 {
        return Err(GenerationError::NoBonds);
    }
    Ok(topology.bonds.len())
}

/// The calculation atoms were taken from, for later charge fitting.
pub fn selected_calculation<'m>(
    molecule: &'m Molecule,
    level_of_theory: Option<&str>,
) -> Result<&'m Calculation, GenerationError> {
    molecule
        .calculation(level_of_theory)
        .ok_or_else(|| GenerationError::LevelOfTheory(level_of_theory.map(str::to_string)))
}
