use super::error::GenerationError;
use crate::core::forcefield::params::ForceField;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::Topology;
use crate::core::utils::units::ENM2DEBYE;
use nalgebra::{Matrix3, Point3, Vector3};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polarizability {
    /// Sum of the atomic polarizabilities.
    pub total: f64,
    /// Root-mean-square of the per-atom uncertainties.
    pub spread: f64,
}

/// Electric and mass properties of a generated topology.
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularProperties {
    pub total_charge: f64,
    pub total_mass: f64,
    /// Dipole vector in Debye.
    pub dipole: Vector3<f64>,
    pub dipole_norm: f64,
    /// Quadrupole tensor in Buckingham.
    pub quadrupole: Matrix3<f64>,
    pub centrosymmetric: bool,
    pub polarizability: Option<Polarizability>,
}

/// Computes the properties of `topology` from its current charges and
/// positions.
///
/// `tolerance` (nm) decides whether an atom sits on the centre of mass or
/// has an inversion partner.
pub fn calculate(topology: &Topology, store: &ForceField, tolerance: f64) -> MolecularProperties {
    let dipole = dipole(topology);
    let properties = MolecularProperties {
        total_charge: topology.total_charge(),
        total_mass: topology.total_mass(),
        dipole,
        dipole_norm: dipole.norm(),
        quadrupole: quadrupole(topology),
        centrosymmetric: is_centrosymmetric(topology, tolerance),
        polarizability: polarizability(topology, store),
    };
    debug!(
        molecule = %topology.name,
        dipole = properties.dipole_norm,
        centrosymmetric = properties.centrosymmetric,
        "Computed molecular properties"
    );
    properties
}

pub fn dipole(topology: &Topology) -> Vector3<f64> {
    topology
        .atoms
        .iter()
        .map(|atom| atom.position.coords * atom.charge)
        .sum::<Vector3<f64>>()
        * ENM2DEBYE
}

pub fn quadrupole(topology: &Topology) -> Matrix3<f64> {
    let mut q = Matrix3::zeros();
    for atom in &topology.atoms {
        let x = atom.position.coords;
        let factor = atom.charge * 0.5 * 10.0 * ENM2DEBYE;
        let r2 = x.norm_squared();
        for m in 0..3 {
            q[(m, m)] += factor * (3.0 * x[m] * x[m] - r2);
            for n in (m + 1)..3 {
                let off = factor * 3.0 * x[m] * x[n];
                q[(m, n)] += off;
                q[(n, m)] += off;
            }
        }
    }
    q
}

pub fn center_of_mass(topology: &Topology) -> Point3<f64> {
    let total = topology.total_mass();
    if total <= 0.0 {
        return Point3::origin();
    }
    let weighted: Vector3<f64> = topology
        .atoms
        .iter()
        .map(|atom| atom.position.coords * atom.mass)
        .sum();
    Point3::from(weighted / total)
}

/// True when every atom either sits on the centre of mass or has a partner
/// at the inverted position.
pub fn is_centrosymmetric(topology: &Topology, tolerance: f64) -> bool {
    let com = center_of_mass(topology);
    let shifted: Vec<Vector3<f64>> = topology.atoms.iter().map(|a| a.position - com).collect();
    shifted.iter().enumerate().all(|(i, xi)| {
        xi.norm() < tolerance
            || shifted
                .iter()
                .enumerate()
                .any(|(j, xj)| j != i && (xi + xj).norm() < tolerance)
    })
}

pub fn polarizability(topology: &Topology, store: &ForceField) -> Option<Polarizability> {
    let real: Vec<usize> = (0..topology.atom_count())
        .filter(|&i| topology.atoms[i].is_real())
        .collect();
    let (mut total, mut variance, mut found) = (0.0, 0.0, false);
    for &i in &real {
        if let Some((alpha, sigma)) = store.polarizability(topology.type_name(i)) {
            total += alpha;
            variance += sigma * sigma;
            found = true;
        }
    }
    found.then(|| Polarizability {
        total,
        spread: (variance / real.len() as f64).sqrt(),
    })
}

/// Verifies that the molecule carries the reference data needed to use it
/// for training.
///
/// # Errors
///
/// [`GenerationError::MissingReference`] naming the first missing quantity.
pub fn check_reference(molecule: &Molecule) -> Result<(), GenerationError> {
    let reference = molecule
        .reference
        .as_ref()
        .ok_or(GenerationError::MissingReference("energy"))?;
    if reference.energy.is_none() {
        return Err(GenerationError::MissingReference("energy"));
    }
    if reference.dipole.is_none() {
        return Err(GenerationError::MissingReference("dipole"));
    }
    Ok(())
}
