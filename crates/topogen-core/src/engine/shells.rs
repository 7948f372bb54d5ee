use super::error::EngineError;
use crate::core::forcefield::functional::FunctionalType;
use crate::core::forcefield::params::ForceField;
use crate::core::models::atom::{Atom, ParticleKind};
use crate::core::models::exclusions::Exclusions;
use crate::core::models::interaction::Interaction;
use crate::core::models::topology::{Bond, Topology};
use tracing::{debug, instrument};

/// Converts a polarizability into the polarization force coefficient.
pub const POLARIZATION_FACTOR: f64 = 0.001;

/// Inserts one shell particle directly after every real atom whose type is
/// polarizable, returning the number of shells added.
///
/// Types with a zero polarizability get no shell. Indices are remapped
/// through a permutation computed before anything is moved. Each shell is
/// tied to its parent by a polarization term, inherits the parent's
/// exclusions, and shells of mutually excluded parents exclude each other.
/// Exclusions between two real atoms are never added, so the real-real
/// relation is the same before and after insertion.
///
/// # Errors
///
/// Returns [`EngineError::ShellOrdering`] when the topology already holds
/// shells or polarization terms, including a shell in first position.
#[instrument(skip_all, name = "add_shells", fields(molecule = %topology.name))]
pub fn add_shells(topology: &mut Topology, store: &ForceField) -> Result<usize, EngineError> {
    if topology.has_shells() || !topology.interactions.get(FunctionalType::Polarization).is_empty()
    {
        return Err(EngineError::ShellOrdering {
            molecule: topology.name.clone(),
        });
    }

    let n_old = topology.atom_count();
    let mut permutation = Vec::with_capacity(n_old);
    let mut polarizable: Vec<Option<f64>> = Vec::with_capacity(n_old);
    let mut next = 0;
    for (i, atom) in topology.atoms.iter().enumerate() {
        permutation.push(next);
        next += 1;
        let alpha = if atom.is_real() {
            store
                .polarizability(topology.type_name(i))
                .map(|(alpha, _)| alpha)
                .filter(|&alpha| alpha != 0.0)
        } else {
            None
        };
        if alpha.is_some() {
            next += 1;
        }
        polarizable.push(alpha);
    }
    let n_new = next;
    if n_new == n_old {
        return Ok(0);
    }

    let old_atoms = std::mem::take(&mut topology.atoms);
    let mut atoms = Vec::with_capacity(n_new);
    let mut ring_atoms = Vec::with_capacity(n_new);
    let mut pairs = Vec::new();
    for (i, atom) in old_atoms.into_iter().enumerate() {
        let in_ring = topology.ring_atoms.get(i).copied().unwrap_or(false);
        let shell = polarizable[i].map(|alpha| {
            let type_name = format!("{}s", topology.symbols.resolve(atom.type_name));
            let name = format!("{}s", topology.symbols.resolve(atom.name));
            let type_index = topology.add_atom_type(&type_name, ParticleKind::Shell, 0);
            let type_id = topology.symbols.intern(&type_name);
            let name_id = topology.symbols.intern(&name);
            (
                Atom::massless_from(&atom, name_id, type_id, type_index, ParticleKind::Shell),
                alpha,
            )
        });
        atoms.push(atom);
        ring_atoms.push(in_ring);
        if let Some((shell, alpha)) = shell {
            let parent = atoms.len() - 1;
            atoms.push(shell);
            ring_atoms.push(false);
            pairs.push((parent, parent + 1, alpha));
        }
    }
    topology.atoms = atoms;
    topology.ring_atoms = ring_atoms;

    topology.interactions.renumber(&permutation);
    topology.motifs.renumber(&permutation);
    for bond in &mut topology.bonds {
        *bond = Bond::new(permutation[bond.atom1], permutation[bond.atom2], bond.order);
    }
    if !topology.charge_groups.is_empty() {
        let mut groups = vec![0; n_new];
        for (old, &group) in topology.charge_groups.iter().enumerate() {
            groups[permutation[old]] = group;
        }
        for &(parent, shell, _) in &pairs {
            groups[shell] = groups[parent];
        }
        topology.charge_groups = groups;
    }

    for &(parent, shell, alpha) in &pairs {
        topology.interactions.push(
            FunctionalType::Polarization,
            Interaction::with_params(&[parent, shell], &[POLARIZATION_FACTOR * alpha]),
        );
    }

    topology.exclusions = rebuild_exclusions(topology, &permutation, n_new, &pairs);
    debug!(shells = pairs.len(), atoms = n_new, "Inserted shells");
    Ok(pairs.len())
}

fn rebuild_exclusions(
    topology: &Topology,
    permutation: &[usize],
    n_new: usize,
    pairs: &[(usize, usize, f64)],
) -> Exclusions {
    let before = topology.exclusions.renumbered(permutation, n_new);
    let mut exclusions = Exclusions::new(n_new);

    for &(parent, shell, _) in pairs {
        exclusions.add(parent, shell);
    }
    for i in 0..n_new {
        for j in before.excluded(i) {
            exclusions.add(i, j);
        }
    }
    for &(parent, shell, _) in pairs {
        for j in before.excluded(parent) {
            exclusions.add(shell, j);
        }
    }
    for &(parent, shell, _) in pairs {
        let full: Vec<usize> = exclusions.excluded(parent).collect();
        for j in full {
            exclusions.add(shell, j);
        }
    }
    exclusions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::tests::{SAMPLE_FORCEFIELD, sample_store};
    use crate::engine::atoms::tests::methanol_topology;
    use crate::engine::bonded::generate_bonded;
    use crate::engine::config::{DihedralPolicy, ImproperPolicy};
    use nalgebra::Point3;

    fn single_atom(atom_type: &str) -> Topology {
        let mut top = Topology::new("single");
        let res = top.symbols.intern("MOL");
        let index = top.add_atom_type(atom_type, ParticleKind::Atom, 6);
        let ty = top.symbols.intern(atom_type);
        let name = top.symbols.intern("C1");
        top.add_atom(Atom::new(name, ty, res, index, 6, 12.011, Point3::origin()));
        top
    }

    #[test]
    fn single_polarizable_atom_gets_one_shell() {
        let store = sample_store();
        let mut top = single_atom("c3");
        assert_eq!(add_shells(&mut top, &store).unwrap(), 1);
        assert_eq!(top.atom_count(), 2);
        let shell = &top.atoms[1];
        assert!(shell.is_shell());
        assert_eq!(shell.mass, 0.0);
        assert_eq!(shell.charge, 0.0);
        assert_eq!(top.type_name(1), "c3s");
        assert_eq!(top.atom_name(1), "C1s");
        let pol = top.interactions.get(FunctionalType::Polarization);
        assert_eq!(pol.len(), 1);
        assert_eq!(pol[0].atoms, vec![0, 1]);
        assert!((pol[0].params[0] - 0.001 * 1.2).abs() < 1e-15);
        assert!(top.exclusions.contains(0, 1));
    }

    #[test]
    fn non_polarizable_atoms_are_untouched() {
        let store = sample_store();
        let mut top = single_atom("ho");
        assert_eq!(add_shells(&mut top, &store).unwrap(), 0);
        assert_eq!(top.atom_count(), 1);
    }

    #[test]
    fn zero_polarizability_gets_no_shell() {
        let content = SAMPLE_FORCEFIELD.replace("polarizability = 1.2", "polarizability = 0.0");
        let store = ForceField::from_toml_str(&content).unwrap();
        let mut top = methanol_topology();
        // hc x3 and oh keep their shells; c3 is now unpolarizable.
        assert_eq!(add_shells(&mut top, &store).unwrap(), 4);
        assert_eq!(top.atom_count(), 10);
        assert!(top.atoms[1].is_real());
        let pol = top.interactions.get(FunctionalType::Polarization);
        assert_eq!(pol.len(), 4);
        assert_eq!(pol[0].atoms, vec![1, 2]);
        assert!(pol.iter().all(|p| p.params[0] > 0.0));
    }

    #[test]
    fn adding_shells_twice_is_rejected() {
        let store = sample_store();
        let mut top = methanol_topology();
        add_shells(&mut top, &store).unwrap();
        let atoms = top.atom_count();
        let pol = top.interactions.get(FunctionalType::Polarization).to_vec();
        let err = add_shells(&mut top, &store).unwrap_err();
        assert!(matches!(err, EngineError::ShellOrdering { .. }));
        assert_eq!(top.atom_count(), atoms);
        assert_eq!(top.interactions.get(FunctionalType::Polarization), pol.as_slice());
    }

    #[test]
    fn leading_shell_is_rejected() {
        let store = sample_store();
        let mut top = single_atom("c3");
        top.atoms[0].kind = ParticleKind::Shell;
        let err = add_shells(&mut top, &store).unwrap_err();
        assert!(matches!(err, EngineError::ShellOrdering { .. }));
    }

    #[test]
    fn real_pairs_are_unchanged_by_insertion() {
        let store = sample_store();
        let mut top = methanol_topology();
        generate_bonded(&mut top, 1, &DihedralPolicy::default(), &ImproperPolicy::default());
        let before = top.exclusions.clone();
        add_shells(&mut top, &store).unwrap();
        let real: Vec<usize> = (0..top.atom_count()).filter(|&i| top.atoms[i].is_real()).collect();
        assert_eq!(real, vec![0, 2, 4, 6, 8, 10]);
        for (a, &i) in real.iter().enumerate() {
            for (b, &j) in real.iter().enumerate() {
                assert_eq!(top.exclusions.contains(i, j), before.contains(a, b), "pair {i}-{j}");
            }
        }
        // The oxygen shell (9) reaches both C (0) and HO (10), yet C and HO
        // stay mutually visible at one excluded bond.
        assert!(top.exclusions.contains(9, 0));
        assert!(top.exclusions.contains(9, 10));
        assert!(!top.exclusions.contains(0, 10));
        assert!(top.exclusions.is_symmetric());
    }

    #[test]
    fn shells_follow_parents_and_indices_are_remapped() {
        let store = sample_store();
        let mut top = methanol_topology();
        generate_bonded(&mut top, 3, &DihedralPolicy::default(), &ImproperPolicy::default());
        let n_bonds = top.interactions.len(FunctionalType::Bonds);

        // c3, hc x3 and oh are polarizable; ho is not.
        assert_eq!(add_shells(&mut top, &store).unwrap(), 5);
        assert_eq!(top.atom_count(), 11);
        for (i, atom) in top.atoms.iter().enumerate() {
            if atom.is_shell() {
                assert!(top.atoms[i - 1].is_real());
            }
        }
        assert_eq!(top.atom_name(10), "HO");
        assert_eq!(top.atom_name(8), "O1");
        assert_eq!(top.interactions.len(FunctionalType::Bonds), n_bonds);
        let oh = &top.interactions.get(FunctionalType::Bonds)[4];
        assert_eq!(oh.atoms, vec![8, 10]);
        assert_eq!(top.bonds[4].atom1, 8);
        assert_eq!(top.interactions.len(FunctionalType::Polarization), 5);
        assert_eq!(top.interactions.max_atom_index(), Some(10));
    }

    #[test]
    fn shell_exclusions_are_symmetric_and_inherited() {
        let store = sample_store();
        let mut top = methanol_topology();
        generate_bonded(&mut top, 3, &DihedralPolicy::default(), &ImproperPolicy::default());
        add_shells(&mut top, &store).unwrap();
        assert!(top.exclusions.is_symmetric());
        // C (0) excludes HO (10); so does the carbon shell (1).
        assert!(top.exclusions.contains(0, 10));
        assert!(top.exclusions.contains(1, 10));
        // Shells of mutually excluded atoms C and O exclude each other.
        assert!(top.exclusions.contains(1, 9));
        // Real pairs are unchanged.
        assert!(top.exclusions.contains(0, 8));
        for i in 0..top.atom_count() {
            assert!(!top.exclusions.contains(i, i));
        }
    }
}
