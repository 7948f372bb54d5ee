use super::config::{DihedralPolicy, ImproperCenters, ImproperPolicy, ImproperSubstituents};
use crate::core::forcefield::functional::FunctionalType;
use crate::core::forcefield::params::FunctionDeclarations;
use crate::core::models::exclusions::Exclusions;
use crate::core::models::interaction::Interaction;
use crate::core::models::topology::Topology;
use crate::core::topology::adjacency::{Adjacency, NeighborTable};
use itertools::Itertools;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument};

/// Counts of the terms produced by one generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BondedSummary {
    pub angles: usize,
    pub proper_dihedrals: usize,
    pub impropers: usize,
    pub pairs: usize,
    pub exclusions: usize,
}

/// Adjacency of the canonical harmonic-bond list.
pub fn bond_graph(topology: &Topology) -> Adjacency {
    Adjacency::from_pairs(
        topology.atom_count(),
        topology
            .interactions
            .get(FunctionalType::Bonds)
            .iter()
            .map(|bond| (bond.atoms[0], bond.atoms[1])),
    )
}

/// Derives angles, dihedrals, impropers, 1-4 pairs and exclusions from the
/// canonical bond list.
///
/// Any previously generated lists of these kinds are replaced, so running
/// the generator twice on the same bonds yields identical output.
#[instrument(skip_all, name = "generate_bonded", fields(molecule = %topology.name))]
pub fn generate_bonded(
    topology: &mut Topology,
    nrexcl: usize,
    dihedrals: &DihedralPolicy,
    impropers: &ImproperPolicy,
) -> BondedSummary {
    let adjacency = bond_graph(topology);
    let table = NeighborTable::new(&adjacency, (nrexcl + 2).max(3));

    for ftype in [
        FunctionalType::Angles,
        FunctionalType::ProperDihedrals,
        FunctionalType::ImproperDihedrals,
        FunctionalType::LennardJones14,
    ] {
        topology.interactions.clear(ftype);
    }

    for (i, j, k) in generate_angles(&adjacency) {
        topology
            .interactions
            .push(FunctionalType::Angles, Interaction::new(&[i, j, k]));
    }

    let central_bonds: Vec<(usize, usize)> = topology
        .interactions
        .get(FunctionalType::Bonds)
        .iter()
        .map(|bond| (bond.atoms[0], bond.atoms[1]))
        .collect();
    let candidates = generate_dihedrals(&adjacency, &central_bonds);

    for [i, j] in generate_pairs(topology, &table, &candidates, dihedrals.generate_hh14) {
        topology
            .interactions
            .push(FunctionalType::LennardJones14, Interaction::new(&[i, j]));
    }

    let improper_terms = generate_impropers(&adjacency, impropers);
    let mut kept = if dihedrals.keep_all_generated {
        candidates
    } else {
        one_per_central_bond(topology, candidates)
    };
    if dihedrals.remove_if_improper && !improper_terms.is_empty() {
        let before = kept.len();
        kept.retain(|d| {
            !improper_terms
                .iter()
                .any(|imp| imp.contains(&d[1]) && imp.contains(&d[2]))
        });
        debug!(removed = before - kept.len(), "Dropped dihedrals covered by impropers");
    }
    for d in &kept {
        topology
            .interactions
            .push(FunctionalType::ProperDihedrals, Interaction::new(d));
    }
    for imp in &improper_terms {
        topology
            .interactions
            .push(FunctionalType::ImproperDihedrals, Interaction::new(imp));
    }

    topology.exclusions = generate_exclusions(&table, topology.atom_count(), nrexcl);
    topology.nrexcl = nrexcl;

    let summary = BondedSummary {
        angles: topology.interactions.len(FunctionalType::Angles),
        proper_dihedrals: topology.interactions.len(FunctionalType::ProperDihedrals),
        impropers: topology.interactions.len(FunctionalType::ImproperDihedrals),
        pairs: topology.interactions.len(FunctionalType::LennardJones14),
        exclusions: topology.exclusions.pair_count(),
    };
    debug!(?summary, "Generated bonded terms");
    summary
}

/// Every unordered pair of neighbors around each centre, outer atoms in
/// neighbor-list order.
fn generate_angles(adjacency: &Adjacency) -> Vec<(usize, usize, usize)> {
    (0..adjacency.len())
        .flat_map(|j| {
            adjacency
                .neighbors(j)
                .iter()
                .tuple_combinations()
                .map(move |(&i, &k)| (i, j, k))
        })
        .collect()
}

fn generate_dihedrals(adjacency: &Adjacency, central_bonds: &[(usize, usize)]) -> Vec<[usize; 4]> {
    let mut seen = HashSet::new();
    let mut dihedrals = Vec::new();
    for &(j, k) in central_bonds {
        for &i in adjacency.neighbors(j).iter().filter(|&&i| i != k) {
            for &l in adjacency.neighbors(k).iter().filter(|&&l| l != j) {
                if i == l {
                    continue;
                }
                let forward = [i, j, k, l];
                let reverse = [l, k, j, i];
                if seen.insert(forward.min(reverse)) {
                    dihedrals.push(forward);
                }
            }
        }
    }
    dihedrals
}

fn generate_pairs(
    topology: &Topology,
    table: &NeighborTable,
    dihedrals: &[[usize; 4]],
    generate_hh14: bool,
) -> Vec<[usize; 2]> {
    let mut seen = BTreeSet::new();
    let mut pairs = Vec::new();
    for d in dihedrals {
        let (i, l) = (d[0].min(d[3]), d[0].max(d[3]));
        if table.distance(i, l) != Some(3) {
            continue;
        }
        if !generate_hh14 && topology.is_hydrogen(i) && topology.is_hydrogen(l) {
            continue;
        }
        if seen.insert((i, l)) {
            pairs.push([i, l]);
        }
    }
    pairs
}

fn generate_impropers(adjacency: &Adjacency, policy: &ImproperPolicy) -> Vec<[usize; 4]> {
    let mut impropers = Vec::new();
    for center in 0..adjacency.len() {
        let neighbors = adjacency.neighbors(center);
        let eligible = match policy.centers {
            ImproperCenters::Never => false,
            ImproperCenters::ThreeCoordinated => neighbors.len() == 3,
            ImproperCenters::AtLeastThree => neighbors.len() >= 3,
        };
        if !eligible {
            continue;
        }
        match policy.substituents {
            ImproperSubstituents::First => {
                impropers.push([center, neighbors[0], neighbors[1], neighbors[2]]);
            }
            ImproperSubstituents::AllCombinations => {
                for (&a, &b, &c) in neighbors.iter().tuple_combinations() {
                    impropers.push([center, a, b, c]);
                }
            }
        }
    }
    impropers
}

/// Keeps the dihedral with the fewest terminal hydrogens for each central
/// bond; on ties the first generated wins.
fn one_per_central_bond(topology: &Topology, dihedrals: Vec<[usize; 4]>) -> Vec<[usize; 4]> {
    let hydrogens = |d: &[usize; 4]| {
        usize::from(topology.is_hydrogen(d[0])) + usize::from(topology.is_hydrogen(d[3]))
    };
    let mut best: Vec<[usize; 4]> = Vec::new();
    for d in dihedrals {
        let key = (d[1].min(d[2]), d[1].max(d[2]));
        match best
            .iter_mut()
            .find(|b| (b[1].min(b[2]), b[1].max(b[2])) == key)
        {
            Some(current) if hydrogens(&d) < hydrogens(current) => *current = d,
            Some(_) => {}
            None => best.push(d),
        }
    }
    best
}

fn generate_exclusions(table: &NeighborTable, n_atoms: usize, nrexcl: usize) -> Exclusions {
    let mut exclusions = Exclusions::new(n_atoms);
    for i in 0..n_atoms {
        for distance in 1..=nrexcl {
            for &j in table.at(i, distance) {
                exclusions.add(i, j);
            }
        }
    }
    exclusions
}

/// Moves the canonical lists onto the functional types the force field
/// declares for bonds, angles, proper and improper dihedrals.
pub fn move_to_declared(topology: &mut Topology, declarations: &FunctionDeclarations) {
    let moves = [
        (FunctionalType::Bonds, declarations.bond),
        (FunctionalType::Angles, declarations.angle),
        (FunctionalType::ProperDihedrals, declarations.proper_dihedral),
        (FunctionalType::ImproperDihedrals, declarations.improper_dihedral),
    ];
    for (from, to) in moves {
        if from != to {
            topology.interactions.move_list(from, to);
        }
    }
}
