use super::error::EngineError;
use crate::core::forcefield::combination::NonbondedMatrix;
use crate::core::forcefield::functional::{FunctionalType, MAX_FORCE_PARAM};
use crate::core::forcefield::params::{ForceField, FunctionDeclarations};
use crate::core::forcefield::table::{ParameterEntry, ParameterTable};
use crate::core::models::atom::{AtomType, ParticleKind};
use crate::core::models::exclusions::ExclusionBlock;
use crate::core::models::ids::SymbolId;
use crate::core::models::topology::Topology;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Exponent of the repulsive Lennard-Jones term.
pub const REPULSION_POWER: f64 = 12.0;

/// Contiguous partition of atoms; group `g` spans `index[g]..index[g + 1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub index: Vec<usize>,
}

impl Block {
    /// Builds the partition from per-atom group numbers. Each change of
    /// group number between neighbouring atoms starts a new block; with no
    /// group numbers every atom is its own block.
    pub fn from_groups(groups: &[usize], n_atoms: usize) -> Self {
        let mut index = Vec::with_capacity(n_atoms + 1);
        index.push(0);
        if groups.len() == n_atoms {
            for i in 1..n_atoms {
                if groups[i] != groups[i - 1] {
                    index.push(i);
                }
            }
        } else {
            index.extend(1..n_atoms);
        }
        if n_atoms > 0 {
            index.push(n_atoms);
        }
        Self { index }
    }

    pub fn len(&self) -> usize {
        self.index.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self, group: usize) -> std::ops::Range<usize> {
        self.index[group]..self.index[group + 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomRecord {
    pub type_index: usize,
    pub charge: f64,
    pub charge_b: f64,
    pub mass: f64,
    pub kind: ParticleKind,
}

/// Global force-field block shared by all molecule types.
#[derive(Debug, Clone)]
pub struct ForceFieldParameters {
    pub ntypes: usize,
    pub nonbonded: NonbondedMatrix,
    pub table: ParameterTable,
    pub fudge_qq: f64,
    pub fudge_lj: f64,
    pub repulsion_power: f64,
}

#[derive(Debug, Clone)]
pub struct MoleculeType {
    pub name: String,
    pub atoms: Vec<AtomRecord>,
    /// Flattened `[handle, a0, a1, ...]` records per functional type.
    pub ilists: BTreeMap<FunctionalType, Vec<usize>>,
    pub exclusions: ExclusionBlock,
    pub charge_groups: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoleculeBlock {
    pub moltype: usize,
    pub count: usize,
}

/// Simulation-ready description of one molecule.
#[derive(Debug, Clone)]
pub struct AssembledTopology {
    pub name: String,
    pub forcefield: ForceFieldParameters,
    pub moltypes: Vec<MoleculeType>,
    pub molblocks: Vec<MoleculeBlock>,
}

impl AssembledTopology {
    pub fn natoms(&self) -> usize {
        self.molblocks
            .iter()
            .map(|block| block.count * self.moltypes[block.moltype].atoms.len())
            .sum()
    }

    pub fn parameters(&self, handle: usize) -> Option<&ParameterEntry> {
        self.forcefield.table.get(handle)
    }
}

/// Builds the molecule-level topology.
///
/// Atom-type indices are compacted to the types actually used, in order of
/// first appearance, and the topology's type registry is rebuilt to match.
/// Every interaction receives a handle into a fresh deduplicated table; 1-4
/// pair coefficients are derived from the nonbonded matrix scaled by the
/// force field's fudge factor.
///
/// # Errors
///
/// Returns [`EngineError::ForceField`] when the declared van der Waals form
/// cannot be combined.
#[instrument(skip_all, name = "assemble_topology", fields(molecule = %topology.name))]
pub fn assemble(
    topology: &mut Topology,
    store: &ForceField,
    declarations: &FunctionDeclarations,
) -> Result<AssembledTopology, EngineError> {
    let used = compact_atom_types(topology);
    let type_names: Vec<&str> = used.iter().map(|&id| topology.symbols.resolve(id)).collect();
    let nonbonded = NonbondedMatrix::generate(
        store,
        declarations.combination_rule,
        declarations.vdw,
        &type_names,
    )?;

    let fudge_lj = store.fudge_lj();
    let mut table = ParameterTable::new();
    let mut ilists = BTreeMap::new();
    let type_of: Vec<usize> = topology.atoms.iter().map(|a| a.type_index).collect();
    for (ftype, list) in topology.interactions.iter_mut() {
        if list.is_empty() {
            continue;
        }
        let mut iatoms = Vec::with_capacity(list.len() * (1 + ftype.nratoms()));
        for interaction in list.iter_mut() {
            if ftype == FunctionalType::LennardJones14 {
                let [c6, c12] =
                    nonbonded.get(type_of[interaction.atoms[0]], type_of[interaction.atoms[1]]);
                let mut params = [0.0; MAX_FORCE_PARAM];
                params[0] = c6 * fudge_lj;
                params[1] = c12 * fudge_lj;
                interaction.params = params;
            }
            let handle = table.enter(ftype, &interaction.params);
            interaction.handle = Some(handle);
            iatoms.push(handle);
            iatoms.extend_from_slice(&interaction.atoms);
        }
        ilists.insert(ftype, iatoms);
    }

    let atoms = topology
        .atoms
        .iter()
        .map(|atom| AtomRecord {
            type_index: atom.type_index,
            charge: atom.charge,
            charge_b: atom.charge_b,
            mass: atom.mass,
            kind: atom.kind,
        })
        .collect();
    let n_atoms = topology.atom_count();
    let moltype = MoleculeType {
        name: topology.name.clone(),
        atoms,
        ilists,
        exclusions: topology.exclusions.to_block(),
        charge_groups: Block::from_groups(&topology.charge_groups, n_atoms),
    };
    debug!(
        ntypes = used.len(),
        parameters = table.len(),
        "Assembled molecule type."
    );
    Ok(AssembledTopology {
        name: topology.name.clone(),
        forcefield: ForceFieldParameters {
            ntypes: used.len(),
            nonbonded,
            table,
            fudge_qq: store.fudge_qq(),
            fudge_lj,
            repulsion_power: REPULSION_POWER,
        },
        moltypes: vec![moltype],
        molblocks: vec![MoleculeBlock {
            moltype: 0,
            count: 1,
        }],
    })
}

/// Renumbers atom-type indices densely by first appearance and returns the
/// used type names in index order.
fn compact_atom_types(topology: &mut Topology) -> Vec<SymbolId> {
    let mut used: Vec<SymbolId> = Vec::new();
    let mut registry: Vec<AtomType> = Vec::new();
    for atom in &mut topology.atoms {
        let index = match used.iter().position(|&name| name == atom.type_name) {
            Some(index) => index,
            None => {
                let atomic_number = topology
                    .atom_types
                    .iter()
                    .find(|t| t.name == atom.type_name)
                    .map_or(atom.atomic_number, |t| t.atomic_number);
                used.push(atom.type_name);
                registry.push(AtomType {
                    name: atom.type_name,
                    kind: atom.kind,
                    atomic_number,
                });
                used.len() - 1
            }
        };
        atom.type_index = index;
    }
    topology.atom_types = registry;
    used
}

/// A molecule-level topology expanded to global atom numbering.
#[derive(Debug, Clone, Default)]
pub struct LocalTopology {
    pub natoms: usize,
    pub type_index: Vec<usize>,
    pub charge: Vec<f64>,
    pub charge_b: Vec<f64>,
    pub mass: Vec<f64>,
    pub inverse_mass: Vec<f64>,
    pub kind: Vec<ParticleKind>,
    pub ilists: BTreeMap<FunctionalType, Vec<usize>>,
    pub exclusions: ExclusionBlock,
    pub charge_groups: Block,
}

impl LocalTopology {
    pub fn from_assembled(assembled: &AssembledTopology) -> Self {
        let mut local = LocalTopology {
            exclusions: ExclusionBlock {
                index: vec![0],
                entries: Vec::new(),
            },
            charge_groups: Block { index: vec![0] },
            ..Default::default()
        };
        for block in &assembled.molblocks {
            let moltype = &assembled.moltypes[block.moltype];
            for _ in 0..block.count {
                local.append(moltype);
            }
        }
        if local.charge_groups.index.len() == 1 {
            local.charge_groups.index.clear();
        }
        local
    }

    fn append(&mut self, moltype: &MoleculeType) {
        let offset = self.natoms;
        for atom in &moltype.atoms {
            self.type_index.push(atom.type_index);
            self.charge.push(atom.charge);
            self.charge_b.push(atom.charge_b);
            self.mass.push(atom.mass);
            self.inverse_mass
                .push(if atom.mass > 0.0 { 1.0 / atom.mass } else { 0.0 });
            self.kind.push(atom.kind);
        }
        for (&ftype, iatoms) in &moltype.ilists {
            let stride = 1 + ftype.nratoms();
            let target = self.ilists.entry(ftype).or_default();
            for record in iatoms.chunks(stride) {
                target.push(record[0]);
                target.extend(record[1..].iter().map(|&a| a + offset));
            }
        }
        let entry_offset = self.exclusions.entries.len();
        self.exclusions
            .entries
            .extend(moltype.exclusions.entries.iter().map(|&a| a + offset));
        self.exclusions.index.extend(
            moltype.exclusions.index[1..]
                .iter()
                .map(|&i| i + entry_offset),
        );
        let missing = moltype.atoms.len() + 1 - moltype.exclusions.index.len().max(1);
        let last = self.exclusions.entries.len();
        self.exclusions.index.extend(std::iter::repeat_n(last, missing));
        self.charge_groups.index.extend(
            moltype.charge_groups.index.iter().skip(1).map(|&i| i + offset),
        );
        self.natoms += moltype.atoms.len();
    }

    pub fn total_charge(&self) -> f64 {
        self.charge.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::tests::sample_store;
    use crate::core::forcefield::resolver::ParameterResolver;
    use crate::engine::atoms::tests::methanol_topology;
    use crate::engine::bonded::{generate_bonded, move_to_declared};
    use crate::engine::config::{ChargeGroupScheme, DihedralPolicy, ImproperPolicy};
    use crate::engine::charge_groups::generate_charge_groups;
    use crate::engine::shells::add_shells;

    fn prepared(with_shells: bool) -> (Topology, ForceField, FunctionDeclarations) {
        let store = sample_store();
        let decl = store.declarations().unwrap();
        let mut top = methanol_topology();
        generate_bonded(&mut top, 3, &DihedralPolicy::default(), &ImproperPolicy::default());
        if with_shells {
            add_shells(&mut top, &store).unwrap();
        }
        move_to_declared(&mut top, &decl);
        ParameterResolver::new(&store).resolve(&mut top, &decl).unwrap();
        (top, store, decl)
    }

    #[test]
    fn every_interaction_gets_a_handle_and_identical_terms_share_one() {
        let (mut top, store, decl) = prepared(false);
        let assembled = assemble(&mut top, &store, &decl).unwrap();
        for (_, list) in top.interactions.iter() {
            assert!(list.iter().all(|i| i.handle.is_some()));
        }
        let bonds = top.interactions.get(decl.bond);
        let ch: Vec<usize> = bonds
            .iter()
            .filter(|b| top.is_hydrogen(b.atoms[1]) && b.atoms[0] == 0)
            .filter_map(|b| b.handle)
            .collect();
        assert_eq!(ch.len(), 3);
        assert!(ch.iter().all(|&h| h == ch[0]));
        let entry = assembled.parameters(ch[0]).unwrap();
        assert_eq!(entry.ftype, FunctionalType::Morse);
        assert_eq!(entry.params[1], 435.0);
    }

    #[test]
    fn flattened_lists_carry_handle_and_atoms() {
        let (mut top, store, decl) = prepared(false);
        let assembled = assemble(&mut top, &store, &decl).unwrap();
        let moltype = &assembled.moltypes[0];
        for (&ftype, iatoms) in &moltype.ilists {
            assert_eq!(iatoms.len(), top.interactions.len(ftype) * (1 + ftype.nratoms()));
        }
        let angles = &moltype.ilists[&FunctionalType::Angles];
        let first = &top.interactions.get(FunctionalType::Angles)[0];
        assert_eq!(angles[0], first.handle.unwrap());
        assert_eq!(&angles[1..4], first.atoms.as_slice());
    }

    #[test]
    fn atom_types_are_compacted_in_order_of_appearance() {
        let (mut top, store, decl) = prepared(false);
        top.add_atom_type("unused", ParticleKind::Atom, 6);
        let assembled = assemble(&mut top, &store, &decl).unwrap();
        assert_eq!(assembled.forcefield.ntypes, 4);
        assert_eq!(top.atom_types.len(), 4);
        let types: Vec<usize> = top.atoms.iter().map(|a| a.type_index).collect();
        assert_eq!(types, vec![0, 1, 1, 1, 2, 3]);
        assert_eq!(assembled.forcefield.nonbonded.ntypes(), 4);
    }

    #[test]
    fn pair_coefficients_come_from_the_scaled_matrix() {
        let (mut top, store, decl) = prepared(false);
        let assembled = assemble(&mut top, &store, &decl).unwrap();
        let pairs = top.interactions.get(FunctionalType::LennardJones14);
        assert_eq!(pairs.len(), 3);
        let pair = &pairs[0];
        let [c6, c12] = assembled.forcefield.nonbonded.get(
            top.atoms[pair.atoms[0]].type_index,
            top.atoms[pair.atoms[1]].type_index,
        );
        assert!((pair.params[0] - 0.5 * c6).abs() < 1e-18);
        assert!((pair.params[1] - 0.5 * c12).abs() < 1e-24);
        assert_eq!(assembled.forcefield.repulsion_power, 12.0);
    }

    #[test]
    fn shells_get_zero_nonbonded_rows() {
        let (mut top, store, decl) = prepared(true);
        let assembled = assemble(&mut top, &store, &decl).unwrap();
        let shell = top.atoms.iter().find(|a| a.is_shell()).unwrap().type_index;
        for j in 0..assembled.forcefield.ntypes {
            assert_eq!(assembled.forcefield.nonbonded.get(shell, j), [0.0, 0.0]);
        }
        assert!(assembled.moltypes[0].ilists.contains_key(&FunctionalType::Polarization));
    }

    #[test]
    fn reassembling_gives_identical_tables() {
        let (mut top, store, decl) = prepared(false);
        let first = assemble(&mut top, &store, &decl).unwrap();
        let second = assemble(&mut top, &store, &decl).unwrap();
        assert_eq!(
            first.forcefield.table.entries(),
            second.forcefield.table.entries()
        );
        assert_eq!(first.moltypes[0].ilists, second.moltypes[0].ilists);
    }

    #[test]
    fn charge_group_block_defaults_to_one_atom_per_group() {
        assert_eq!(Block::from_groups(&[], 3).index, vec![0, 1, 2, 3]);
        assert_eq!(Block::from_groups(&[0, 0, 1, 1, 1], 5).index, vec![0, 2, 5]);
        assert!(Block::from_groups(&[], 0).is_empty());
    }

    #[test]
    fn local_topology_expands_the_block() {
        let (mut top, store, decl) = prepared(true);
        generate_charge_groups(&mut top, ChargeGroupScheme::AtomWithShells);
        let assembled = assemble(&mut top, &store, &decl).unwrap();
        let local = LocalTopology::from_assembled(&assembled);
        assert_eq!(local.natoms, 11);
        assert_eq!(local.natoms, assembled.natoms());
        assert_eq!(local.charge_groups.len(), 6);
        assert_eq!(local.exclusions.atom_count(), 11);
        for (i, atom) in top.atoms.iter().enumerate() {
            if atom.is_shell() {
                assert_eq!(local.inverse_mass[i], 0.0);
            } else {
                assert!((local.inverse_mass[i] * atom.mass - 1.0).abs() < 1e-12);
            }
            let expected: Vec<usize> = top.exclusions.excluded(i).collect();
            assert_eq!(local.exclusions.excluded(i), expected.as_slice());
        }
        assert_eq!(local.ilists, assembled.moltypes[0].ilists);
    }
}
