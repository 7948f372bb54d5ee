use std::collections::BTreeSet;

/// Per-atom sets of atoms whose nonbonded interaction is suppressed.
///
/// The relation is kept symmetric by construction: every insertion and removal
/// touches both atoms. An atom never excludes itself here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    sets: Vec<BTreeSet<usize>>,
}

/// Compressed-row form of an exclusion relation.
///
/// Entries of atom `i` are `entries[index[i]..index[i + 1]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionBlock {
    pub index: Vec<usize>,
    pub entries: Vec<usize>,
}

impl ExclusionBlock {
    pub fn atom_count(&self) -> usize {
        self.index.len().saturating_sub(1)
    }

    pub fn excluded(&self, atom: usize) -> &[usize] {
        &self.entries[self.index[atom]..self.index[atom + 1]]
    }
}

impl Exclusions {
    pub fn new(n_atoms: usize) -> Self {
        Self {
            sets: vec![BTreeSet::new(); n_atoms],
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Grows the relation to cover `n_atoms` atoms; never shrinks.
    pub fn resize(&mut self, n_atoms: usize) {
        if n_atoms > self.sets.len() {
            self.sets.resize(n_atoms, BTreeSet::new());
        }
    }

    pub fn add(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.resize(i.max(j) + 1);
        self.sets[i].insert(j);
        self.sets[j].insert(i);
    }

    pub fn remove(&mut self, i: usize, j: usize) {
        if let Some(set) = self.sets.get_mut(i) {
            set.remove(&j);
        }
        if let Some(set) = self.sets.get_mut(j) {
            set.remove(&i);
        }
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.sets.get(i).is_some_and(|set| set.contains(&j))
    }

    pub fn excluded(&self, atom: usize) -> impl Iterator<Item = usize> + '_ {
        self.sets.get(atom).into_iter().flatten().copied()
    }

    pub fn count(&self, atom: usize) -> usize {
        self.sets.get(atom).map_or(0, BTreeSet::len)
    }

    /// Number of excluded pairs, each unordered pair counted once.
    pub fn pair_count(&self) -> usize {
        self.sets.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn is_symmetric(&self) -> bool {
        self.sets
            .iter()
            .enumerate()
            .all(|(i, set)| set.iter().all(|&j| self.contains(j, i)))
    }

    /// Builds the relation for a permuted atom arena of `n_atoms` atoms.
    pub fn renumbered(&self, permutation: &[usize], n_atoms: usize) -> Self {
        let mut renumbered = Self::new(n_atoms);
        for (i, set) in self.sets.iter().enumerate() {
            for &j in set {
                renumbered.add(permutation[i], permutation[j]);
            }
        }
        renumbered
    }

    pub fn to_block(&self) -> ExclusionBlock {
        let mut index = Vec::with_capacity(self.sets.len() + 1);
        let mut entries = Vec::with_capacity(self.sets.iter().map(BTreeSet::len).sum());
        index.push(0);
        for set in &self.sets {
            entries.extend(set.iter().copied());
            index.push(entries.len());
        }
        ExclusionBlock { index, entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_symmetric_and_ignores_self() {
        let mut excl = Exclusions::new(3);
        excl.add(0, 2);
        excl.add(1, 1);
        assert!(excl.contains(0, 2));
        assert!(excl.contains(2, 0));
        assert!(!excl.contains(1, 1));
        assert!(excl.is_symmetric());
        assert_eq!(excl.pair_count(), 1);
    }

    #[test]
    fn add_beyond_current_size_grows_the_relation() {
        let mut excl = Exclusions::new(1);
        excl.add(0, 4);
        assert_eq!(excl.len(), 5);
        assert_eq!(excl.excluded(4).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn remove_clears_both_directions() {
        let mut excl = Exclusions::new(2);
        excl.add(0, 1);
        excl.remove(1, 0);
        assert!(!excl.contains(0, 1));
        assert!(!excl.contains(1, 0));
    }

    #[test]
    fn renumbered_maps_every_pair() {
        let mut excl = Exclusions::new(2);
        excl.add(0, 1);
        let moved = excl.renumbered(&[0, 2], 3);
        assert_eq!(moved.len(), 3);
        assert!(moved.contains(0, 2));
        assert!(!moved.contains(0, 1));
    }

    #[test]
    fn to_block_produces_sorted_rows() {
        let mut excl = Exclusions::new(3);
        excl.add(0, 2);
        excl.add(0, 1);
        let block = excl.to_block();
        assert_eq!(block.index, vec![0, 2, 3, 4]);
        assert_eq!(block.excluded(0), &[1, 2]);
        assert_eq!(block.excluded(1), &[0]);
        assert_eq!(block.excluded(2), &[0]);
        assert_eq!(block.atom_count(), 3);
    }
}
