use crate::core::models::topology::Bond;

/// Neighbor lists derived from a bond list.
///
/// Neighbors of an atom appear in the order their bonds were listed, which
/// keeps every downstream enumeration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    neighbors: Vec<Vec<usize>>,
}

impl Adjacency {
    pub fn from_bonds(n_atoms: usize, bonds: &[Bond]) -> Self {
        Self::from_pairs(n_atoms, bonds.iter().map(|b| (b.atom1, b.atom2)))
    }

    /// Builds neighbor lists from atom pairs; self-pairs and repeated pairs are ignored.
    pub fn from_pairs<I>(n_atoms: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut neighbors = vec![Vec::new(); n_atoms];
        for (i, j) in pairs {
            if i == j {
                continue;
            }
            let needed = i.max(j) + 1;
            if neighbors.len() < needed {
                neighbors.resize(needed, Vec::new());
            }
            if !neighbors[i].contains(&j) {
                neighbors[i].push(j);
                neighbors[j].push(i);
            }
        }
        Self { neighbors }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn neighbors(&self, atom: usize) -> &[usize] {
        self.neighbors.get(atom).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.neighbors(atom).len()
    }

    pub fn are_bonded(&self, i: usize, j: usize) -> bool {
        self.neighbors(i).contains(&j)
    }
}

/// Atoms grouped by shortest-path bond distance from each atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborTable {
    depth: usize,
    shells: Vec<Vec<Vec<usize>>>,
}

impl NeighborTable {
    /// Breadth-first expansion of every atom out to `depth` bonds.
    pub fn new(adjacency: &Adjacency, depth: usize) -> Self {
        let n = adjacency.len();
        let mut shells = Vec::with_capacity(n);
        let mut seen = vec![usize::MAX; n];
        for start in 0..n {
            let mut layers: Vec<Vec<usize>> = vec![vec![start]];
            seen[start] = start;
            for _ in 0..depth {
                let mut next = Vec::new();
                if let Some(frontier) = layers.last() {
                    for &atom in frontier {
                        for &nb in adjacency.neighbors(atom) {
                            if seen[nb] != start {
                                seen[nb] = start;
                                next.push(nb);
                            }
                        }
                    }
                }
                next.sort_unstable();
                layers.push(next);
            }
            shells.push(layers);
        }
        Self { depth, shells }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Atoms exactly `distance` bonds away from `atom`, sorted by index.
    pub fn at(&self, atom: usize, distance: usize) -> &[usize] {
        self.shells
            .get(atom)
            .and_then(|layers| layers.get(distance))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Shortest bond distance between two atoms, if within the table's depth.
    pub fn distance(&self, i: usize, j: usize) -> Option<usize> {
        (0..=self.depth).find(|&n| self.at(i, n).binary_search(&j).is_ok())
    }
}
