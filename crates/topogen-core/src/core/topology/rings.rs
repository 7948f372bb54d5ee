use super::adjacency::Adjacency;

pub const MIN_RING_SIZE: usize = 4;
pub const DEFAULT_MAX_RING_SIZE: usize = 8;

/// Flags every atom lying on a ring of `MIN_RING_SIZE..=max_ring_size` atoms.
///
/// From each atom a depth-first walk follows simple paths of at most
/// `max_ring_size` atoms, tracked on an explicit stack with an on-path set. A
/// path whose last atom is bonded back to the start closes a ring of the path's
/// length, and all its atoms are marked.
pub fn detect_rings(adjacency: &Adjacency, max_ring_size: usize) -> Vec<bool> {
    let n = adjacency.len();
    let mut in_ring = vec![false; n];
    let mut on_path = vec![false; n];

    for start in 0..n {
        if adjacency.degree(start) < 2 {
            continue;
        }
        let mut path = vec![start];
        // Each frame holds the next neighbor position to try for the atom at that depth.
        let mut cursor = vec![0usize];
        on_path[start] = true;

        while let Some(&atom) = path.last() {
            let depth = path.len() - 1;
            let neighbors = adjacency.neighbors(atom);
            if cursor[depth] >= neighbors.len() {
                on_path[atom] = false;
                path.pop();
                cursor.pop();
                continue;
            }
            let next = neighbors[cursor[depth]];
            cursor[depth] += 1;

            if next == start {
                if path.len() >= MIN_RING_SIZE {
                    for &member in &path {
                        in_ring[member] = true;
                    }
                }
                continue;
            }
            if on_path[next] || path.len() >= max_ring_size {
                continue;
            }
            on_path[next] = true;
            path.push(next);
            cursor.push(0);
        }
    }
    in_ring
}
