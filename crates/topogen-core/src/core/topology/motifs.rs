use super::adjacency::Adjacency;
use crate::core::utils::geometry::{PeriodicBox, bond_angle, dihedral_angle};
use nalgebra::Point3;

pub const DEFAULT_LINEAR_TOLERANCE: f64 = 5.0;
pub const DEFAULT_PLANAR_TOLERANCE: f64 = 5.0;

/// A two-coordinated atom whose neighbors sit on a straight line through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearMotif {
    pub center: usize,
    pub ends: [usize; 2],
}

/// A three-coordinated atom lying in the plane of its substituents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanarMotif {
    pub center: usize,
    pub substituents: [usize; 3],
}

/// Angular tolerances, in degrees, for motif classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryTolerances {
    pub linear_degrees: f64,
    pub planar_degrees: f64,
}

impl Default for GeometryTolerances {
    fn default() -> Self {
        Self {
            linear_degrees: DEFAULT_LINEAR_TOLERANCE,
            planar_degrees: DEFAULT_PLANAR_TOLERANCE,
        }
    }
}

/// Snapshot of the linear and planar centres of a structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometricMotifs {
    pub linear: Vec<LinearMotif>,
    pub planar: Vec<PlanarMotif>,
}

impl GeometricMotifs {
    pub fn is_empty(&self) -> bool {
        self.linear.is_empty() && self.planar.is_empty()
    }

    pub fn renumber(&mut self, permutation: &[usize]) {
        for motif in &mut self.linear {
            motif.center = permutation[motif.center];
            motif.ends = motif.ends.map(|a| permutation[a]);
        }
        for motif in &mut self.planar {
            motif.center = permutation[motif.center];
            motif.substituents = motif.substituents.map(|a| permutation[a]);
        }
    }
}

/// True when the angle a-center-b is within `tolerance` degrees of 180.
pub fn is_linear(
    pbc: &PeriodicBox,
    a: &Point3<f64>,
    center: &Point3<f64>,
    b: &Point3<f64>,
    tolerance: f64,
) -> bool {
    (180.0 - bond_angle(pbc, a, center, b)).abs() < tolerance
}

/// True when `center` lies within `tolerance` degrees of the plane of its
/// three substituents, measured by the center-n0-n1-n2 dihedral.
pub fn is_planar(
    pbc: &PeriodicBox,
    center: &Point3<f64>,
    substituents: [&Point3<f64>; 3],
    tolerance: f64,
) -> bool {
    let phi = dihedral_angle(pbc, center, substituents[0], substituents[1], substituents[2]).abs();
    phi < tolerance || (180.0 - phi) < tolerance
}

/// Classifies every two- and three-coordinated atom of a structure.
pub fn classify(
    adjacency: &Adjacency,
    positions: &[Point3<f64>],
    pbc: &PeriodicBox,
    tolerances: &GeometryTolerances,
) -> GeometricMotifs {
    let mut motifs = GeometricMotifs::default();
    for (center, position) in positions.iter().enumerate() {
        match *adjacency.neighbors(center) {
            [a, b] => {
                if is_linear(pbc, &positions[a], position, &positions[b], tolerances.linear_degrees) {
                    motifs.linear.push(LinearMotif {
                        center,
                        ends: [a, b],
                    });
                }
            }
            [a, b, c] => {
                let subs = [&positions[a], &positions[b], &positions[c]];
                if is_planar(pbc, position, subs, tolerances.planar_degrees) {
                    motifs.planar.push(PlanarMotif {
                        center,
                        substituents: [a, b, c],
                    });
                }
            }
            _ => {}
        }
    }
    motifs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_neighbors_are_linear() {
        let pbc = PeriodicBox::None;
        assert!(is_linear(
            &pbc,
            &Point3::new(-1.0, 0.0, 0.0),
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            DEFAULT_LINEAR_TOLERANCE
        ));
    }

    #[test]
    fn right_angle_is_not_linear() {
        let pbc = PeriodicBox::None;
        assert!(!is_linear(
            &pbc,
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::origin(),
            &Point3::new(0.0, 1.0, 0.0),
            DEFAULT_LINEAR_TOLERANCE
        ));
    }

    #[test]
    fn slightly_bent_angle_within_tolerance_is_linear() {
        let pbc = PeriodicBox::None;
        let bent = Point3::new(1.0, 3.0_f64.to_radians().tan(), 0.0);
        assert!(is_linear(
            &pbc,
            &Point3::new(-1.0, 0.0, 0.0),
            &Point3::origin(),
            &bent,
            DEFAULT_LINEAR_TOLERANCE
        ));
    }

    #[test]
    fn trigonal_planar_center_is_planar_and_pyramid_is_not() {
        let pbc = PeriodicBox::None;
        let s0 = Point3::new(1.0, 0.0, 0.0);
        let s1 = Point3::new(-0.5, 0.866, 0.0);
        let s2 = Point3::new(-0.5, -0.866, 0.0);
        assert!(is_planar(&pbc, &Point3::origin(), [&s0, &s1, &s2], 5.0));
        let apex = Point3::new(0.0, 0.0, 0.4);
        assert!(!is_planar(&pbc, &apex, [&s0, &s1, &s2], 5.0));
    }

    #[test]
    fn classify_finds_linear_and_planar_centres() {
        // 0-1-2 linear; 3 is planar with substituents 4, 5, 6.
        let positions = vec![
            Point3::new(-0.12, 0.0, 0.0),
            Point3::origin(),
            Point3::new(0.12, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.1, 1.0, 0.0),
            Point3::new(0.95, 1.0866, 0.0),
            Point3::new(0.95, 0.9134, 0.0),
        ];
        let adj = Adjacency::from_pairs(7, [(0, 1), (1, 2), (3, 4), (3, 5), (3, 6)]);
        let motifs = classify(&adj, &positions, &PeriodicBox::None, &GeometryTolerances::default());
        assert_eq!(
            motifs.linear,
            vec![LinearMotif {
                center: 1,
                ends: [0, 2]
            }]
        );
        assert_eq!(motifs.planar.len(), 1);
        assert_eq!(motifs.planar[0].center, 3);
        assert_eq!(motifs.planar[0].substituents, [4, 5, 6]);
    }

    #[test]
    fn renumber_rewrites_all_motif_atoms() {
        let mut motifs = GeometricMotifs {
            linear: vec![LinearMotif {
                center: 1,
                ends: [0, 2],
            }],
            planar: vec![],
        };
        motifs.renumber(&[0, 2, 4]);
        assert_eq!(motifs.linear[0].center, 2);
        assert_eq!(motifs.linear[0].ends, [0, 4]);
    }
}
