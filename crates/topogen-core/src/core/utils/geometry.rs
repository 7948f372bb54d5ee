use nalgebra::{Point3, Vector3};

/// Periodic boundary conditions applied to displacement vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PeriodicBox {
    #[default]
    None,
    /// Orthorhombic box with the given edge lengths in nm.
    Rectangular(Vector3<f64>),
}

impl PeriodicBox {
    /// Minimum-image displacement from `from` to `to`.
    pub fn displacement(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
        let mut d = to - from;
        if let PeriodicBox::Rectangular(edges) = self {
            for k in 0..3 {
                if edges[k] > 0.0 {
                    d[k] -= edges[k] * (d[k] / edges[k]).round();
                }
            }
        }
        d
    }

    pub fn distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.displacement(a, b).norm()
    }
}

/// Angle a-center-b in degrees.
pub fn bond_angle(
    pbc: &PeriodicBox,
    a: &Point3<f64>,
    center: &Point3<f64>,
    b: &Point3<f64>,
) -> f64 {
    let u = pbc.displacement(center, a);
    let v = pbc.displacement(center, b);
    u.angle(&v).to_degrees()
}

/// Signed dihedral angle i-j-k-l in degrees, in (-180, 180].
///
/// A cis arrangement gives 0 and a trans arrangement gives 180.
pub fn dihedral_angle(
    pbc: &PeriodicBox,
    i: &Point3<f64>,
    j: &Point3<f64>,
    k: &Point3<f64>,
    l: &Point3<f64>,
) -> f64 {
    let b1 = pbc.displacement(i, j);
    let b2 = pbc.displacement(j, k);
    let b3 = pbc.displacement(k, l);
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    y.atan2(x).to_degrees()
}
