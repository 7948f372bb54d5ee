use crate::core::forcefield::functional::FunctionalType;
use crate::core::models::atom::{Atom, ParticleKind};
use crate::core::models::interaction::Interaction;
use crate::core::models::topology::Topology;
use crate::core::topology::motifs::{self, GeometryTolerances, LinearMotif, PlanarMotif};
use crate::core::utils::geometry::PeriodicBox;
use nalgebra::Point3;
use tracing::{debug, instrument};

const DEGENERATE_LENGTH: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialOptions {
    pub use_vsites: bool,
    /// Distance in nm of an out-of-plane site from its planar centre.
    pub out_of_plane: f64,
    /// Force constant written as the first linear-angle coefficient.
    pub linear_force_constant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecialSummary {
    pub linear_angles: usize,
    pub planar_centers: usize,
    pub virtual_sites: usize,
}

/// Replaces harmonic angles at linear centres by linear-angle terms and,
/// when enabled, builds virtual sites for linear and planar motifs.
///
/// Motifs are classified from the current coordinates and stored on the
/// topology. Without virtual sites the atom count does not change.
#[instrument(skip_all, name = "special_interactions", fields(molecule = %topology.name))]
pub fn make_special_interactions(
    topology: &mut Topology,
    pbc: &PeriodicBox,
    tolerances: &GeometryTolerances,
    options: &SpecialOptions,
) -> SpecialSummary {
    let adjacency = super::bonded::bond_graph(topology);
    let positions = topology.positions();
    topology.motifs = motifs::classify(&adjacency, &positions, pbc, tolerances);

    let mut summary = SpecialSummary {
        planar_centers: topology.motifs.planar.len(),
        ..SpecialSummary::default()
    };

    let linear = topology.motifs.linear.clone();
    for motif in &linear {
        if add_linear_angle(topology, pbc, motif, options.linear_force_constant) {
            summary.linear_angles += 1;
        }
    }

    if options.use_vsites {
        for motif in &linear {
            if add_linear_site(topology, pbc, motif).is_some() {
                summary.virtual_sites += 1;
            }
        }
        let planar = topology.motifs.planar.clone();
        for motif in &planar {
            if add_planar_site(topology, pbc, motif, options.out_of_plane).is_some() {
                summary.virtual_sites += 1;
            }
        }
    }

    debug!(?summary, "Processed geometric motifs");
    summary
}

fn add_linear_angle(
    topology: &mut Topology,
    pbc: &PeriodicBox,
    motif: &LinearMotif,
    force_constant: f64,
) -> bool {
    let [a, b] = motif.ends;
    let c = motif.center;
    let xs = &topology.atoms;
    let d_ab = pbc.distance(&xs[a].position, &xs[b].position);
    if d_ab < DEGENERATE_LENGTH {
        debug!(center = c + 1, "Skipping degenerate linear motif");
        return false;
    }
    let d_cb = pbc.distance(&xs[c].position, &xs[b].position);
    topology.interactions.push(
        FunctionalType::LinearAngles,
        Interaction::with_params(&[a, c, b], &[force_constant, d_cb / d_ab]),
    );
    topology.interactions.retain(FunctionalType::Angles, |angle| {
        !(angle.atoms[1] == c
            && ((angle.atoms[0] == a && angle.atoms[2] == b)
                || (angle.atoms[0] == b && angle.atoms[2] == a)))
    });
    true
}

/// Appends a massless site derived from `parent`, excluded from everything
/// the parent excludes and from the parent itself.
fn append_site(topology: &mut Topology, parent: usize, position: Point3<f64>) -> usize {
    let type_name = format!("{}_vs", topology.type_name(parent));
    let name = format!("{}_vs", topology.atom_name(parent));
    let type_index = topology.add_atom_type(&type_name, ParticleKind::VirtualSite, 0);
    let type_id = topology.symbols.intern(&type_name);
    let name_id = topology.symbols.intern(&name);
    let mut site = Atom::massless_from(
        &topology.atoms[parent],
        name_id,
        type_id,
        type_index,
        ParticleKind::VirtualSite,
    );
    site.position = position;

    let inherited: Vec<usize> = topology.exclusions.excluded(parent).collect();
    let vs = topology.add_atom(site);
    topology.ring_atoms.push(false);
    for j in inherited {
        topology.exclusions.add(vs, j);
    }
    topology.exclusions.add(vs, parent);
    vs
}

fn add_linear_site(topology: &mut Topology, pbc: &PeriodicBox, motif: &LinearMotif) -> Option<usize> {
    let [a, b] = motif.ends;
    let c = motif.center;
    let (xa, xb, xc) = (
        topology.atoms[a].position,
        topology.atoms[b].position,
        topology.atoms[c].position,
    );
    let d_ab = pbc.distance(&xa, &xb);
    if d_ab < DEGENERATE_LENGTH {
        debug!(center = c + 1, "Skipping degenerate linear site");
        return None;
    }
    let coef = pbc.distance(&xa, &xc) / d_ab;
    let position = xa + pbc.displacement(&xa, &xb) * coef;
    let vs = append_site(topology, c, position);
    topology.interactions.push(
        FunctionalType::VirtualSite2,
        Interaction::with_params(&[vs, a, b], &[coef]),
    );
    Some(vs)
}

fn add_planar_site(
    topology: &mut Topology,
    pbc: &PeriodicBox,
    motif: &PlanarMotif,
    distance: f64,
) -> Option<usize> {
    let c = motif.center;
    let [n0, n1, _] = motif.substituents;
    let xc = topology.atoms[c].position;
    let r0 = pbc.displacement(&xc, &topology.atoms[n0].position);
    let r1 = pbc.displacement(&xc, &topology.atoms[n1].position);
    let normal = r0.cross(&r1);
    let length = normal.norm();
    if length < DEGENERATE_LENGTH {
        debug!(center = c + 1, "Skipping degenerate planar site");
        return None;
    }
    let coef = distance / length;
    let vs = append_site(topology, c, xc + normal * coef);
    topology.interactions.push(
        FunctionalType::VirtualSite3Out,
        Interaction::with_params(&[vs, c, n0, n1], &[0.0, 0.0, coef]),
    );
    Some(vs)
}
