use super::config::ChargeGroupScheme;
use crate::core::models::topology::Topology;
use tracing::debug;

/// Assigns every particle to a charge group and returns the number of groups.
///
/// Group indices are 0-based and non-decreasing along the atom list. With
/// [`ChargeGroupScheme::AtomWithShells`] a shell joins the group of the atom
/// before it; a leading shell, which cannot occur after shell insertion,
/// starts its own group.
pub fn generate_charge_groups(topology: &mut Topology, scheme: ChargeGroupScheme) -> usize {
    let mut groups = Vec::with_capacity(topology.atom_count());
    let mut current = 0usize;
    for (i, atom) in topology.atoms.iter().enumerate() {
        let group = match scheme {
            ChargeGroupScheme::Molecule => 0,
            ChargeGroupScheme::Atom => i,
            ChargeGroupScheme::AtomWithShells => {
                if i > 0 && !atom.is_shell() {
                    current += 1;
                }
                current
            }
        };
        groups.push(group);
    }
    let count = groups.last().map_or(0, |&g| g + 1);
    debug!(%scheme, count, "Generated charge groups");
    topology.charge_groups = groups;
    count
}
