use super::ids::SymbolId;
use nalgebra::Point3;
use std::str::FromStr;

/// Classifies the particles that make up a topology.
///
/// Real atoms carry mass and come from the input structure. Virtual sites and
/// shells are massless particles introduced while special interactions are
/// generated; their positions are derived from real atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ParticleKind {
    /// A nucleus-centred atom with mass.
    #[default]
    Atom,
    /// A massless site whose position is constructed from other atoms.
    VirtualSite,
    /// A massless Drude-like particle attached to a polarizable atom.
    Shell,
}

impl ParticleKind {
    /// Single-letter code used in topology listings.
    pub fn code(self) -> char {
        match self {
            ParticleKind::Atom => 'A',
            ParticleKind::VirtualSite => 'V',
            ParticleKind::Shell => 'S',
        }
    }
}

impl FromStr for ParticleKind {
    type Err = ();

    /// Parses a particle kind, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `()` if the string does not name a known particle kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "atom" | "a" => Ok(ParticleKind::Atom),
            "vsite" | "virtual-site" | "virtual_site" | "v" => Ok(ParticleKind::VirtualSite),
            "shell" | "s" => Ok(ParticleKind::Shell),
            _ => Err(()),
        }
    }
}

/// Represents one particle of a molecular topology.
///
/// Names are stored as interned handles into the owning topology's
/// [`SymbolTable`](super::symbols::SymbolTable). The index of an atom is its
/// position in the topology's atom arena, so atoms never store it themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The atom name (e.g., "C1", "H3").
    pub name: SymbolId,
    /// The force-field atom type of state A.
    pub type_name: SymbolId,
    /// The force-field atom type of state B.
    pub type_name_b: SymbolId,
    /// The residue the atom belongs to.
    pub residue: SymbolId,
    /// Index into the topology's atom-type registry.
    pub type_index: usize,
    /// Atomic number; zero for virtual sites and shells.
    pub atomic_number: u8,
    /// Mass of state A in atomic mass units.
    pub mass: f64,
    /// Mass of state B in atomic mass units.
    pub mass_b: f64,
    /// Partial charge of state A in elementary charges.
    pub charge: f64,
    /// Partial charge of state B in elementary charges.
    pub charge_b: f64,
    /// What kind of particle this is.
    pub kind: ParticleKind,
    /// Cartesian position in nm.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a real atom with zero charge.
    ///
    /// # Arguments
    ///
    /// * `name` - The interned atom name.
    /// * `type_name` - The interned force-field type, used for both states.
    /// * `residue` - The interned residue name.
    /// * `type_index` - Index into the atom-type registry.
    /// * `atomic_number` - The element's atomic number.
    /// * `mass` - The mass, used for both states.
    /// * `position` - The position in nm.
    pub fn new(
        name: SymbolId,
        type_name: SymbolId,
        residue: SymbolId,
        type_index: usize,
        atomic_number: u8,
        mass: f64,
        position: Point3<f64>,
    ) -> Self {
        Self {
            name,
            type_name,
            type_name_b: type_name,
            residue,
            type_index,
            atomic_number,
            mass,
            mass_b: mass,
            charge: 0.0,
            charge_b: 0.0,
            kind: ParticleKind::Atom,
            position,
        }
    }

    /// Creates a massless, uncharged particle derived from `parent`.
    ///
    /// The new particle shares the parent's residue and position.
    pub fn massless_from(
        parent: &Atom,
        name: SymbolId,
        type_name: SymbolId,
        type_index: usize,
        kind: ParticleKind,
    ) -> Self {
        Self {
            name,
            type_name,
            type_name_b: type_name,
            residue: parent.residue,
            type_index,
            atomic_number: 0,
            mass: 0.0,
            mass_b: 0.0,
            charge: 0.0,
            charge_b: 0.0,
            kind,
            position: parent.position,
        }
    }

    pub fn set_charge(&mut self, q: f64) {
        self.charge = q;
        self.charge_b = q;
    }

    pub fn is_shell(&self) -> bool {
        self.kind == ParticleKind::Shell
    }

    pub fn is_real(&self) -> bool {
        self.kind == ParticleKind::Atom
    }
}

/// An entry of a topology's atom-type registry.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomType {
    pub name: SymbolId,
    pub kind: ParticleKind,
    pub atomic_number: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::symbols::SymbolTable;

    fn sample_atom(table: &mut SymbolTable) -> Atom {
        let name = table.intern("C1");
        let ty = table.intern("c3");
        let res = table.intern("MOL");
        Atom::new(name, ty, res, 0, 6, 12.011, Point3::new(0.1, 0.2, 0.3))
    }

    #[test]
    fn new_atom_is_real_and_neutral() {
        let mut table = SymbolTable::new();
        let atom = sample_atom(&mut table);
        assert_eq!(atom.kind, ParticleKind::Atom);
        assert!(atom.is_real());
        assert_eq!(atom.charge, 0.0);
        assert_eq!(atom.mass, atom.mass_b);
        assert_eq!(atom.type_name, atom.type_name_b);
    }

    #[test]
    fn massless_particle_copies_parent_position_and_residue() {
        let mut table = SymbolTable::new();
        let parent = sample_atom(&mut table);
        let shell_name = table.intern("C1s");
        let shell_type = table.intern("c3s");
        let shell = Atom::massless_from(&parent, shell_name, shell_type, 1, ParticleKind::Shell);
        assert!(shell.is_shell());
        assert_eq!(shell.mass, 0.0);
        assert_eq!(shell.charge, 0.0);
        assert_eq!(shell.atomic_number, 0);
        assert_eq!(shell.position, parent.position);
        assert_eq!(shell.residue, parent.residue);
    }

    #[test]
    fn set_charge_updates_both_states() {
        let mut table = SymbolTable::new();
        let mut atom = sample_atom(&mut table);
        atom.set_charge(-0.4);
        assert_eq!(atom.charge, -0.4);
        assert_eq!(atom.charge_b, -0.4);
    }

    #[test]
    fn particle_kind_from_str_is_case_insensitive() {
        assert_eq!("Shell".parse::<ParticleKind>(), Ok(ParticleKind::Shell));
        assert_eq!("VSITE".parse::<ParticleKind>(), Ok(ParticleKind::VirtualSite));
        assert_eq!("atom".parse::<ParticleKind>(), Ok(ParticleKind::Atom));
        assert!("ghost".parse::<ParticleKind>().is_err());
    }

    #[test]
    fn particle_kind_codes_are_distinct() {
        assert_eq!(ParticleKind::Atom.code(), 'A');
        assert_eq!(ParticleKind::VirtualSite.code(), 'V');
        assert_eq!(ParticleKind::Shell.code(), 'S');
    }
}
