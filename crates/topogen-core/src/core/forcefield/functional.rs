use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of coefficient slots carried by any interaction.
pub const MAX_FORCE_PARAM: usize = 6;

/// Broad family a functional type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionClass {
    Bond,
    Pair,
    Angle,
    ProperDihedral,
    ImproperDihedral,
    Polarization,
    VirtualSite,
    Nonbonded,
}

/// The closed set of interaction forms the engine knows how to build.
///
/// Each variant fixes how many atoms an interaction of that form references and
/// how many coefficient slots it uses. The declaration order is the order in
/// which interaction lists are assembled and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionalType {
    Bonds,
    G96Bonds,
    Morse,
    CubicBonds,
    LennardJones14,
    Angles,
    G96Angles,
    UreyBradley,
    LinearAngles,
    ProperDihedrals,
    RyckaertBellemans,
    ImproperDihedrals,
    PeriodicImpropers,
    Polarization,
    VirtualSite2,
    VirtualSite3,
    VirtualSite3Fd,
    VirtualSite3Fad,
    VirtualSite3Out,
    VirtualSite4Fdn,
    LennardJones,
    Buckingham,
}

impl FunctionalType {
    pub const ALL: [FunctionalType; 22] = [
        FunctionalType::Bonds,
        FunctionalType::G96Bonds,
        FunctionalType::Morse,
        FunctionalType::CubicBonds,
        FunctionalType::LennardJones14,
        FunctionalType::Angles,
        FunctionalType::G96Angles,
        FunctionalType::UreyBradley,
        FunctionalType::LinearAngles,
        FunctionalType::ProperDihedrals,
        FunctionalType::RyckaertBellemans,
        FunctionalType::ImproperDihedrals,
        FunctionalType::PeriodicImpropers,
        FunctionalType::Polarization,
        FunctionalType::VirtualSite2,
        FunctionalType::VirtualSite3,
        FunctionalType::VirtualSite3Fd,
        FunctionalType::VirtualSite3Fad,
        FunctionalType::VirtualSite3Out,
        FunctionalType::VirtualSite4Fdn,
        FunctionalType::LennardJones,
        FunctionalType::Buckingham,
    ];

    /// Number of atoms an interaction of this type references.
    pub fn nratoms(self) -> usize {
        match self {
            FunctionalType::Bonds
            | FunctionalType::G96Bonds
            | FunctionalType::Morse
            | FunctionalType::CubicBonds
            | FunctionalType::LennardJones14
            | FunctionalType::Polarization
            | FunctionalType::LennardJones
            | FunctionalType::Buckingham => 2,
            FunctionalType::Angles
            | FunctionalType::G96Angles
            | FunctionalType::UreyBradley
            | FunctionalType::LinearAngles
            | FunctionalType::VirtualSite2 => 3,
            FunctionalType::ProperDihedrals
            | FunctionalType::RyckaertBellemans
            | FunctionalType::ImproperDihedrals
            | FunctionalType::PeriodicImpropers
            | FunctionalType::VirtualSite3
            | FunctionalType::VirtualSite3Fd
            | FunctionalType::VirtualSite3Fad
            | FunctionalType::VirtualSite3Out => 4,
            FunctionalType::VirtualSite4Fdn => 5,
        }
    }

    /// Number of coefficient slots used by this type.
    pub fn nparams(self) -> usize {
        match self {
            FunctionalType::Polarization | FunctionalType::VirtualSite2 => 1,
            FunctionalType::Bonds
            | FunctionalType::G96Bonds
            | FunctionalType::LennardJones14
            | FunctionalType::Angles
            | FunctionalType::G96Angles
            | FunctionalType::LinearAngles
            | FunctionalType::ImproperDihedrals
            | FunctionalType::VirtualSite3
            | FunctionalType::VirtualSite3Fd
            | FunctionalType::VirtualSite3Fad
            | FunctionalType::LennardJones => 2,
            FunctionalType::Morse
            | FunctionalType::CubicBonds
            | FunctionalType::ProperDihedrals
            | FunctionalType::PeriodicImpropers
            | FunctionalType::VirtualSite3Out
            | FunctionalType::VirtualSite4Fdn
            | FunctionalType::Buckingham => 3,
            FunctionalType::UreyBradley => 4,
            FunctionalType::RyckaertBellemans => 6,
        }
    }

    pub fn class(self) -> InteractionClass {
        match self {
            FunctionalType::Bonds
            | FunctionalType::G96Bonds
            | FunctionalType::Morse
            | FunctionalType::CubicBonds => InteractionClass::Bond,
            FunctionalType::LennardJones14 => InteractionClass::Pair,
            FunctionalType::Angles
            | FunctionalType::G96Angles
            | FunctionalType::UreyBradley
            | FunctionalType::LinearAngles => InteractionClass::Angle,
            FunctionalType::ProperDihedrals | FunctionalType::RyckaertBellemans => {
                InteractionClass::ProperDihedral
            }
            FunctionalType::ImproperDihedrals | FunctionalType::PeriodicImpropers => {
                InteractionClass::ImproperDihedral
            }
            FunctionalType::Polarization => InteractionClass::Polarization,
            FunctionalType::VirtualSite2
            | FunctionalType::VirtualSite3
            | FunctionalType::VirtualSite3Fd
            | FunctionalType::VirtualSite3Fad
            | FunctionalType::VirtualSite3Out
            | FunctionalType::VirtualSite4Fdn => InteractionClass::VirtualSite,
            FunctionalType::LennardJones | FunctionalType::Buckingham => {
                InteractionClass::Nonbonded
            }
        }
    }

    /// Section header under which interactions of this type are written.
    pub fn directive(self) -> &'static str {
        match self.class() {
            InteractionClass::Bond => "bonds",
            InteractionClass::Pair => "pairs",
            InteractionClass::Angle => "angles",
            InteractionClass::ProperDihedral | InteractionClass::ImproperDihedral => "dihedrals",
            InteractionClass::Polarization => "polarization",
            InteractionClass::VirtualSite => match self.nratoms() {
                3 => "virtual_sites2",
                4 => "virtual_sites3",
                _ => "virtual_sites4",
            },
            InteractionClass::Nonbonded => "nonbond_params",
        }
    }

    /// Function number written after the atom columns within a directive.
    pub fn directive_index(self) -> u8 {
        match self {
            FunctionalType::Bonds
            | FunctionalType::LennardJones14
            | FunctionalType::Angles
            | FunctionalType::ProperDihedrals
            | FunctionalType::Polarization
            | FunctionalType::VirtualSite2
            | FunctionalType::VirtualSite3
            | FunctionalType::LennardJones => 1,
            FunctionalType::G96Bonds
            | FunctionalType::G96Angles
            | FunctionalType::ImproperDihedrals
            | FunctionalType::VirtualSite3Fd
            | FunctionalType::VirtualSite4Fdn
            | FunctionalType::Buckingham => 2,
            FunctionalType::Morse
            | FunctionalType::RyckaertBellemans
            | FunctionalType::VirtualSite3Fad => 3,
            FunctionalType::CubicBonds
            | FunctionalType::PeriodicImpropers
            | FunctionalType::VirtualSite3Out => 4,
            FunctionalType::UreyBradley => 5,
            FunctionalType::LinearAngles => 9,
        }
    }

    /// The name used for this type in force-field files.
    pub fn name(self) -> &'static str {
        match self {
            FunctionalType::Bonds => "BONDS",
            FunctionalType::G96Bonds => "G96BONDS",
            FunctionalType::Morse => "MORSE",
            FunctionalType::CubicBonds => "CUBICBONDS",
            FunctionalType::LennardJones14 => "LJ14",
            FunctionalType::Angles => "ANGLES",
            FunctionalType::G96Angles => "G96ANGLES",
            FunctionalType::UreyBradley => "UREY_BRADLEY",
            FunctionalType::LinearAngles => "LINEAR_ANGLES",
            FunctionalType::ProperDihedrals => "PDIHS",
            FunctionalType::RyckaertBellemans => "RBDIHS",
            FunctionalType::ImproperDihedrals => "IDIHS",
            FunctionalType::PeriodicImpropers => "PIDIHS",
            FunctionalType::Polarization => "POLARIZATION",
            FunctionalType::VirtualSite2 => "VSITE2",
            FunctionalType::VirtualSite3 => "VSITE3",
            FunctionalType::VirtualSite3Fd => "VSITE3FD",
            FunctionalType::VirtualSite3Fad => "VSITE3FAD",
            FunctionalType::VirtualSite3Out => "VSITE3OUT",
            FunctionalType::VirtualSite4Fdn => "VSITE4FDN",
            FunctionalType::LennardJones => "LJ",
            FunctionalType::Buckingham => "BHAM",
        }
    }
}

impl fmt::Display for FunctionalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown functional type '{0}'")]
pub struct ParseFunctionalTypeError(pub String);

impl FromStr for FunctionalType {
    type Err = ParseFunctionalTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        FunctionalType::ALL
            .iter()
            .copied()
            .find(|ft| ft.name() == upper)
            .or(match upper.as_str() {
                "LINEAR_ANGLE" => Some(FunctionalType::LinearAngles),
                "PDIH" => Some(FunctionalType::ProperDihedrals),
                "IDIH" => Some(FunctionalType::ImproperDihedrals),
                "LENNARD_JONES" => Some(FunctionalType::LennardJones),
                "BUCKINGHAM" => Some(FunctionalType::Buckingham),
                _ => None,
            })
            .ok_or_else(|| ParseFunctionalTypeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_fits_in_the_coefficient_array() {
        for ft in FunctionalType::ALL {
            assert!(ft.nparams() <= MAX_FORCE_PARAM, "{ft} uses too many slots");
            assert!((2..=5).contains(&ft.nratoms()));
        }
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for ft in FunctionalType::ALL {
            assert_eq!(ft.name().parse::<FunctionalType>(), Ok(ft));
        }
    }

    #[test]
    fn from_str_accepts_lowercase_and_aliases() {
        assert_eq!("morse".parse::<FunctionalType>(), Ok(FunctionalType::Morse));
        assert_eq!(
            "linear_angle".parse::<FunctionalType>(),
            Ok(FunctionalType::LinearAngles)
        );
        assert!("SPRING".parse::<FunctionalType>().is_err());
    }

    #[test]
    fn directives_group_related_types() {
        assert_eq!(FunctionalType::Morse.directive(), "bonds");
        assert_eq!(FunctionalType::ImproperDihedrals.directive(), "dihedrals");
        assert_eq!(FunctionalType::ProperDihedrals.directive(), "dihedrals");
        assert_eq!(FunctionalType::VirtualSite2.directive(), "virtual_sites2");
        assert_eq!(FunctionalType::VirtualSite3Out.directive(), "virtual_sites3");
        assert_eq!(FunctionalType::VirtualSite4Fdn.directive(), "virtual_sites4");
    }

    #[test]
    fn directive_indices_distinguish_forms_within_a_section() {
        assert_eq!(FunctionalType::Bonds.directive_index(), 1);
        assert_eq!(FunctionalType::Morse.directive_index(), 3);
        assert_eq!(FunctionalType::ImproperDihedrals.directive_index(), 2);
        assert_eq!(FunctionalType::VirtualSite3Out.directive_index(), 4);
    }

    #[test]
    fn declaration_order_puts_bonds_before_angles_before_dihedrals() {
        assert!(FunctionalType::Morse < FunctionalType::Angles);
        assert!(FunctionalType::Angles < FunctionalType::ProperDihedrals);
        assert!(FunctionalType::ImproperDihedrals < FunctionalType::Polarization);
    }
}
