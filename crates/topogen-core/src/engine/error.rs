use super::config::ConfigError;
use crate::core::forcefield::params::ForceFieldError;
use crate::core::forcefield::resolver::ResolveError;
use crate::core::utils::units::UnknownUnitError;
use std::fmt;
use thiserror::Error;

/// Outcome classification for one molecule.
///
/// Every per-molecule failure maps onto exactly one status, so a batch can
/// tally results without inspecting error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Ok,
    ZeroDipole,
    AtomTypes,
    AtomNumber,
    MolpropConversion,
    ChargeGeneration,
    LevelOfTheory,
    NoData,
    GenBonds,
    Parameters,
}

impl Status {
    pub fn message(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::ZeroDipole => "Zero Dipole",
            Status::AtomTypes => "Atom type problem",
            Status::AtomNumber => "Atom number problem",
            Status::MolpropConversion => "Converting from molprop",
            Status::ChargeGeneration => "Charge generation",
            Status::LevelOfTheory => "Requested level of theory missing",
            Status::NoData => "No experimental data",
            Status::GenBonds => "Generating bonds",
            Status::Parameters => "Missing force field parameters",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A failure confined to one molecule. A batch records it and moves on.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Molecule has no atoms")]
    NoAtoms,

    #[error("No calculation for level of theory '{}'", .0.as_deref().unwrap_or("<any>"))]
    LevelOfTheory(Option<String>),

    #[error("Atom {atom}: unknown element '{element}'")]
    UnknownElement { atom: usize, element: String },

    #[error("Atom {atom}: type '{atom_type}' is not defined in the force field")]
    UnknownAtomType { atom: usize, atom_type: String },

    #[error("Unit conversion failed: {0}")]
    Unit(#[from] UnknownUnitError),

    #[error("Molecule has no bonds")]
    NoBonds,

    #[error("Bond {ai}-{aj} is invalid for a molecule with {atoms} atoms")]
    InvalidBond { ai: usize, aj: usize, atoms: usize },

    #[error("Parameter resolution failed: {0}")]
    Parameters(#[from] ResolveError),

    #[error("Charge generation failed: {0}")]
    ChargeGeneration(String),

    #[error("Reference {0} is missing")]
    MissingReference(&'static str),
}

impl GenerationError {
    pub fn status(&self) -> Status {
        match self {
            GenerationError::NoAtoms | GenerationError::UnknownAtomType { .. } => Status::AtomTypes,
            GenerationError::LevelOfTheory(_) => Status::LevelOfTheory,
            GenerationError::UnknownElement { .. } => Status::AtomNumber,
            GenerationError::Unit(_) => Status::MolpropConversion,
            GenerationError::NoBonds | GenerationError::InvalidBond { .. } => Status::GenBonds,
            GenerationError::Parameters(_) => Status::Parameters,
            GenerationError::ChargeGeneration(_) => Status::ChargeGeneration,
            GenerationError::MissingReference("dipole") => Status::ZeroDipole,
            GenerationError::MissingReference(_) => Status::NoData,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Force field error: {0}")]
    ForceField(#[from] ForceFieldError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot add shells to '{molecule}': the topology already contains shells")]
    ShellOrdering { molecule: String },

    #[error("Generation failed for '{molecule}': {source}")]
    Generation {
        molecule: String,
        #[source]
        source: GenerationError,
    },
}

impl EngineError {
    /// Whether this error must abort a whole batch rather than one molecule.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::Generation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_messages_are_human_readable() {
        assert_eq!(Status::Ok.to_string(), "OK");
        assert_eq!(Status::GenBonds.to_string(), "Generating bonds");
        assert_eq!(
            Status::LevelOfTheory.to_string(),
            "Requested level of theory missing"
        );
    }

    #[test]
    fn generation_errors_map_to_statuses() {
        assert_eq!(GenerationError::NoBonds.status(), Status::GenBonds);
        assert_eq!(
            GenerationError::LevelOfTheory(Some("B3LYP".into())).status(),
            Status::LevelOfTheory
        );
        assert_eq!(
            GenerationError::Parameters(ResolveError::MissingParameters {
                kind: "bond",
                types: vec!["c3".into(), "zz".into()]
            })
            .status(),
            Status::Parameters
        );
        assert_eq!(
            GenerationError::MissingReference("dipole").status(),
            Status::ZeroDipole
        );
        assert_eq!(
            GenerationError::MissingReference("energy").status(),
            Status::NoData
        );
        assert_eq!(
            GenerationError::ChargeGeneration("singular".into()).status(),
            Status::ChargeGeneration
        );
    }

    #[test]
    fn every_failure_status_is_produced_by_some_error() {
        use std::collections::BTreeSet;
        let produced: BTreeSet<Status> = [
            GenerationError::NoAtoms,
            GenerationError::LevelOfTheory(None),
            GenerationError::UnknownElement {
                atom: 1,
                element: "Xx".into(),
            },
            GenerationError::Unit(UnknownUnitError("furlong".into())),
            GenerationError::NoBonds,
            GenerationError::Parameters(ResolveError::UnknownAtomType("zz".into())),
            GenerationError::ChargeGeneration("singular".into()),
            GenerationError::MissingReference("dipole"),
            GenerationError::MissingReference("energy"),
        ]
        .iter()
        .map(GenerationError::status)
        .collect();
        assert_eq!(
            produced,
            BTreeSet::from([
                Status::ZeroDipole,
                Status::AtomTypes,
                Status::AtomNumber,
                Status::MolpropConversion,
                Status::ChargeGeneration,
                Status::LevelOfTheory,
                Status::NoData,
                Status::GenBonds,
                Status::Parameters,
            ])
        );
    }

    #[test]
    fn only_per_molecule_errors_are_non_fatal() {
        let per_molecule = EngineError::Generation {
            molecule: "water".into(),
            source: GenerationError::NoBonds,
        };
        assert!(!per_molecule.is_fatal());
        let fatal = EngineError::ShellOrdering {
            molecule: "water".into(),
        };
        assert!(fatal.is_fatal());
    }
}
