use super::generate::load_inputs;
use crate::cli::CheckArgs;
use crate::error::{CliError, Result};
use topogen::core::forcefield::params::ForceField;
use topogen::core::models::molecule::Molecule;
use tracing::info;

/// A problem found while checking inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub molecule: String,
    pub message: String,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let (store, molecules) = match &args.molecules {
        Some(path) => load_inputs(&args.forcefield, path)?,
        None => {
            let store = ForceField::load(&args.forcefield).map_err(|e| CliError::FileParsing {
                path: args.forcefield.clone(),
                source: e.into(),
            })?;
            (store, Vec::new())
        }
    };
    let declarations = store.declarations().map_err(|e| CliError::FileParsing {
        path: args.forcefield.clone(),
        source: e.into(),
    })?;
    let counts = store.counts();
    println!("Force field {}", args.forcefield.display());
    println!(
        "  bonds: {}  angles: {}  dihedrals: {}  impropers: {}  vdw: {}  combination rule: {}",
        declarations.bond,
        declarations.angle,
        declarations.proper_dihedral,
        declarations.improper_dihedral,
        declarations.vdw,
        declarations.combination_rule
    );
    println!(
        "  {} atom types ({} polarizable), {} bond, {} angle, {} dihedral, {} improper entries",
        counts.atom_types,
        counts.polarizable_types,
        counts.bonds,
        counts.angles,
        counts.dihedrals,
        counts.impropers
    );

    if args.molecules.is_none() {
        return Ok(());
    }
    let findings = check_molecules(&molecules, &store);
    info!(
        molecules = molecules.len(),
        findings = findings.len(),
        "Checked molecules against the force field."
    );
    println!("{} molecule(s) checked, {} problem(s) found", molecules.len(), findings.len());
    for finding in &findings {
        println!("  ✗ {}: {}", finding.molecule, finding.message);
    }
    if findings.is_empty() {
        Ok(())
    } else {
        Err(CliError::Argument(format!(
            "{} problem(s) found in {}",
            findings.len(),
            args.molecules.as_deref().map_or_else(String::new, |p| p.display().to_string())
        )))
    }
}

/// Checks that every molecule has a calculation with atoms, that all atom
/// types are known, and that bonds reference existing atoms.
pub fn check_molecules(molecules: &[Molecule], store: &ForceField) -> Vec<Finding> {
    let mut findings = Vec::new();
    for molecule in molecules {
        let mut report = |message: String| {
            findings.push(Finding {
                molecule: molecule.name.clone(),
                message,
            })
        };
        let Some(calculation) = molecule.calculation(None) else {
            report("no calculation".to_string());
            continue;
        };
        if calculation.atoms.is_empty() {
            report("calculation has no atoms".to_string());
        }
        for (i, atom) in calculation.atoms.iter().enumerate() {
            let type_name = store.translate_type(&atom.atom_type);
            if store.atom_type(type_name).is_none() {
                report(format!("atom {} has unknown type '{}'", i + 1, atom.atom_type));
            }
        }
        let n = calculation.atoms.len();
        for bond in &molecule.bonds {
            if bond.ai == 0 || bond.aj == 0 || bond.ai > n || bond.aj > n || bond.ai == bond.aj {
                report(format!("bond {}-{} is invalid", bond.ai, bond.aj));
            }
        }
    }
    findings
}
