use super::traits::MoleculeSource;
use crate::core::models::molecule::{EspPoint, Molecule};
use serde::Deserialize;
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MoleculeFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Duplicate molecule name '{0}'")]
    DuplicateName(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MoleculeDocument {
    #[serde(default)]
    molecule: Vec<Molecule>,
}

/// TOML molecule collection: one `[[molecule]]` table per molecule.
pub struct MoleculeFile;

impl MoleculeSource for MoleculeFile {
    type Error = MoleculeFileError;

    fn read_from(
        reader: &mut impl BufRead,
        base_dir: Option<&Path>,
    ) -> Result<Vec<Molecule>, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let mut document: MoleculeDocument = toml::from_str(&content)?;

        let mut seen = std::collections::HashSet::new();
        for molecule in &document.molecule {
            if !seen.insert(molecule.name.as_str()) {
                return Err(MoleculeFileError::DuplicateName(molecule.name.clone()));
            }
        }

        for molecule in &mut document.molecule {
            for calculation in &mut molecule.calculations {
                let Some(relative) = &calculation.potential_file else {
                    continue;
                };
                let path = match base_dir {
                    Some(dir) if relative.is_relative() => dir.join(relative),
                    _ => relative.clone(),
                };
                let points = read_esp_csv(&path)?;
                debug!(
                    molecule = %molecule.name,
                    points = points.len(),
                    "Loaded potential samples from {}",
                    path.display()
                );
                calculation.potential.extend(points);
            }
        }
        Ok(document.molecule)
    }
}

/// Reads potential samples from a CSV file with `x,y,z,v` headers.
pub fn read_esp_csv(path: &Path) -> Result<Vec<EspPoint>, MoleculeFileError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| MoleculeFileError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    reader
        .deserialize::<EspPoint>()
        .map(|record| {
            record.map_err(|e| MoleculeFileError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    const TWO_MOLECULES: &str = r#"
        [[molecule]]
        name = "hydrogen"
        bonds = [{ ai = 1, aj = 2 }]

        [[molecule.calculation]]
        level-of-theory = "HF/STO-3G"
        atoms = [
            { element = "H", type = "h1", position = [0.0, 0.0, 0.0] },
            { element = "H", type = "h1", position = [0.74, 0.0, 0.0] },
        ]

        [[molecule]]
        name = "helium"

        [[molecule.calculation]]
        level-of-theory = "HF/STO-3G"
        atoms = [{ element = "He", type = "he", position = [0.0, 0.0, 0.0] }]
    "#;

    #[test]
    fn read_from_parses_every_molecule_in_order() {
        let mut reader = Cursor::new(TWO_MOLECULES);
        let molecules = MoleculeFile::read_from(&mut reader, None).unwrap();
        assert_eq!(molecules.len(), 2);
        assert_eq!(molecules[0].name, "hydrogen");
        assert_eq!(molecules[0].bonds.len(), 1);
        assert_eq!(molecules[1].calculations[0].atoms[0].element, "He");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let content = "[[molecule]]\nname = \"a\"\n[[molecule]]\nname = \"a\"\n";
        let mut reader = Cursor::new(content);
        assert!(matches!(
            MoleculeFile::read_from(&mut reader, None),
            Err(MoleculeFileError::DuplicateName(name)) if name == "a"
        ));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let mut reader = Cursor::new("[[molecule]\nname=");
        assert!(matches!(
            MoleculeFile::read_from(&mut reader, None),
            Err(MoleculeFileError::Toml(_))
        ));
    }

    #[test]
    fn potential_file_is_resolved_relative_to_the_molecule_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("esp.csv"), "x,y,z,v\n1.0,0.0,0.0,0.01\n0.0,2.0,0.0,0.02\n")
            .unwrap();
        let path = dir.path().join("mols.toml");
        fs::write(
            &path,
            r#"
            [[molecule]]
            name = "ion"
            [[molecule.calculation]]
            level-of-theory = "HF"
            potential-file = "esp.csv"
            atoms = [{ element = "Na", type = "na", position = [0.0, 0.0, 0.0] }]
            "#,
        )
        .unwrap();
        let molecules = MoleculeFile::read_from_path(&path).unwrap();
        let potential = &molecules[0].calculations[0].potential;
        assert_eq!(potential.len(), 2);
        assert_eq!(potential[1].y, 2.0);
        assert_eq!(potential[1].v, 0.02);
    }

    #[test]
    fn missing_potential_file_is_a_csv_error() {
        let dir = tempdir().unwrap();
        let result = read_esp_csv(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(MoleculeFileError::Csv { .. })));
    }
}
