use crate::core::models::molecule::Molecule;
use crate::core::models::topology::Topology;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading input molecules.
///
/// A single file may hold any number of molecules. Readers that reference
/// auxiliary files (such as potential samples) resolve relative paths against
/// `base_dir`.
pub trait MoleculeSource {
    /// The error type for read operations.
    type Error: Error + From<io::Error>;

    /// Reads all molecules from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    /// * `base_dir` - Directory used to resolve relative auxiliary paths.
    ///
    /// # Return
    ///
    /// Returns the molecules in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(
        reader: &mut impl BufRead,
        base_dir: Option<&Path>,
    ) -> Result<Vec<Molecule>, Self::Error>;

    /// Reads all molecules from a file path.
    ///
    /// Relative auxiliary paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Molecule>, Self::Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, path.parent())
    }
}

/// Defines the interface for writing a generated topology.
pub trait TopologyFile {
    /// Format-specific settings that are not part of the topology itself.
    type Metadata;

    /// The error type for write operations.
    type Error: Error + From<io::Error>;

    /// Writes a topology and its metadata to a writer.
    ///
    /// # Arguments
    ///
    /// * `topology` - The topology to write.
    /// * `metadata` - The format-specific settings.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(
        topology: &Topology,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes a topology and its metadata to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        topology: &Topology,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(topology, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
