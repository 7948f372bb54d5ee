//! Reading input molecules and writing generated topologies.
//!
//! Readers implement [`traits::MoleculeSource`] and writers implement
//! [`traits::TopologyFile`], so the command-line front end can treat every
//! format uniformly.

pub mod gro;
pub mod molecule;
pub mod top;
pub mod traits;
