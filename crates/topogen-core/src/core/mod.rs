//! # Core Module
//!
//! Data structures and stateless algorithms shared by every stage of topology
//! generation.
//!
//! ## Overview
//!
//! - **Molecular Representation** ([`models`]) - Input molecules, atoms, interaction lists, exclusions and the generated topology
//! - **Force Field** ([`forcefield`]) - The parameter store, functional types, combination rules and parameter resolution
//! - **Connectivity** ([`topology`]) - Bond graphs, neighbour shells, ring detection and geometric motif classification
//! - **File I/O** ([`io`]) - Molecule input and topology/conformation output
//! - **Utilities** ([`utils`]) - Element table, physical constants, units and geometry
//!
//! Nothing in this module holds mutable global state. A loaded force field is
//! read-only and can be shared between threads.

pub mod forcefield;
pub mod io;
pub mod models;
pub mod topology;
pub mod utils;
