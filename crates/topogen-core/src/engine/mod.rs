//! # Engine Module
//!
//! The individual stages that turn a molecule into a simulation-ready
//! topology.
//!
//! ## Overview
//!
//! Each stage takes the working [`Topology`](crate::core::models::topology::Topology)
//! by mutable reference and leaves it in a state the next stage expects.
//! Stages never look at other molecules, so a batch can run them in
//! parallel against one shared, read-only force field.
//!
//! ## Architecture
//!
//! - **Atoms** ([`atoms`]) - Atom typing, names and positions from a calculation; bonds
//! - **Bonded Terms** ([`bonded`]) - Angles, dihedrals, impropers, 1-4 pairs and exclusions
//! - **Special Interactions** ([`special`]) - Linear angles and virtual sites
//! - **Shells** ([`shells`]) - Polarizable Drude particles and their exclusions
//! - **Charges** ([`charges`]) - Zero, named or potential-fitted partial charges
//! - **Charge Groups** ([`charge_groups`]) - Partition of atoms into charge groups
//! - **Assembly** ([`assembly`]) - Deduplicated parameters and the local topology
//! - **Properties** ([`properties`]) - Dipole, quadrupole, symmetry and polarizability
//! - **Configuration** ([`config`]) - Generation settings and their validation
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Per-molecule failures and fatal errors

pub mod assembly;
pub mod atoms;
pub mod bonded;
pub mod charge_groups;
pub mod charges;
pub mod config;
pub mod error;
pub mod progress;
pub mod properties;
pub mod shells;
pub mod special;
