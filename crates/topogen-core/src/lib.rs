//! # topogen
//!
//! Builds complete molecular-mechanics topologies from molecules described by
//! atoms, bonds and quantum-chemistry reference data.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `Topology`),
//!   the read-only force-field store, connectivity algorithms and file I/O.
//!
//! - **[`engine`]: The Logic Core.** The individual generation stages: atom
//!   typing, bonded-term generation, virtual sites, polarizable shells, charge
//!   assignment, charge groups, assembly into a simulation-ready description
//!   and molecular properties.
//!
//! - **[`workflows`]: The Public API.** Runs the stages in order for one
//!   molecule or in parallel for a batch, reporting a status per molecule.

pub mod core;
pub mod engine;
pub mod workflows;
