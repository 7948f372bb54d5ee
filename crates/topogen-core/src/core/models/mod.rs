//! # Core Models Module
//!
//! This module contains the data structures that describe a molecule on its
//! way from input structure to finished topology.
//!
//! ## Overview
//!
//! Input molecules ([`molecule`]) are plain deserialized records. Generation
//! turns them into a working [`topology::Topology`], an owning aggregate of
//! atoms, interned names, interaction lists and exclusions that the engine
//! mutates stage by stage.
//!
//! ## Key Components
//!
//! - [`atom`] - Particles (atoms, virtual sites, shells) and the atom-type registry
//! - [`symbols`] - Interning table for atom, type and residue names
//! - [`ids`] - Handle types issued by the symbol table
//! - [`interaction`] - Bonded interactions and per-functional-type lists
//! - [`exclusions`] - Symmetric nonbonded exclusion sets and their compressed form
//! - [`topology`] - Bonds, bond orders and the working topology
//! - [`molecule`] - Deserializable input molecules and calculations
//!
//! ## Usage
//!
//! ```ignore
//! use topogen::core::models::topology::Topology;
//!
//! let mut topology = Topology::new("ethanol");
//! let c3 = topology.add_atom_type("c3", ParticleKind::Atom, 6);
//! ```

pub mod atom;
pub mod exclusions;
pub mod ids;
pub mod interaction;
pub mod molecule;
pub mod symbols;
pub mod topology;
