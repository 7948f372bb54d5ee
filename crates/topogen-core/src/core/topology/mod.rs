//! # Topology Module
//!
//! This module analyzes molecular connectivity: who is bonded to whom, how far
//! apart two atoms are in bonds, which atoms sit on rings, and which atoms form
//! linear or planar centres.
//!
//! ## Overview
//!
//! Every bonded term the engine generates is derived from the structures built
//! here. They are computed from the canonical bond list and the atom positions
//! and are never mutated afterwards; renumbering after particle insertion
//! rebuilds them or rewrites them through a permutation.
//!
//! ## Key Components
//!
//! - [`adjacency`] - Neighbor lists and shortest-path neighbor shells
//! - [`rings`] - Bounded depth-first ring membership detection
//! - [`motifs`] - Linear and planar centre classification
//!
//! ## Usage
//!
//! ```ignore
//! use topogen::core::topology::adjacency::{Adjacency, NeighborTable};
//! use topogen::core::topology::rings::{detect_rings, DEFAULT_MAX_RING_SIZE};
//!
//! let adjacency = Adjacency::from_bonds(topology.atom_count(), &topology.bonds);
//! let shells = NeighborTable::new(&adjacency, 3);
//! let in_ring = detect_rings(&adjacency, DEFAULT_MAX_RING_SIZE);
//! ```

pub mod adjacency;
pub mod motifs;
pub mod rings;
