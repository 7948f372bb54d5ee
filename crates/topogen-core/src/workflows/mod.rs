//! # Workflows Module
//!
//! Top-level entry points that run the engine stages in order.
//!
//! - **Generation** ([`generate`]) - One molecule from atoms and bonds to an
//!   assembled topology, a local topology and molecular properties.
//! - **Batch** ([`batch`]) - Many molecules in parallel against one force
//!   field, with a status for every molecule.

pub mod batch;
pub mod generate;
