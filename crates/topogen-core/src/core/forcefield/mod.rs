//! # Force Field Module
//!
//! This module holds everything that turns a bare list of bonded terms into
//! numbers: the catalogue of functional forms, the parameter database, the
//! nonbonded combination rules and the deduplicated coefficient table.
//!
//! ## Overview
//!
//! The force field is a read-only store loaded once from a TOML file and
//! shared by every molecule processed in a run. Atom types map to coarser
//! bond types, and bonded parameters are looked up by bond type:
//!
//! - **Bonds** are matched in either atom order
//! - **Angles** keep the centre fixed and match the outer pair in either order
//! - **Dihedrals** match exactly first, then fall back to `X` wildcard entries
//! - **Van der Waals** pair parameters are combined from per-type values
//!
//! ## Key Components
//!
//! - [`functional`] - The closed set of interaction forms and their slot counts
//! - [`params`] - Force-field store loading, validation and lookups
//! - [`combination`] - Combination rules and the nonbonded parameter matrix
//! - [`resolver`] - Fills interaction coefficients from the store
//! - [`table`] - Exact-match deduplicated coefficient table
//!
//! ## Usage
//!
//! ```ignore
//! use topogen::core::forcefield::params::ForceField;
//! use topogen::core::forcefield::resolver::ParameterResolver;
//!
//! let store = ForceField::load(Path::new("forcefield.toml"))?;
//! let declarations = store.declarations()?;
//! ParameterResolver::new(&store).resolve(&mut topology, &declarations)?;
//! ```

pub mod combination;
pub mod functional;
pub mod params;
pub mod resolver;
pub mod table;
