//! # Topology Module
//!
//! Derives which atoms belong together from what a frame carries: explicit
//! residue assignments (GRO/G96) or declared bonds (Tinker XYZ).
//!
//! - [`grouping::UnionFind`] - Disjoint sets used to merge bonded atoms
//! - [`grouping::groups_for`] - Atom index groups for a [`Granularity`]

pub mod grouping;

pub use grouping::Granularity;
