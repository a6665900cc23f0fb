//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Data Models** ([`models`]) - Atoms, frames, trajectories and length units
//! - **File I/O** ([`io`]) - Tinker XYZ, G96 and GRO codecs plus stream segmentation
//! - **Connectivity** ([`topology`]) - Grouping atoms into residues and molecules
//! - **Diagnostics** ([`diagnostics`]) - Non-fatal conditions reported alongside results
//!
//! Nothing in this module performs unit conversion implicitly: every [`models::frame::Frame`]
//! records the unit its coordinates are expressed in.

pub mod diagnostics;
pub mod io;
pub mod models;
pub mod topology;
