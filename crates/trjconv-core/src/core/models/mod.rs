//! # Core Models Module
//!
//! Data structures describing molecular conformations as they move through the
//! converter.
//!
//! ## Key Components
//!
//! - [`atom`] - A single atom: serial, name, Tinker type, position, optional velocity,
//!   bonded neighbors and optional residue assignment
//! - [`frame`] - One snapshot (`Frame`) and an ordered series of them (`Trajectory`)
//! - [`units`] - The length unit a frame is expressed in and the Å/nm factor
//!
//! Every format codec decodes into the same `Frame` type. A frame remembers its
//! [`units::LengthUnit`], which lets cross-format conversion apply the scale factor
//! exactly once.

pub mod atom;
pub mod frame;
pub mod units;
