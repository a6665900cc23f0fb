//! Reading and writing of trajectory text formats.
//!
//! Each format implements [`traits::FrameFormat`] for a single frame; the
//! [`segment`] module cuts multi-frame streams into frames and [`format::Format`]
//! selects a codec at runtime from a file extension.
//!
//! - [`txyz`] - Tinker XYZ/ARC, Ångström, with optional box line and connectivity
//! - [`g96`] - GROMACS-96 keyword blocks, nanometres
//! - [`gro`] - GROMACS fixed-column structure files, nanometres

pub mod error;
pub mod format;
pub mod g96;
pub mod gro;
pub mod segment;
pub mod source;
pub mod traits;
pub mod txyz;
