//! # Engine Module
//!
//! The stateful parts of a conversion: its validated configuration, periodic
//! re-imaging, and the progress and error types the workflows report through.
//!
//! - **Configuration** ([`config`]) - `ConversionConfigBuilder` and its validation
//! - **Periodic Boundaries** ([`pbc`]) - `PbcEngine`, per-atom wrapping and the
//!   `ImageBackend` seam
//! - **External Imaging** ([`gromacs`]) - `gmx trjconv -pbc` as an `ImageBackend`
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - `EngineError`, wrapping every lower layer

pub mod config;
pub mod error;
pub mod gromacs;
pub mod pbc;
pub mod progress;
