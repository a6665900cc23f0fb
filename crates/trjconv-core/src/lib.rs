//! # trjconv Core Library
//!
//! Converts molecular-dynamics trajectories between Tinker extended XYZ
//! (`.xyz`/`.txyz`/`.arc`) and the GROMACS `g96` and `gro` formats, optionally
//! re-imaging coordinates into the periodic box on the way.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Frame`, `Atom`), the
//!   per-format codecs behind the `FrameFormat` trait, stream segmentation, and
//!   connectivity grouping.
//!
//! - **[`engine`]: The Logic Core.** Validated configuration, the `PbcEngine`
//!   with its pluggable `ImageBackend`s (in-process or `gmx trjconv`), progress
//!   reporting and the error types every layer funnels into.
//!
//! - **[`workflows`]: The Public API.** The `Converter`, which checks a whole
//!   conversion up front and then streams every frame through the pipeline.
//!
//! Non-fatal conditions (count mismatches, truncated streams, frames without a
//! box, backend fallbacks) never abort a run; they are returned next to the
//! result as [`core::diagnostics::Diagnostic`] values.

pub mod core;
pub mod engine;
pub mod workflows;
