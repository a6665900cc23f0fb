//! # Workflows Module
//!
//! High-level entry points that tie the `core` codecs and the `engine` together.
//!
//! - **Conversion Workflow** ([`convert`]) - Validates a conversion up front, then runs
//!   every frame through template application, unit conversion, optional PBC
//!   re-imaging, time stamping and striding before encoding it.

pub mod convert;
