use thiserror::Error;

use super::config::ConfigError;
use super::pbc::PbcError;
use crate::core::io::error::FormatError;
use crate::core::io::format::Format;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read or write a trajectory: {0}")]
    Format(#[from] FormatError),

    #[error("Re-imaging failed: {0}")]
    Pbc(#[from] PbcError),

    #[error("Conversion from {input} to {output} is not supported; one side must be Tinker XYZ")]
    UnsupportedConversion { input: Format, output: Format },

    #[error("Writing {output} from {input} requires a Tinker XYZ template (-s)")]
    MissingTemplate { input: Format, output: Format },

    #[error("Template must be a {expected} file, but {path:?} is {found}")]
    TemplateFormat {
        path: PathBuf,
        expected: &'static str,
        found: Format,
    },

    #[error("Template {path:?} contains no frame")]
    EmptyTemplate { path: PathBuf },

    #[error("Template has {template_atoms} atoms but frame {frame} has {frame_atoms}")]
    TemplateMismatch {
        frame: usize,
        template_atoms: usize,
        frame_atoms: usize,
    },
}
