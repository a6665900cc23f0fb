use super::error::FormatError;
use super::g96::G96File;
use super::gro::GroFile;
use super::segment::read_trajectory;
use super::source::TextSource;
use super::traits::FrameFormat;
use super::txyz::TinkerXyzFile;
use crate::core::diagnostics::Outcome;
use crate::core::models::frame::{Frame, Trajectory};
use crate::core::models::units::LengthUnit;
use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// A supported trajectory format, selected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    #[serde(alias = "txyz", alias = "xyz", alias = "arc")]
    Tinker,
    G96,
    Gro,
}

static EXTENSIONS: Map<&'static str, Format> = phf_map! {
    "xyz" => Format::Tinker,
    "txyz" => Format::Tinker,
    "arc" => Format::Tinker,
    "g96" => Format::G96,
    "gro" => Format::Gro,
};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FormatLookupError {
    #[error("File '{0}' has no extension; cannot infer its format")]
    MissingExtension(String),
    #[error("Unsupported file extension '.{0}' (expected one of xyz, txyz, arc, g96, gro)")]
    UnknownExtension(String),
    #[error("Unknown format name '{0}'")]
    UnknownName(String),
}

impl Format {
    /// Looks up a format by file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        EXTENSIONS.get(extension.to_ascii_lowercase().as_str()).copied()
    }

    /// Infers the format of `path` from its extension.
    pub fn from_path(path: &Path) -> Result<Self, FormatLookupError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| FormatLookupError::MissingExtension(path.display().to_string()))?;
        Self::from_extension(extension)
            .ok_or_else(|| FormatLookupError::UnknownExtension(extension.to_string()))
    }

    pub fn native_unit(self) -> LengthUnit {
        match self {
            Self::Tinker => TinkerXyzFile::NATIVE_UNIT,
            Self::G96 => G96File::NATIVE_UNIT,
            Self::Gro => GroFile::NATIVE_UNIT,
        }
    }

    pub fn is_tinker(self) -> bool {
        self == Self::Tinker
    }

    /// Reads all complete frames of `source` in this format.
    pub fn read_trajectory<S: TextSource + ?Sized>(
        self,
        source: &S,
    ) -> Result<Outcome<Trajectory>, FormatError> {
        match self {
            Self::Tinker => read_trajectory::<TinkerXyzFile, S>(source),
            Self::G96 => read_trajectory::<G96File, S>(source),
            Self::Gro => read_trajectory::<GroFile, S>(source),
        }
    }

    /// Writes one frame, which must already be in [`Self::native_unit`].
    pub fn write_frame(self, frame: &Frame, writer: &mut impl Write) -> Result<(), FormatError> {
        match self {
            Self::Tinker => TinkerXyzFile::write_frame(frame, writer),
            Self::G96 => G96File::write_frame(frame, writer),
            Self::Gro => GroFile::write_frame(frame, writer),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tinker => "tinker",
            Self::G96 => "g96",
            Self::Gro => "gro",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = FormatLookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tinker" => Ok(Self::Tinker),
            other => {
                Self::from_extension(other).ok_or_else(|| FormatLookupError::UnknownName(s.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_map_to_formats() {
        for (path, expected) in [
            ("traj.arc", Format::Tinker),
            ("mol.XYZ", Format::Tinker),
            ("mol.txyz", Format::Tinker),
            ("out.g96", Format::G96),
            ("conf.gro", Format::Gro),
        ] {
            assert_eq!(Format::from_path(Path::new(path)), Ok(expected), "{path}");
        }
    }

    #[test]
    fn unknown_or_missing_extension_is_rejected() {
        assert_eq!(
            Format::from_path(Path::new("frame.pdb")),
            Err(FormatLookupError::UnknownExtension("pdb".into()))
        );
        assert!(matches!(
            Format::from_path(Path::new("README")),
            Err(FormatLookupError::MissingExtension(_))
        ));
    }

    #[test]
    fn native_units_follow_the_format() {
        assert_eq!(Format::Tinker.native_unit(), LengthUnit::Angstrom);
        assert_eq!(Format::G96.native_unit(), LengthUnit::Nanometer);
        assert_eq!(Format::Gro.native_unit(), LengthUnit::Nanometer);
    }

    #[test]
    fn names_parse_and_display() {
        assert_eq!("tinker".parse::<Format>(), Ok(Format::Tinker));
        assert_eq!("arc".parse::<Format>(), Ok(Format::Tinker));
        assert_eq!("G96".parse::<Format>(), Ok(Format::G96));
        assert_eq!(Format::Gro.to_string(), "gro");
        assert!("pdb".parse::<Format>().is_err());
    }

    #[test]
    fn runtime_dispatch_reads_and_writes() {
        let text = "     1  Ar\n     1  Ar     1.000000    2.000000    3.000000     0\n";
        let trajectory = Format::Tinker.read_trajectory(text).unwrap().value;
        let mut buffer = Vec::new();
        Format::Tinker
            .write_frame(&trajectory.frames()[0], &mut buffer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), text);
    }
}
