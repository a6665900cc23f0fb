use super::error::FormatError;
use super::segment::StreamLayout;
use super::source::TextSource;
use crate::core::diagnostics::Outcome;
use crate::core::models::frame::Frame;
use crate::core::models::units::LengthUnit;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Defines the interface for decoding and encoding one frame of a text format.
///
/// Implementors handle the format-specific grammar; the provided methods add
/// string and file conveniences on top of the two primitives.
pub trait FrameFormat {
    /// Short name used in error messages.
    const NAME: &'static str;

    /// The length unit coordinates are written in.
    const NATIVE_UNIT: LengthUnit;

    /// How consecutive frames of this format are delimited in a stream.
    const LAYOUT: StreamLayout;

    /// Parses the text of a single frame.
    ///
    /// # Arguments
    ///
    /// * `text` - The complete text block of one frame.
    ///
    /// # Return
    ///
    /// Returns the frame, expressed in [`Self::NATIVE_UNIT`], together with any
    /// non-fatal diagnostics raised while reading it.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be parsed or a required record is missing.
    fn decode(text: &str) -> Result<Outcome<Frame>, FormatError>;

    /// Writes a frame in this format.
    ///
    /// The frame must already be expressed in [`Self::NATIVE_UNIT`].
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), FormatError>;

    /// Serializes a frame into a string.
    ///
    /// # Errors
    ///
    /// Returns whatever error [`Self::write_frame`] reports.
    fn encode(frame: &Frame) -> Result<String, FormatError> {
        let mut buffer = Vec::new();
        Self::write_frame(frame, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| FormatError::Inconsistent(format!("{} output is not UTF-8: {e}", Self::NAME)))
    }

    /// Reads a single frame from any text source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the frame cannot be parsed.
    fn read_from<S: TextSource + ?Sized>(source: &S) -> Result<Outcome<Frame>, FormatError> {
        let text = source.read_text()?;
        Self::decode(&text)
    }

    /// Reads a single frame from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Outcome<Frame>, FormatError> {
        Self::read_from(path.as_ref())
    }

    /// Writes a single frame to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<(), FormatError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_frame(frame, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::txyz::TinkerXyzFile;

    struct RejectingFormat;

    impl FrameFormat for RejectingFormat {
        const NAME: &'static str = "rejecting";
        const NATIVE_UNIT: LengthUnit = LengthUnit::Nanometer;
        const LAYOUT: StreamLayout = StreamLayout::G96;

        fn decode(_text: &str) -> Result<Outcome<Frame>, FormatError> {
            Err(FormatError::MissingRecord("anything".into()))
        }

        fn write_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), FormatError> {
            writeln!(writer, "{}", frame.title)?;
            Err(FormatError::Inconsistent("frame cannot be written".into()))
        }
    }

    #[test]
    fn encode_propagates_writer_errors() {
        let frame = Frame::new("partial", LengthUnit::Nanometer);
        assert!(matches!(
            RejectingFormat::encode(&frame),
            Err(FormatError::Inconsistent(_))
        ));
    }

    #[test]
    fn encode_returns_the_written_text() {
        let frame = Frame::new("empty", LengthUnit::Angstrom);
        assert_eq!(TinkerXyzFile::encode(&frame).unwrap(), "     0  empty\n");
    }
}
