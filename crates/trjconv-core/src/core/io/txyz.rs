use super::error::{FormatError, ParseErrorKind, parse_float, parse_int};
use super::segment::StreamLayout;
use super::traits::FrameFormat;
use crate::core::diagnostics::{Diagnostic, DiagnosticKind, Outcome};
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use crate::core::models::units::LengthUnit;
use nalgebra::{Point3, Vector3};
use std::io::Write;

const RIGHT_ANGLE: f64 = 90.0;
const ANGLE_TOLERANCE: f64 = 1e-3;

/// Cell parameters read from the optional second line of a Tinker frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellLine {
    pub lengths: Vector3<f64>,
    pub angles: Option<[f64; 3]>,
}

/// Tries to read `line` as a Tinker box line.
///
/// A line is a box line when its first three whitespace-separated tokens all
/// parse as floating-point numbers. Atom lines never qualify because their
/// second token is the atom name.
pub fn parse_cell_line(line: &str) -> Option<CellLine> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }
    let mut lengths = [0.0; 3];
    for (slot, token) in lengths.iter_mut().zip(&tokens[..3]) {
        *slot = token.parse::<f64>().ok()?;
    }
    let angles = if tokens.len() >= 6 {
        let mut angles = [0.0; 3];
        let mut complete = true;
        for (slot, token) in angles.iter_mut().zip(&tokens[3..6]) {
            match token.parse::<f64>() {
                Ok(value) => *slot = value,
                Err(_) => complete = false,
            }
        }
        complete.then_some(angles)
    } else {
        None
    };
    Some(CellLine {
        lengths: Vector3::from(lengths),
        angles,
    })
}

/// Splits a Tinker header into the declared-count token and the trimmed title.
pub fn split_header(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((count, title)) => (count, title.trim()),
        None => (line, ""),
    }
}

/// Tinker XYZ with optional box line and per-atom connectivity.
pub struct TinkerXyzFile;

impl TinkerXyzFile {
    fn parse_atom_line(line: &str, line_num: usize) -> Result<Atom, FormatError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let field = |index: usize, name: &'static str| {
            tokens.get(index).copied().ok_or_else(|| {
                FormatError::parse(
                    Self::NAME,
                    line_num,
                    ParseErrorKind::MissingField { field: name },
                )
            })
        };

        let serial: usize = parse_int(field(0, "serial")?, "serial", Self::NAME, line_num)?;
        let name = field(1, "atom name")?;
        let x = parse_float(field(2, "x")?, "x", Self::NAME, line_num)?;
        let y = parse_float(field(3, "y")?, "y", Self::NAME, line_num)?;
        let z = parse_float(field(4, "z")?, "z", Self::NAME, line_num)?;
        let atom_type: i32 = parse_int(field(5, "atom type")?, "atom type", Self::NAME, line_num)?;
        let neighbors = tokens[6..]
            .iter()
            .map(|t| parse_int::<usize>(t, "neighbor", Self::NAME, line_num))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Atom::new(serial, name, Point3::new(x, y, z))
            .with_type(atom_type)
            .with_neighbors(neighbors))
    }

    fn check_neighbors(frame: &Frame, diagnostics: &mut Vec<Diagnostic>) {
        for atom in &frame.atoms {
            for &neighbor in &atom.neighbors {
                if frame.index_of_serial(neighbor).is_none() {
                    diagnostics.push(Diagnostic::new(DiagnosticKind::NeighborOutOfRange {
                        atom_serial: atom.serial,
                        neighbor,
                    }));
                }
            }
        }
    }
}

impl FrameFormat for TinkerXyzFile {
    const NAME: &'static str = "Tinker XYZ";
    const NATIVE_UNIT: LengthUnit = LengthUnit::Angstrom;
    const LAYOUT: StreamLayout = StreamLayout::Tinker;

    fn decode(text: &str) -> Result<Outcome<Frame>, FormatError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_end()))
            .filter(|(_, l)| !l.is_empty())
            .peekable();

        let (header_num, header) = lines
            .next()
            .ok_or_else(|| FormatError::MissingRecord("Tinker XYZ header line".into()))?;
        let (count_str, title) = split_header(header);
        let declared: usize = parse_int(count_str, "atom count", Self::NAME, header_num)?;

        let mut frame = Frame::new(title, Self::NATIVE_UNIT);
        let mut diagnostics = Vec::new();

        if let Some(cell) = lines.peek().and_then(|(_, l)| parse_cell_line(l)) {
            lines.next();
            frame.box_vector = Some(cell.lengths);
            if let Some(angles) = cell.angles {
                if angles.iter().any(|a| (a - RIGHT_ANGLE).abs() > ANGLE_TOLERANCE) {
                    diagnostics.push(Diagnostic::new(DiagnosticKind::NonOrthorhombicCell {
                        angles,
                    }));
                }
            }
        }

        frame.atoms.reserve(declared);
        for (line_num, line) in lines {
            frame.atoms.push(Self::parse_atom_line(line, line_num)?);
        }

        if frame.atoms.len() != declared {
            diagnostics.push(Diagnostic::new(DiagnosticKind::AtomCountMismatch {
                declared,
                parsed: frame.atoms.len(),
            }));
        }
        Self::check_neighbors(&frame, &mut diagnostics);

        Ok(Outcome::with_diagnostics(frame, diagnostics))
    }

    fn write_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), FormatError> {
        writeln!(writer, " {:5}  {}", frame.atom_count(), frame.title)?;

        if let Some(b) = frame.written_box() {
            writeln!(
                writer,
                " {:12.6}{:12.6}{:12.6}{:12.6}{:12.6}{:12.6}",
                b.x, b.y, b.z, RIGHT_ANGLE, RIGHT_ANGLE, RIGHT_ANGLE
            )?;
        }

        for (i, atom) in frame.atoms.iter().enumerate() {
            write!(
                writer,
                " {:5}  {:<3}{:12.6}{:12.6}{:12.6}{:6}",
                i + 1,
                atom.name,
                atom.position.x,
                atom.position.y,
                atom.position.z,
                atom.atom_type
            )?;
            for neighbor in &atom.neighbors {
                write!(writer, "{:6}", neighbor)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER: &str =
        "3 Water\n1 O 0.0 0.0 0.0 1 2 3\n2 H 1.0 0.0 0.0 2 1\n3 H -1.0 0.0 0.0 2 1\n";

    const WATER_IN_BOX: &str = concat!(
        "     3  Water in a box\n",
        "    12.000000   12.000000   12.000000   90.000000   90.000000   90.000000\n",
        "     1  O      1.500000    2.000000    3.000000    63     2     3\n",
        "     2  H      2.457200    2.000000    3.000000    64     1\n",
        "     3  H      1.260000    2.927000    3.000000    64     1\n",
    );

    #[test]
    fn decode_parses_minimal_water_without_box() {
        let outcome = TinkerXyzFile::decode(WATER).unwrap();
        let frame = &outcome.value;

        assert!(outcome.is_clean());
        assert_eq!(frame.title, "Water");
        assert_eq!(frame.atom_count(), 3);
        assert!(frame.box_vector.is_none());
        assert_eq!(frame.atoms[0].neighbors, vec![2, 3]);
        assert_eq!(frame.atoms[1].atom_type, 2);
        assert_eq!(frame.atoms[2].position, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(frame.unit, LengthUnit::Angstrom);
    }

    #[test]
    fn decode_reads_box_line_and_skips_it_as_atom() {
        let frame = TinkerXyzFile::decode(WATER_IN_BOX).unwrap().value;

        assert_eq!(frame.box_vector, Some(Vector3::new(12.0, 12.0, 12.0)));
        assert_eq!(frame.atom_count(), 3);
        assert_eq!(frame.atoms[0].name, "O");
        assert_eq!(frame.title, "Water in a box");
    }

    #[test]
    fn encode_round_trips_formatted_text_exactly() {
        let frame = TinkerXyzFile::decode(WATER_IN_BOX).unwrap().value;
        assert_eq!(TinkerXyzFile::encode(&frame).unwrap(), WATER_IN_BOX);
    }

    #[test]
    fn encode_uses_fixed_column_layout() {
        let frame = TinkerXyzFile::decode(WATER).unwrap().value;
        let text = TinkerXyzFile::encode(&frame).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "     3  Water");
        assert_eq!(
            lines[1],
            "     1  O      0.000000    0.000000    0.000000     1     2     3"
        );
        assert_eq!(
            lines[3],
            "     3  H     -1.000000    0.000000    0.000000     2     1"
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn encode_omits_zero_box() {
        let mut frame = TinkerXyzFile::decode(WATER).unwrap().value;
        frame.box_vector = Some(Vector3::zeros());
        let text = TinkerXyzFile::encode(&frame).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn count_mismatch_trusts_parsed_atoms() {
        let text = "5 Broken\n1 O 0.0 0.0 0.0 1 2\n2 H 1.0 0.0 0.0 2 1\n";
        let outcome = TinkerXyzFile::decode(text).unwrap();

        assert_eq!(outcome.value.atom_count(), 2);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::AtomCountMismatch {
                declared: 5,
                parsed: 2
            }
        );
        let text = TinkerXyzFile::encode(&outcome.value).unwrap();
        assert!(text.starts_with("     2  Broken\n"));
    }

    #[test]
    fn out_of_range_neighbor_is_reported_and_kept() {
        let text = "2 Pair\n1 C 0.0 0.0 0.0 1 2 9\n2 C 1.5 0.0 0.0 1 1\n";
        let outcome = TinkerXyzFile::decode(text).unwrap();

        assert_eq!(outcome.value.atoms[0].neighbors, vec![2, 9]);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::new(DiagnosticKind::NeighborOutOfRange {
                atom_serial: 1,
                neighbor: 9
            })]
        );
    }

    #[test]
    fn non_right_angles_are_reported() {
        let text = "1 Tri\n10.0 10.0 10.0 90.0 90.0 120.0\n1 Ar 0.0 0.0 0.0 1\n";
        let outcome = TinkerXyzFile::decode(text).unwrap();
        assert!(matches!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::NonOrthorhombicCell { angles } if angles[2] == 120.0
        ));
    }

    #[test]
    fn header_without_title_has_empty_title() {
        let frame = TinkerXyzFile::decode("1\n1 Ar 0.0 0.0 0.0 5\n").unwrap().value;
        assert_eq!(frame.title, "");
        assert_eq!(frame.atoms[0].atom_type, 5);
    }

    #[test]
    fn invalid_coordinate_is_a_parse_error() {
        let err = TinkerXyzFile::decode("1 Bad\n1 Ar 0.0 abc 0.0 5\n").unwrap_err();
        match err {
            FormatError::Parse { line, kind, .. } => {
                assert_eq!(line, 2);
                assert_eq!(
                    kind,
                    ParseErrorKind::InvalidFloat {
                        field: "y",
                        value: "abc".into()
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_type_column_is_a_parse_error() {
        let err = TinkerXyzFile::decode("1 Bad\n1 Ar 0.0 0.0 0.0\n").unwrap_err();
        assert!(matches!(
            err,
            FormatError::Parse {
                kind: ParseErrorKind::MissingField { field: "atom type" },
                ..
            }
        ));
    }

    #[test]
    fn empty_input_is_missing_header() {
        assert!(matches!(
            TinkerXyzFile::decode("\n\n"),
            Err(FormatError::MissingRecord(_))
        ));
    }

    #[test]
    fn cell_line_detection_requires_three_floats() {
        assert!(parse_cell_line("10.0 11.0 12.0").is_some());
        assert!(parse_cell_line("1 O 0.0 0.0 0.0 1").is_none());
        assert!(parse_cell_line("10.0 11.0").is_none());
        let cell = parse_cell_line("10 11 12 90 90 90").unwrap();
        assert_eq!(cell.angles, Some([90.0, 90.0, 90.0]));
    }

    #[test]
    fn file_round_trip_through_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("water.xyz");
        let frame = TinkerXyzFile::decode(WATER).unwrap().value;

        TinkerXyzFile::write_to_path(&frame, &path).unwrap();
        let reread = TinkerXyzFile::read_from_path(&path).unwrap().value;
        assert_eq!(reread, frame);
    }
}
