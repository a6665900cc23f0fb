use super::error::{FormatError, ParseErrorKind, parse_float, parse_int};
use super::segment::StreamLayout;
use super::traits::FrameFormat;
use crate::core::diagnostics::{Diagnostic, DiagnosticKind, Outcome};
use crate::core::models::atom::{Atom, ResidueInfo};
use crate::core::models::frame::{Frame, Timestep};
use crate::core::models::units::LengthUnit;
use nalgebra::{Point3, Vector3};
use std::io::Write;

/// Residue number written for atoms without a residue assignment.
pub const DEFAULT_RESIDUE_NUMBER: i64 = 1;
/// Residue name written for atoms without a residue assignment.
pub const DEFAULT_RESIDUE_NAME: &str = "MOL";

const GRO_INDEX_MODULUS: i64 = 100_000;

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

/// Splits a GROMACS ` t= <time> step= <step>` suffix off a title line.
pub fn split_title_timestep(title: &str) -> (&str, Option<Timestep>) {
    let Some(pos) = title.rfind("t=") else {
        return (title.trim(), None);
    };
    if pos > 0 && !title[..pos].ends_with(char::is_whitespace) {
        return (title.trim(), None);
    }
    let tokens: Vec<&str> = title[pos..].split_whitespace().collect();
    let parsed = match tokens.as_slice() {
        ["t=", time, "step=", step] => time
            .parse::<f64>()
            .ok()
            .zip(step.parse::<u64>().ok())
            .map(|(time, step)| Timestep::new(step, time)),
        _ => None,
    };
    match parsed {
        Some(timestep) => (title[..pos].trim(), Some(timestep)),
        None => (title.trim(), None),
    }
}

/// GROMACS structure format (`.gro`): fixed-column atom lines followed by a
/// free-format box line.
pub struct GroFile;

impl GroFile {
    fn parse_atom_line(line: &str, line_num: usize) -> Result<Atom, FormatError> {
        if line.len() < 44 {
            return Err(FormatError::parse(
                Self::NAME,
                line_num,
                ParseErrorKind::MissingField {
                    field: "coordinates (columns 21-44)",
                },
            ));
        }
        let res_number = parse_int(
            slice_and_trim(line, 0, 5),
            "residue number",
            Self::NAME,
            line_num,
        )?;
        let res_name = slice_and_trim(line, 5, 10);
        let name = slice_and_trim(line, 10, 15);
        let serial = parse_int(slice_and_trim(line, 15, 20), "atom serial", Self::NAME, line_num)?;
        let x = parse_float(slice_and_trim(line, 20, 28), "x", Self::NAME, line_num)?;
        let y = parse_float(slice_and_trim(line, 28, 36), "y", Self::NAME, line_num)?;
        let z = parse_float(slice_and_trim(line, 36, 44), "z", Self::NAME, line_num)?;

        let mut atom = Atom::new(serial, name, Point3::new(x, y, z))
            .with_residue(ResidueInfo::new(res_number, res_name));
        if line.trim_end().len() >= 68 {
            atom.velocity = Some(Vector3::new(
                parse_float(slice_and_trim(line, 44, 52), "vx", Self::NAME, line_num)?,
                parse_float(slice_and_trim(line, 52, 60), "vy", Self::NAME, line_num)?,
                parse_float(slice_and_trim(line, 60, 68), "vz", Self::NAME, line_num)?,
            ));
        }
        Ok(atom)
    }

    /// Parses a box line: three values, or nine for a triclinic cell.
    pub fn parse_box_line(line: &str) -> Option<Vector3<f64>> {
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|t| t.parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match values.len() {
            3 | 9 => Some(Vector3::new(values[0], values[1], values[2])),
            _ => None,
        }
    }
}

impl FrameFormat for GroFile {
    const NAME: &'static str = "GRO";
    const NATIVE_UNIT: LengthUnit = LengthUnit::Nanometer;
    const LAYOUT: StreamLayout = StreamLayout::Gro;

    fn decode(text: &str) -> Result<Outcome<Frame>, FormatError> {
        let lines: Vec<&str> = text.lines().collect();
        let title_line = lines
            .first()
            .ok_or_else(|| FormatError::MissingRecord("GRO title line".into()))?;
        let count_line = lines
            .get(1)
            .ok_or_else(|| FormatError::MissingRecord("GRO atom count line".into()))?;
        let declared: usize = parse_int(count_line, "atom count", Self::NAME, 2)?;

        let (title, timestep) = split_title_timestep(title_line);
        let mut frame = Frame::new(title, Self::NATIVE_UNIT);
        frame.timestep = timestep;

        let mut body: Vec<(usize, &str)> = lines
            .iter()
            .enumerate()
            .skip(2)
            .map(|(i, l)| (i + 1, *l))
            .filter(|(_, l)| !l.trim().is_empty())
            .collect();
        let (box_line_num, box_line) = body
            .pop()
            .ok_or_else(|| FormatError::MissingRecord("GRO box line".into()))?;
        let box_vector = Self::parse_box_line(box_line).ok_or_else(|| {
            FormatError::parse(
                Self::NAME,
                box_line_num,
                ParseErrorKind::InvalidFloat {
                    field: "box",
                    value: box_line.trim().to_string(),
                },
            )
        })?;
        frame.box_vector = Some(box_vector);

        frame.atoms = body
            .into_iter()
            .map(|(line_num, line)| Self::parse_atom_line(line, line_num))
            .collect::<Result<_, _>>()?;

        let mut diagnostics = Vec::new();
        if frame.atoms.len() != declared {
            diagnostics.push(Diagnostic::new(DiagnosticKind::AtomCountMismatch {
                declared,
                parsed: frame.atoms.len(),
            }));
        }
        Ok(Outcome::with_diagnostics(frame, diagnostics))
    }

    fn write_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), FormatError> {
        match frame.timestep {
            Some(ts) => writeln!(
                writer,
                "{}",
                format!("{} t= {:.5} step= {}", frame.title, ts.time_ps, ts.step).trim_start()
            )?,
            None => writeln!(writer, "{}", frame.title)?,
        }
        writeln!(writer, "{:5}", frame.atom_count())?;

        let with_velocities = frame.atoms.iter().all(|a| a.velocity.is_some());
        for (i, atom) in frame.atoms.iter().enumerate() {
            let (res_number, res_name) = atom
                .residue
                .as_ref()
                .map_or((DEFAULT_RESIDUE_NUMBER, DEFAULT_RESIDUE_NAME), |r| {
                    (r.number, r.name.as_str())
                });
            write!(
                writer,
                "{:>5}{:<5.5}{:>5.5}{:>5}{:8.3}{:8.3}{:8.3}",
                res_number.rem_euclid(GRO_INDEX_MODULUS),
                res_name,
                atom.name,
                (i as i64 + 1).rem_euclid(GRO_INDEX_MODULUS),
                atom.position.x,
                atom.position.y,
                atom.position.z
            )?;
            if let (true, Some(v)) = (with_velocities, atom.velocity) {
                write!(writer, "{:8.4}{:8.4}{:8.4}", v.x, v.y, v.z)?;
            }
            writeln!(writer)?;
        }

        let b = frame.box_vector.unwrap_or_else(Vector3::zeros);
        writeln!(writer, "{:10.5}{:10.5}{:10.5}", b.x, b.y, b.z)?;
        Ok(())
    }
}
