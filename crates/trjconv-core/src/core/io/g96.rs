use super::error::{FormatError, ParseErrorKind, parse_float, parse_int};
use super::segment::StreamLayout;
use super::traits::FrameFormat;
use crate::core::diagnostics::Outcome;
use crate::core::models::atom::{Atom, ResidueInfo};
use crate::core::models::frame::{Frame, Timestep};
use crate::core::models::units::LengthUnit;
use nalgebra::{Point3, Vector3};
use std::io::Write;

const END_KEYWORD: &str = "END";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Title,
    Timestep,
    Position { reduced: bool },
    Velocity { reduced: bool },
    Box,
    Other,
}

impl Block {
    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "TITLE" => Self::Title,
            "TIMESTEP" => Self::Timestep,
            "POSITION" => Self::Position { reduced: false },
            "POSITIONRED" => Self::Position { reduced: true },
            "VELOCITY" => Self::Velocity { reduced: false },
            "VELOCITYRED" => Self::Velocity { reduced: true },
            "BOX" => Self::Box,
            _ => Self::Other,
        }
    }
}

/// Residue number, residue name, atom name and atom serial of a `POSITION` row.
type RowLabel = (i64, String, String, usize);

#[derive(Default)]
struct G96Blocks {
    title: Vec<String>,
    timestep: Option<Timestep>,
    positions: Vec<(Option<RowLabel>, Point3<f64>)>,
    velocities: Vec<Vector3<f64>>,
    box_vector: Option<Vector3<f64>>,
}

/// GROMACS-96 coordinate format (`.g96`).
///
/// Written with `TITLE`, `TIMESTEP`, `POSITION`/`POSITIONRED`,
/// `VELOCITY`/`VELOCITYRED` and `BOX` blocks, each closed by `END`.
pub struct G96File;

impl G96File {
    /// Reads the trailing three floats of a data row.
    fn xyz(tokens: &[&str], line_num: usize) -> Result<[f64; 3], FormatError> {
        if tokens.len() < 3 {
            return Err(FormatError::parse(
                Self::NAME,
                line_num,
                ParseErrorKind::MissingField { field: "x/y/z" },
            ));
        }
        let tail = &tokens[tokens.len() - 3..];
        Ok([
            parse_float(tail[0], "x", Self::NAME, line_num)?,
            parse_float(tail[1], "y", Self::NAME, line_num)?,
            parse_float(tail[2], "z", Self::NAME, line_num)?,
        ])
    }

    fn row_label(tokens: &[&str], line_num: usize) -> Result<RowLabel, FormatError> {
        if tokens.len() < 7 {
            return Err(FormatError::parse(
                Self::NAME,
                line_num,
                ParseErrorKind::MissingField {
                    field: "residue/atom labels",
                },
            ));
        }
        Ok((
            parse_int(tokens[0], "residue number", Self::NAME, line_num)?,
            tokens[1].to_string(),
            tokens[2].to_string(),
            parse_int(tokens[3], "atom serial", Self::NAME, line_num)?,
        ))
    }

    fn read_row(
        blocks: &mut G96Blocks,
        block: Block,
        line: &str,
        line_num: usize,
    ) -> Result<(), FormatError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match block {
            Block::Title => blocks.title.push(line.trim().to_string()),
            Block::Timestep => {
                if tokens.len() < 2 {
                    return Err(FormatError::parse(
                        Self::NAME,
                        line_num,
                        ParseErrorKind::MissingField {
                            field: "step/time",
                        },
                    ));
                }
                let step = parse_int(tokens[0], "step", Self::NAME, line_num)?;
                let time = parse_float(tokens[1], "time", Self::NAME, line_num)?;
                blocks.timestep = Some(Timestep::new(step, time));
            }
            Block::Position { reduced } => {
                let label = if reduced {
                    None
                } else {
                    Some(Self::row_label(&tokens, line_num)?)
                };
                let [x, y, z] = Self::xyz(&tokens, line_num)?;
                blocks.positions.push((label, Point3::new(x, y, z)));
            }
            Block::Velocity { .. } => {
                let [x, y, z] = Self::xyz(&tokens, line_num)?;
                blocks.velocities.push(Vector3::new(x, y, z));
            }
            Block::Box => {
                // Triclinic boxes carry nine values; only the diagonal is kept.
                if tokens.len() < 3 {
                    return Err(FormatError::parse(
                        Self::NAME,
                        line_num,
                        ParseErrorKind::MissingField { field: "box" },
                    ));
                }
                blocks.box_vector = Some(Vector3::new(
                    parse_float(tokens[0], "box x", Self::NAME, line_num)?,
                    parse_float(tokens[1], "box y", Self::NAME, line_num)?,
                    parse_float(tokens[2], "box z", Self::NAME, line_num)?,
                ));
            }
            Block::Other => {}
        }
        Ok(())
    }

    fn into_frame(blocks: G96Blocks) -> Result<Frame, FormatError> {
        if blocks.positions.is_empty() {
            return Err(FormatError::MissingRecord("POSITION/POSITIONRED block".into()));
        }
        if !blocks.velocities.is_empty() && blocks.velocities.len() != blocks.positions.len() {
            return Err(FormatError::Inconsistent(format!(
                "{} velocities for {} positions",
                blocks.velocities.len(),
                blocks.positions.len()
            )));
        }

        let mut frame = Frame::new(&blocks.title.join(" "), Self::NATIVE_UNIT);
        frame.timestep = blocks.timestep;
        frame.box_vector = blocks.box_vector;
        frame.atoms = blocks
            .positions
            .into_iter()
            .enumerate()
            .map(|(i, (label, position))| match label {
                Some((res_number, res_name, name, serial)) => Atom::new(serial, &name, position)
                    .with_residue(ResidueInfo::new(res_number, &res_name)),
                None => Atom::new(i + 1, "", position),
            })
            .collect();
        for (atom, velocity) in frame.atoms.iter_mut().zip(blocks.velocities) {
            atom.velocity = Some(velocity);
        }
        Ok(frame)
    }
}

impl FrameFormat for G96File {
    const NAME: &'static str = "G96";
    const NATIVE_UNIT: LengthUnit = LengthUnit::Nanometer;
    const LAYOUT: StreamLayout = StreamLayout::G96;

    fn decode(text: &str) -> Result<Outcome<Frame>, FormatError> {
        let mut blocks = G96Blocks::default();
        let mut current: Option<(Block, String)> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_num = i + 1;
            let line = raw.trim_end();
            if line.starts_with('#') {
                continue;
            }
            match current.as_ref().map(|(block, _)| *block) {
                None => {
                    let keyword = line.trim();
                    if !keyword.is_empty() {
                        current = Some((Block::from_keyword(keyword), keyword.to_string()));
                    }
                }
                Some(_) if line.trim() == END_KEYWORD => current = None,
                Some(block) => Self::read_row(&mut blocks, block, line, line_num)?,
            }
        }

        if let Some((_, keyword)) = current {
            return Err(FormatError::parse(
                Self::NAME,
                text.lines().count(),
                ParseErrorKind::UnterminatedBlock { block: keyword },
            ));
        }

        Ok(Outcome::new(Self::into_frame(blocks)?))
    }

    fn write_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), FormatError> {
        writeln!(writer, "TITLE")?;
        writeln!(writer, "{}", frame.title)?;
        writeln!(writer, "{END_KEYWORD}")?;

        if let Some(timestep) = frame.timestep {
            writeln!(writer, "TIMESTEP")?;
            writeln!(writer, "{:15}{:15.6}", timestep.step, timestep.time_ps)?;
            writeln!(writer, "{END_KEYWORD}")?;
        }

        let labelled = !frame.atoms.is_empty() && frame.atoms.iter().all(|a| a.residue.is_some());
        let suffix = if labelled { "" } else { "RED" };
        writeln!(writer, "POSITION{suffix}")?;
        write_rows(
            writer,
            labelled,
            frame.atoms.iter().map(|a| (a, a.position.coords)),
        )?;
        writeln!(writer, "{END_KEYWORD}")?;

        let velocities: Option<Vec<Vector3<f64>>> =
            frame.atoms.iter().map(|a| a.velocity).collect();
        if let Some(velocities) = velocities.filter(|v| !v.is_empty()) {
            writeln!(writer, "VELOCITY{suffix}")?;
            write_rows(
                writer,
                labelled,
                frame.atoms.iter().zip(velocities.iter().copied()),
            )?;
            writeln!(writer, "{END_KEYWORD}")?;
        }

        if let Some(b) = frame.box_vector {
            writeln!(writer, "BOX")?;
            writeln!(writer, "{:15.9}{:15.9}{:15.9}", b.x, b.y, b.z)?;
            writeln!(writer, "{END_KEYWORD}")?;
        }
        Ok(())
    }
}

/// Writes one vector per atom, labelled with residue and atom names when
/// `labelled` is set (`POSITION`/`VELOCITY`), bare otherwise (`*RED`).
fn write_rows<'a>(
    writer: &mut impl Write,
    labelled: bool,
    rows: impl Iterator<Item = (&'a Atom, Vector3<f64>)>,
) -> std::io::Result<()> {
    for (atom, v) in rows {
        match (&atom.residue, labelled) {
            (Some(residue), true) => writeln!(
                writer,
                "{:5} {:<5} {:<5}{:7}{:15.9}{:15.9}{:15.9}",
                residue.number.rem_euclid(100_000),
                residue.name,
                atom.name,
                atom.serial % 10_000_000,
                v.x,
                v.y,
                v.z
            )?,
            _ => writeln!(writer, "{:15.9}{:15.9}{:15.9}", v.x, v.y, v.z)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDUCED: &str = concat!(
        "TITLE\n",
        "Water\n",
        "END\n",
        "TIMESTEP\n",
        "              3       1.500000\n",
        "END\n",
        "POSITIONRED\n",
        "    0.150000000    0.200000000    0.300000000\n",
        "    0.245700000    0.200000000    0.300000000\n",
        "   -0.050000000    1.000000000    0.000000000\n",
        "END\n",
        "VELOCITYRED\n",
        "    0.000000000    0.000000000    0.000000000\n",
        "    0.000000000    0.000000000    0.000000000\n",
        "    0.000000000    0.000000000    0.000000000\n",
        "END\n",
        "BOX\n",
        "    1.200000000    1.200000000    1.200000000\n",
        "END\n",
    );

    #[test]
    fn decode_reads_all_reduced_blocks() {
        let frame = G96File::decode(REDUCED).unwrap().value;

        assert_eq!(frame.title, "Water");
        assert_eq!(frame.timestep, Some(Timestep::new(3, 1.5)));
        assert_eq!(frame.atom_count(), 3);
        assert_eq!(frame.atoms[2].position, Point3::new(-0.05, 1.0, 0.0));
        assert_eq!(frame.atoms[0].velocity, Some(Vector3::zeros()));
        assert_eq!(frame.box_vector, Some(Vector3::new(1.2, 1.2, 1.2)));
        assert_eq!(frame.unit, LengthUnit::Nanometer);
        assert_eq!(frame.atoms[1].serial, 2);
    }

    #[test]
    fn encode_round_trips_reduced_layout_exactly() {
        let frame = G96File::decode(REDUCED).unwrap().value;
        assert_eq!(G96File::encode(&frame).unwrap(), REDUCED);
    }

    #[test]
    fn labelled_position_block_keeps_residue_and_names() {
        let text = concat!(
            "TITLE\n",
            "Labelled\n",
            "END\n",
            "POSITION\n",
            "    1 SOL   OW         1    0.150000000    0.200000000    0.300000000\n",
            "END\n",
        );
        let frame = G96File::decode(text).unwrap().value;
        let atom = &frame.atoms[0];

        assert_eq!(atom.name, "OW");
        assert_eq!(atom.residue, Some(ResidueInfo::new(1, "SOL")));
        assert!(frame.timestep.is_none());
        assert!(frame.box_vector.is_none());
        assert_eq!(G96File::encode(&frame).unwrap(), text);
    }

    #[test]
    fn comments_and_unknown_blocks_are_skipped() {
        let text = "# generated\nTITLE\nX\nEND\nREMARK\nanything 1 2 3\nEND\nPOSITIONRED\n 1.0 2.0 3.0\nEND\n";
        let frame = G96File::decode(text).unwrap().value;
        assert_eq!(frame.atom_count(), 1);
        assert_eq!(frame.atoms[0].position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let text = "TITLE\nX\nEND\nPOSITIONRED\n 1.0 2.0 3.0\n";
        assert!(matches!(
            G96File::decode(text),
            Err(FormatError::Parse {
                kind: ParseErrorKind::UnterminatedBlock { .. },
                ..
            })
        ));
    }

    #[test]
    fn missing_positions_is_an_error() {
        assert!(matches!(
            G96File::decode("TITLE\nEmpty\nEND\n"),
            Err(FormatError::MissingRecord(_))
        ));
    }

    #[test]
    fn velocity_count_must_match_positions() {
        let text = "POSITIONRED\n 1.0 2.0 3.0\n 1.0 2.0 3.0\nEND\nVELOCITYRED\n 0.0 0.0 0.0\nEND\n";
        assert!(matches!(
            G96File::decode(text),
            Err(FormatError::Inconsistent(_))
        ));
    }

    #[test]
    fn encode_skips_optional_blocks_when_absent() {
        let mut frame = Frame::new("Bare", LengthUnit::Nanometer);
        frame.atoms.push(Atom::new(1, "C", Point3::new(0.1, 0.2, 0.3)));
        let text = G96File::encode(&frame).unwrap();

        assert!(text.contains("POSITIONRED\n"));
        assert!(!text.contains("TIMESTEP"));
        assert!(!text.contains("VELOCITY"));
        assert!(!text.contains("BOX"));
    }
}
