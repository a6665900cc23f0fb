use super::error::FormatError;
use super::gro::GroFile;
use super::source::TextSource;
use super::traits::FrameFormat;
use super::txyz::{parse_cell_line, split_header};
use crate::core::diagnostics::{Diagnostic, DiagnosticKind, Outcome};
use crate::core::models::frame::Trajectory;
use std::io::Write;
use tracing::debug;

/// How consecutive frames are laid out in a multi-frame text stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLayout {
    /// Count/title header, optional box line, then exactly `count` atom lines.
    Tinker,
    /// Title, count line, `count` atom lines and a box line.
    Gro,
    /// Keyword blocks; a new frame starts at `TITLE` or at a repeated
    /// `TIMESTEP`/`POSITION` block.
    G96,
}

/// Cuts a stream into the text blocks of its complete frames.
///
/// A stream that ends inside a frame, or whose next header cannot be read,
/// keeps every frame completed so far and reports a
/// [`DiagnosticKind::TruncatedTrajectory`].
pub fn split_frames(layout: StreamLayout, lines: &[String]) -> Outcome<Vec<String>> {
    let (frames, truncation) = match layout {
        StreamLayout::Tinker => split_tinker(lines),
        StreamLayout::Gro => split_gro(lines),
        StreamLayout::G96 => split_g96(lines),
    };
    let diagnostics = truncation
        .map(|reason| {
            Diagnostic::new(DiagnosticKind::TruncatedTrajectory {
                complete_frames: frames.len(),
                reason,
            })
        })
        .into_iter()
        .collect();
    Outcome::with_diagnostics(frames, diagnostics)
}

fn join_block<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

fn split_tinker(lines: &[String]) -> (Vec<String>, Option<String>) {
    let content: Vec<(usize, &str)> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l.as_str()))
        .collect();

    let mut frames = Vec::new();
    let mut cursor = 0;
    while let Some(&(line_num, header)) = content.get(cursor) {
        let (count_token, _) = split_header(header);
        let Ok(count) = count_token.parse::<usize>() else {
            return (
                frames,
                Some(format!(
                    "line {line_num}: expected an atom count, found '{}'",
                    header.trim()
                )),
            );
        };

        let mut block = vec![header];
        let mut next = cursor + 1;
        if let Some(&(_, candidate)) = content.get(next) {
            if parse_cell_line(candidate).is_some() {
                block.push(candidate);
                next += 1;
            }
        }

        let remaining = content.len() - next;
        if remaining < count {
            return (
                frames,
                Some(format!(
                    "frame starting on line {line_num} declares {count} atoms but only {remaining} lines follow"
                )),
            );
        }
        block.extend(content[next..next + count].iter().map(|(_, l)| *l));
        frames.push(join_block(block));
        cursor = next + count;
    }
    (frames, None)
}

fn split_gro(lines: &[String]) -> (Vec<String>, Option<String>) {
    let mut frames = Vec::new();
    let mut cursor = 0;
    // A GRO title may itself be blank, so only a blank tail ends the stream.
    while lines[cursor..].iter().any(|l| !l.trim().is_empty()) {
        let line_num = cursor + 1;
        let Some(count_line) = lines.get(cursor + 1) else {
            return (frames, Some(format!("line {line_num}: title without an atom count")));
        };
        let Ok(count) = count_line.trim().parse::<usize>() else {
            return (
                frames,
                Some(format!(
                    "line {}: expected an atom count, found '{}'",
                    line_num + 1,
                    count_line.trim()
                )),
            );
        };
        let end = cursor + 2 + count + 1;
        if end > lines.len() {
            return (
                frames,
                Some(format!(
                    "frame starting on line {line_num} declares {count} atoms but the stream ends early"
                )),
            );
        }
        if GroFile::parse_box_line(&lines[end - 1]).is_none() {
            return (
                frames,
                Some(format!("line {end}: expected a box line after {count} atoms")),
            );
        }
        frames.push(join_block(lines[cursor..end].iter().map(String::as_str)));
        cursor = end;
    }
    (frames, None)
}

#[derive(Default)]
struct G96Frame<'a> {
    lines: Vec<&'a str>,
    has_title: bool,
    has_timestep: bool,
    has_position: bool,
}

impl<'a> G96Frame<'a> {
    fn starts_new(&self, keyword: &str) -> bool {
        match keyword {
            "TITLE" => self.has_title || self.has_timestep || self.has_position,
            "TIMESTEP" => self.has_timestep || self.has_position,
            "POSITION" | "POSITIONRED" => self.has_position,
            _ => false,
        }
    }

    fn mark(&mut self, keyword: &str) {
        match keyword {
            "TITLE" => self.has_title = true,
            "TIMESTEP" => self.has_timestep = true,
            "POSITION" | "POSITIONRED" => self.has_position = true,
            _ => {}
        }
    }
}

fn split_g96(lines: &[String]) -> (Vec<String>, Option<String>) {
    let mut frames = Vec::new();
    let mut current = G96Frame::default();
    let mut last_title: Vec<&str> = Vec::new();
    let mut open_block: Option<(&str, usize, usize)> = None;

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.as_str();
        let trimmed = line.trim();
        match open_block {
            Some((keyword, start, _)) if trimmed == "END" => {
                if keyword == "TITLE" {
                    last_title = current.lines[start..].to_vec();
                    last_title.push(line);
                }
                current.lines.push(line);
                open_block = None;
            }
            Some(_) => current.lines.push(line),
            None if trimmed.is_empty() || trimmed.starts_with('#') => {
                if !current.lines.is_empty() {
                    current.lines.push(line);
                }
            }
            None => {
                if current.starts_new(trimmed) {
                    let finished = std::mem::take(&mut current);
                    frames.push(join_block(finished.lines));
                    if trimmed != "TITLE" && !last_title.is_empty() {
                        current.lines.extend(last_title.iter().copied());
                        current.has_title = true;
                    }
                }
                current.mark(trimmed);
                open_block = Some((trimmed, current.lines.len(), i + 1));
                current.lines.push(line);
            }
        }
    }

    if let Some((keyword, _, line_num)) = open_block {
        return (
            frames,
            Some(format!("block '{keyword}' opened on line {line_num} is not closed")),
        );
    }
    if current.has_position {
        frames.push(join_block(current.lines));
    } else if current.has_title || current.has_timestep {
        return (
            frames,
            Some("last frame has no POSITION block".to_string()),
        );
    }
    (frames, None)
}

/// Reads every complete frame of a multi-frame stream.
///
/// Diagnostics raised by individual frames are tagged with the frame index.
///
/// # Errors
///
/// Returns an error if the source cannot be read or a complete frame fails
/// to parse.
pub fn read_trajectory<F: FrameFormat, S: TextSource + ?Sized>(
    source: &S,
) -> Result<Outcome<Trajectory>, FormatError> {
    let lines = source.read_lines()?;
    let (blocks, mut diagnostics) = split_frames(F::LAYOUT, &lines).into_parts();
    debug!(format = F::NAME, frames = blocks.len(), "Segmented trajectory");

    let mut trajectory = Trajectory::new();
    for (index, block) in blocks.iter().enumerate() {
        let (frame, frame_diagnostics) = F::decode(block)?.into_parts();
        diagnostics.extend(frame_diagnostics.into_iter().map(|d| d.in_frame(index)));
        trajectory.push(frame);
    }
    Ok(Outcome::with_diagnostics(trajectory, diagnostics))
}

/// Writes frames back to back in format `F`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_trajectory<F: FrameFormat>(
    trajectory: &Trajectory,
    writer: &mut impl Write,
) -> Result<(), FormatError> {
    for frame in trajectory.iter() {
        F::write_frame(frame, writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::g96::G96File;
    use crate::core::io::txyz::TinkerXyzFile;
    use crate::core::models::frame::Timestep;
    use nalgebra::Vector3;

    const TWO_WATERS: &str = concat!(
        "     3  Water\n",
        "    10.000000   10.000000   10.000000   90.000000   90.000000   90.000000\n",
        "     1  O      0.000000    0.000000    0.000000     1     2     3\n",
        "     2  H      1.000000    0.000000    0.000000     2     1\n",
        "     3  H     -1.000000    0.000000    0.000000     2     1\n",
        "     3  Water\n",
        "    10.000000   10.000000   10.000000   90.000000   90.000000   90.000000\n",
        "     1  O      0.500000    0.000000    0.000000     1     2     3\n",
        "     2  H      1.500000    0.000000    0.000000     2     1\n",
        "     3  H     -0.500000    0.000000    0.000000     2     1\n",
    );

    fn lines_of(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn tinker_stream_splits_into_frames() {
        let outcome = read_trajectory::<TinkerXyzFile, _>(TWO_WATERS).unwrap();
        assert!(outcome.is_clean());
        let trajectory = outcome.value;
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.frames()[1].atoms[0].position.x, 0.5);
        assert_eq!(
            trajectory.frames()[1].box_vector,
            Some(Vector3::new(10.0, 10.0, 10.0))
        );
    }

    #[test]
    fn tinker_frames_without_box_lines_split() {
        let text = concat!(
            "     1  Single\n",
            "     1  Ar     0.000000    0.000000    0.000000     0\n",
            "\n",
            "     1  Single\n",
            "     1  Ar     1.000000    0.000000    0.000000     0\n",
        );
        let outcome = split_frames(StreamLayout::Tinker, &lines_of(text));
        assert!(outcome.is_clean());
        assert_eq!(outcome.value.len(), 2);
    }

    #[test]
    fn truncated_tinker_stream_keeps_complete_frames() {
        let mut text = TWO_WATERS.to_string();
        text.push_str("     3  Water\n");
        text.push_str("     1  O      0.000000    0.000000    0.000000     1     2     3\n");

        let outcome = read_trajectory::<TinkerXyzFile, _>(text.as_str()).unwrap();
        assert_eq!(outcome.value.len(), 2);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(matches!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::TruncatedTrajectory {
                complete_frames: 2,
                ..
            }
        ));
    }

    #[test]
    fn unreadable_header_stops_segmentation() {
        let mut text = TWO_WATERS.to_string();
        text.push_str("garbage line\n");
        let outcome = split_frames(StreamLayout::Tinker, &lines_of(&text));
        assert_eq!(outcome.value.len(), 2);
        assert!(!outcome.is_clean());
    }

    #[test]
    fn frame_diagnostics_carry_frame_index() {
        let text = concat!(
            "     1  One\n",
            "     1  Ar     0.000000    0.000000    0.000000     0\n",
            "     1  Two\n",
            "     1  Ar     0.000000    0.000000    0.000000     0     7\n",
        );
        let outcome = read_trajectory::<TinkerXyzFile, _>(text).unwrap();
        assert_eq!(outcome.value.len(), 2);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].frame, Some(1));
    }

    #[test]
    fn gro_stream_splits_on_counts() {
        let frame = concat!(
            "Water t= 0.00000 step= 0\n",
            "    1\n",
            "    1SOL     OW    1   0.126   0.639   0.322\n",
            "   1.86206   1.86206   1.86206\n",
        );
        let text = format!("{frame}{frame}");
        let outcome = split_frames(StreamLayout::Gro, &lines_of(&text));
        assert!(outcome.is_clean());
        assert_eq!(outcome.value, vec![frame.to_string(), frame.to_string()]);
    }

    #[test]
    fn gro_stream_missing_box_is_truncated() {
        let text = concat!(
            "Water\n",
            "    1\n",
            "    1SOL     OW    1   0.126   0.639   0.322\n",
            "   1.86206   1.86206   1.86206\n",
            "Water\n",
            "    1\n",
            "    1SOL     OW    1   0.126   0.639   0.322\n",
        );
        let outcome = split_frames(StreamLayout::Gro, &lines_of(text));
        assert_eq!(outcome.value.len(), 1);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn g96_stream_splits_on_repeated_timestep() {
        let text = concat!(
            "TITLE\n",
            "Water\n",
            "END\n",
            "TIMESTEP\n",
            "              0       0.000000\n",
            "END\n",
            "POSITIONRED\n",
            "    0.100000000    0.200000000    0.300000000\n",
            "END\n",
            "TIMESTEP\n",
            "              5       0.010000\n",
            "END\n",
            "POSITIONRED\n",
            "    0.400000000    0.500000000    0.600000000\n",
            "END\n",
        );
        let outcome = read_trajectory::<G96File, _>(text).unwrap();
        assert!(outcome.is_clean());
        let frames = outcome.value.into_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].title, "Water");
        assert_eq!(frames[1].timestep, Some(Timestep::new(5, 0.01)));
        assert_eq!(frames[1].atoms[0].position.z, 0.6);
    }

    #[test]
    fn g96_unclosed_block_is_truncated() {
        let text = concat!(
            "TITLE\n",
            "Water\n",
            "END\n",
            "POSITIONRED\n",
            "    0.100000000    0.200000000    0.300000000\n",
            "END\n",
            "TITLE\n",
            "Water\n",
            "END\n",
            "POSITIONRED\n",
            "    0.100000000    0.200000000    0.300000000\n",
        );
        let outcome = split_frames(StreamLayout::G96, &lines_of(text));
        assert_eq!(outcome.value.len(), 1);
        assert!(matches!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::TruncatedTrajectory { .. }
        ));
    }

    #[test]
    fn written_trajectory_reads_back() {
        let trajectory = read_trajectory::<TinkerXyzFile, _>(TWO_WATERS)
            .unwrap()
            .value;
        let mut buffer = Vec::new();
        write_trajectory::<TinkerXyzFile>(&trajectory, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), TWO_WATERS);
    }
}
