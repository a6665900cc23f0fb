use crate::core::topology::Granularity;
use std::fmt;

/// A non-fatal condition met while reading or processing frames.
///
/// Diagnostics never stop processing; they travel next to the value they
/// concern inside an [`Outcome`] so callers can log or inspect them.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// The header declared a different atom count than was parsed.
    AtomCountMismatch { declared: usize, parsed: usize },
    /// An atom lists a neighbor serial that names no atom of the frame.
    NeighborOutOfRange { atom_serial: usize, neighbor: usize },
    /// The box line carries cell angles other than 90°.
    NonOrthorhombicCell { angles: [f64; 3] },
    /// The stream ended inside a frame; only complete frames were kept.
    TruncatedTrajectory { complete_frames: usize, reason: String },
    /// Re-imaging was requested for a frame without a periodic box.
    NoPeriodicity,
    /// Residue/molecule re-imaging fell back to per-atom wrapping.
    BackendFallback { requested: Granularity },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtomCountMismatch { declared, parsed } => write!(
                f,
                "declared atom count ({declared}) does not match the {parsed} atoms parsed; using {parsed}"
            ),
            Self::NeighborOutOfRange {
                atom_serial,
                neighbor,
            } => write!(
                f,
                "atom {atom_serial} lists neighbor {neighbor}, which is not an atom of this frame"
            ),
            Self::NonOrthorhombicCell { angles } => write!(
                f,
                "cell angles {:.3}/{:.3}/{:.3} are not 90 degrees; treating the cell as orthorhombic",
                angles[0], angles[1], angles[2]
            ),
            Self::TruncatedTrajectory {
                complete_frames,
                reason,
            } => write!(
                f,
                "trajectory may be incomplete ({reason}); kept {complete_frames} complete frame(s)"
            ),
            Self::NoPeriodicity => write!(f, "frame has no PBC box; coordinates left unchanged"),
            Self::BackendFallback { requested } => write!(
                f,
                "no imaging backend for '{requested}' granularity; falling back to per-atom wrapping"
            ),
        }
    }
}

/// A diagnostic, optionally tagged with the index of the frame it concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub frame: Option<usize>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind) -> Self {
        Self { frame: None, kind }
    }

    pub fn in_frame(mut self, frame: usize) -> Self {
        self.frame = Some(frame);
        self
    }
}

impl From<DiagnosticKind> for Diagnostic {
    fn from(kind: DiagnosticKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame {
            Some(index) => write!(f, "frame {}: {}", index, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A value together with the diagnostics raised while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    /// Moves the diagnostics into `sink` and returns the bare value.
    pub fn drain_into(self, sink: &mut Vec<Diagnostic>) -> T {
        sink.extend(self.diagnostics);
        self.value
    }

    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_includes_frame_index() {
        let diagnostic = Diagnostic::new(DiagnosticKind::AtomCountMismatch {
            declared: 4,
            parsed: 3,
        })
        .in_frame(2);
        let text = diagnostic.to_string();
        assert!(text.starts_with("frame 2: "));
        assert!(text.contains("(4)"));
        assert!(text.contains("using 3"));
    }

    #[test]
    fn drain_into_moves_diagnostics_and_returns_value() {
        let outcome = Outcome::with_diagnostics(
            5usize,
            vec![Diagnostic::new(DiagnosticKind::NoPeriodicity)],
        );
        let mut sink = Vec::new();
        let value = outcome.drain_into(&mut sink);
        assert_eq!(value, 5);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].kind, DiagnosticKind::NoPeriodicity);
    }

    #[test]
    fn map_keeps_diagnostics() {
        let outcome = Outcome::with_diagnostics(
            2,
            vec![Diagnostic::new(DiagnosticKind::NoPeriodicity).in_frame(0)],
        )
        .map(|v| v * 10);
        assert_eq!(outcome.value, 20);
        assert!(!outcome.is_clean());
    }
}
