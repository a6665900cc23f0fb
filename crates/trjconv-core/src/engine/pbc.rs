use crate::core::diagnostics::{Diagnostic, DiagnosticKind, Outcome};
use crate::core::io::error::FormatError;
use crate::core::models::frame::Frame;
use crate::core::models::units::LengthUnit;
use crate::core::topology::grouping::groups_for;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, instrument};

pub use crate::core::topology::Granularity;

/// What to do when residue/molecule re-imaging is requested without a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Refuse to start.
    #[default]
    Strict,
    /// Downgrade to per-atom wrapping and report it.
    Lenient,
}

#[derive(Debug, Error)]
pub enum PbcError {
    #[error("No imaging backend is available for '{granularity}' re-imaging")]
    BackendUnavailable { granularity: Granularity },

    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {detail}")]
    ExternalFailed {
        program: String,
        status: String,
        detail: String,
    },

    #[error("'{program}' did not finish within {seconds:.1} s")]
    Timeout { program: String, seconds: f64 },

    #[error("Exchange file {path:?} could not be processed: {source}")]
    Exchange {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("Backend returned {found} positions for {expected} atoms")]
    AtomCountChanged { expected: usize, found: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coordinates handed to an [`ImageBackend`], in nanometres.
#[derive(Debug, Clone, Copy)]
pub struct ImageRequest<'a> {
    pub positions: &'a [Point3<f64>],
    pub box_vector: Vector3<f64>,
    pub granularity: Granularity,
    /// Atom index groups that must stay whole, as derived from the frame.
    pub groups: &'a [Vec<usize>],
}

/// A re-imaging strategy able to keep residues or molecules whole.
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the re-imaged positions, in nanometres, in input order.
    fn reimage(&self, request: &ImageRequest<'_>) -> Result<Vec<Point3<f64>>, PbcError>;
}

/// Wraps every position independently into `[0, L)` per axis.
pub fn wrap_atoms(positions: &[Point3<f64>], box_vector: &Vector3<f64>) -> Vec<Point3<f64>> {
    positions
        .iter()
        .map(|p| Point3::from(p.coords.zip_map(box_vector, wrap_coordinate)))
        .collect()
}

/// An axis with a zero, negative or non-finite edge has no periodicity.
fn is_periodic_edge(length: f64) -> bool {
    length.is_finite() && length > 0.0
}

fn wrap_coordinate(x: f64, length: f64) -> f64 {
    if !is_periodic_edge(length) {
        return x;
    }
    let wrapped = x.rem_euclid(length);
    // rem_euclid may round a tiny negative value up to exactly `length`.
    if wrapped >= length { 0.0 } else { wrapped }
}

/// Moves each group by whole box vectors so its centroid lies in `[0, L)`.
///
/// Distances inside a group are preserved exactly; only the lattice offset
/// changes.
pub struct ConnectivityBackend;

impl ImageBackend for ConnectivityBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn reimage(&self, request: &ImageRequest<'_>) -> Result<Vec<Point3<f64>>, PbcError> {
        let mut positions = request.positions.to_vec();
        let lengths = request.box_vector;
        for group in request.groups {
            if group.is_empty() {
                continue;
            }
            let centroid = group
                .iter()
                .fold(Vector3::zeros(), |acc, &i| acc + request.positions[i].coords)
                / group.len() as f64;
            let shift = centroid.zip_map(&lengths, |c, l| {
                if is_periodic_edge(l) { -(c / l).floor() * l } else { 0.0 }
            });
            for &i in group {
                positions[i] += shift;
            }
        }
        Ok(positions)
    }
}

/// Re-images frames at a fixed granularity.
///
/// Whether a backend is present is settled once, at construction.
pub struct PbcEngine {
    granularity: Granularity,
    backend: Option<Box<dyn ImageBackend>>,
}

impl std::fmt::Debug for PbcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PbcEngine")
            .field("granularity", &self.granularity)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl PbcEngine {
    /// Creates an engine for `granularity`.
    ///
    /// # Errors
    ///
    /// Returns [`PbcError::BackendUnavailable`] when residue or molecule
    /// re-imaging is requested without a backend under [`FallbackPolicy::Strict`].
    pub fn new(
        granularity: Granularity,
        backend: Option<Box<dyn ImageBackend>>,
        policy: FallbackPolicy,
    ) -> Result<Outcome<Self>, PbcError> {
        if granularity == Granularity::Atom || backend.is_some() {
            return Ok(Outcome::new(Self {
                granularity,
                backend,
            }));
        }
        match policy {
            FallbackPolicy::Strict => Err(PbcError::BackendUnavailable { granularity }),
            FallbackPolicy::Lenient => Ok(Outcome::with_diagnostics(
                Self {
                    granularity: Granularity::Atom,
                    backend: None,
                },
                vec![Diagnostic::new(DiagnosticKind::BackendFallback {
                    requested: granularity,
                })],
            )),
        }
    }

    /// The granularity actually applied, after any fallback.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Re-images raw positions; atom granularity never needs a backend.
    pub fn reimage(&self, request: &ImageRequest<'_>) -> Result<Vec<Point3<f64>>, PbcError> {
        match (request.granularity, &self.backend) {
            (Granularity::Atom, _) => Ok(wrap_atoms(request.positions, &request.box_vector)),
            (_, Some(backend)) => {
                let positions = backend.reimage(request)?;
                if positions.len() != request.positions.len() {
                    return Err(PbcError::AtomCountChanged {
                        expected: request.positions.len(),
                        found: positions.len(),
                    });
                }
                Ok(positions)
            }
            (granularity, None) => Err(PbcError::BackendUnavailable { granularity }),
        }
    }

    /// Re-images a frame in place, in whatever unit it is expressed in.
    ///
    /// A frame without a periodic box is left untouched and reported with
    /// [`DiagnosticKind::NoPeriodicity`].
    #[instrument(skip_all, fields(granularity = %self.granularity))]
    pub fn apply(&self, frame: &mut Frame) -> Result<Outcome<()>, PbcError> {
        let Some(box_vector) = frame.periodic_box() else {
            return Ok(Outcome::with_diagnostics(
                (),
                vec![Diagnostic::new(DiagnosticKind::NoPeriodicity)],
            ));
        };

        if self.granularity == Granularity::Atom {
            let wrapped = wrap_atoms(&frame.positions(), &box_vector);
            frame.set_positions(&wrapped);
            return Ok(Outcome::new(()));
        }

        let to_nm = frame.unit.factor_to(LengthUnit::Nanometer);
        let positions: Vec<Point3<f64>> = frame.positions().into_iter().map(|p| p * to_nm).collect();
        let groups = groups_for(frame, self.granularity);
        debug!(groups = groups.len(), "Re-imaging grouped atoms");

        let request = ImageRequest {
            positions: &positions,
            box_vector: box_vector * to_nm,
            granularity: self.granularity,
            groups: &groups,
        };
        let reimaged: Vec<Point3<f64>> = self
            .reimage(&request)?
            .into_iter()
            .map(|p| p / to_nm)
            .collect();
        frame.set_positions(&reimaged);
        Ok(Outcome::new(()))
    }
}
