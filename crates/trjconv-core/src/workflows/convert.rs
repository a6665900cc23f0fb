use crate::core::diagnostics::{Diagnostic, Outcome};
use crate::core::io::error::FormatError;
use crate::core::io::format::Format;
use crate::core::models::frame::{Frame, Timestep, Trajectory};
use crate::engine::config::{ConfigError, ConversionConfig, TimingConfig};
use crate::engine::error::EngineError;
use crate::engine::pbc::{Granularity, ImageBackend, PbcEngine};
use crate::engine::progress::{Progress, ProgressReporter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const STRIDE_TOLERANCE_PS: f64 = 1e-6;

/// Counts describing a finished conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionSummary {
    pub frames_read: usize,
    pub frames_written: usize,
    /// Granularity actually applied, after any fallback.
    pub granularity: Option<Granularity>,
}

/// Keeps frames whose time is in phase with the first frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StridePolicy {
    phase_origin: f64,
    interval: f64,
}

impl StridePolicy {
    pub fn new(first_time: f64, interval: f64) -> Self {
        Self {
            phase_origin: first_time,
            interval,
        }
    }

    /// `true` when `time mod interval` matches the first frame's phase.
    pub fn keeps(&self, time: f64) -> bool {
        let offset = (time - self.phase_origin).rem_euclid(self.interval);
        offset < STRIDE_TOLERANCE_PS || self.interval - offset < STRIDE_TOLERANCE_PS
    }
}

/// Structure frame supplying what the input format cannot carry.
#[derive(Debug, Clone)]
enum Template {
    /// Tinker XYZ: atom names, types and connectivity.
    Tinker(Frame),
    /// GRO/G96: residue assignments and atom names.
    Labels(Frame),
}

impl Template {
    fn frame(&self) -> &Frame {
        match self {
            Self::Tinker(frame) | Self::Labels(frame) => frame,
        }
    }

    fn apply(&self, index: usize, frame: &mut Frame) -> Result<(), EngineError> {
        let source = self.frame();
        if source.atom_count() != frame.atom_count() {
            return Err(EngineError::TemplateMismatch {
                frame: index,
                template_atoms: source.atom_count(),
                frame_atoms: frame.atom_count(),
            });
        }
        for (atom, model) in frame.atoms.iter_mut().zip(&source.atoms) {
            match self {
                Self::Tinker(_) => {
                    atom.serial = model.serial;
                    atom.name.clone_from(&model.name);
                    atom.atom_type = model.atom_type;
                    atom.neighbors.clone_from(&model.neighbors);
                }
                Self::Labels(_) => {
                    atom.residue.clone_from(&model.residue);
                    if !model.name.is_empty() {
                        atom.name.clone_from(&model.name);
                    }
                }
            }
        }
        Ok(())
    }
}

fn load_template(
    path: &Path,
    input: Format,
    output: Format,
) -> Result<Outcome<Template>, EngineError> {
    let found = Format::from_path(path).map_err(ConfigError::from)?;
    let wants_tinker = output.is_tinker();
    if found.is_tinker() != wants_tinker {
        return Err(EngineError::TemplateFormat {
            path: path.to_path_buf(),
            expected: if wants_tinker { "Tinker XYZ" } else { "G96 or GRO" },
            found,
        });
    }

    let (trajectory, diagnostics) = found.read_trajectory(path)?.into_parts();
    let frame = trajectory
        .into_frames()
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::EmptyTemplate {
            path: path.to_path_buf(),
        })?;
    debug!(?path, atoms = frame.atom_count(), %input, %output, "Loaded template frame");

    let template = if wants_tinker {
        Template::Tinker(frame)
    } else {
        Template::Labels(frame)
    };
    Ok(Outcome::with_diagnostics(template, diagnostics))
}

/// Converts one trajectory according to a validated [`ConversionConfig`].
///
/// Construction performs every check that can fail before a frame is read:
/// the format pair, the template and the availability of an imaging backend.
#[derive(Debug)]
pub struct Converter {
    config: ConversionConfig,
    template: Option<Template>,
    pbc: Option<PbcEngine>,
}

impl Converter {
    /// Validates `config` and prepares the conversion.
    ///
    /// # Arguments
    ///
    /// * `config` - The conversion to perform.
    /// * `backend` - Imaging backend for residue/molecule re-imaging, if any.
    ///
    /// # Return
    ///
    /// The converter, with diagnostics raised while loading the template or
    /// settling the PBC granularity.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedConversion`] when neither side is
    /// Tinker XYZ, [`EngineError::MissingTemplate`] when Tinker output cannot be
    /// built without one, and a PBC error when grouped re-imaging has no backend.
    pub fn new(
        config: ConversionConfig,
        backend: Option<Box<dyn ImageBackend>>,
    ) -> Result<Outcome<Self>, EngineError> {
        let (input, output) = (config.input_format, config.output_format);
        if !input.is_tinker() && !output.is_tinker() {
            return Err(EngineError::UnsupportedConversion { input, output });
        }

        let mut diagnostics = Vec::new();
        let template = match &config.template {
            Some(path) => Some(load_template(path, input, output)?.drain_into(&mut diagnostics)),
            None if output.is_tinker() && !input.is_tinker() => {
                return Err(EngineError::MissingTemplate { input, output });
            }
            None => None,
        };

        let pbc = match &config.pbc {
            Some(pbc) => Some(
                PbcEngine::new(pbc.granularity, backend, pbc.fallback)?
                    .drain_into(&mut diagnostics),
            ),
            None => None,
        };

        Ok(Outcome::with_diagnostics(
            Self {
                config,
                template,
                pbc,
            },
            diagnostics,
        ))
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Reads the input file, converts every frame and writes the output file.
    #[instrument(skip_all, name = "convert_workflow", fields(input = %self.config.input.display()))]
    pub fn run(&self, reporter: &ProgressReporter) -> Result<Outcome<ConversionSummary>, EngineError> {
        reporter.report(Progress::PhaseStart { name: "Reading" });
        let mut diagnostics = Vec::new();
        let trajectory = self
            .config
            .input_format
            .read_trajectory(&self.config.input)?
            .drain_into(&mut diagnostics);
        info!(frames = trajectory.len(), format = %self.config.input_format, "Read input trajectory");
        reporter.report(Progress::PhaseFinish);

        reporter.report(Progress::PhaseStart { name: "Converting" });
        let file = File::create(&self.config.output).map_err(FormatError::from)?;
        let mut writer = BufWriter::new(file);
        let summary = self
            .convert_frames(trajectory, &mut writer, reporter)?
            .drain_into(&mut diagnostics);
        writer.flush().map_err(FormatError::from)?;
        reporter.report(Progress::PhaseFinish);

        info!(
            written = summary.frames_written,
            output = %self.config.output.display(),
            "Conversion finished"
        );
        Ok(Outcome::with_diagnostics(summary, diagnostics))
    }

    /// Converts already-read frames and writes them to `writer`.
    pub fn convert_frames(
        &self,
        trajectory: Trajectory,
        writer: &mut impl Write,
        reporter: &ProgressReporter,
    ) -> Result<Outcome<ConversionSummary>, EngineError> {
        let timing = self.config.timing;
        let stride = match (timing.stride, timing.time_step) {
            (Some(interval), Some(_)) => Some(StridePolicy::new(timing.start_time, interval)),
            _ => None,
        };

        let mut summary = ConversionSummary {
            frames_read: trajectory.len(),
            granularity: self.pbc.as_ref().map(PbcEngine::granularity),
            ..Default::default()
        };
        let mut diagnostics = Vec::new();

        reporter.report(Progress::FramesStart {
            total: trajectory.len() as u64,
        });
        if let Some(policy) = &stride {
            reporter.message(format!("Keeping one frame every {} ps", policy.interval));
        }
        for (index, frame) in trajectory.into_iter().enumerate() {
            let timestep = frame_timestep(&timing, index);
            let keep = match (&stride, timestep) {
                (Some(policy), Some(ts)) => policy.keeps(ts.time_ps),
                _ => true,
            };
            if keep {
                let (frame, frame_diagnostics) =
                    self.process_frame(index, frame, timestep)?.into_parts();
                diagnostics.extend(frame_diagnostics.into_iter().map(|d| d.in_frame(index)));
                self.config.output_format.write_frame(&frame, writer)?;
                summary.frames_written += 1;
            }
            reporter.report(Progress::FrameDone {
                index,
                written: keep,
            });
        }
        reporter.report(Progress::FramesFinish {
            written: summary.frames_written,
        });

        if summary.frames_read == 0 {
            warn!("Input trajectory contains no complete frame");
        }
        Ok(Outcome::with_diagnostics(summary, diagnostics))
    }

    fn process_frame(
        &self,
        index: usize,
        mut frame: Frame,
        timestep: Option<Timestep>,
    ) -> Result<Outcome<Frame>, EngineError> {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        if let Some(template) = &self.template {
            template.apply(index, &mut frame)?;
        }
        match (self.config.input_format.is_tinker(), self.config.output_format.is_tinker()) {
            (true, false) => frame.zero_velocities(),
            (false, true) => frame.clear_velocities(),
            _ => {}
        }
        frame.convert_units(self.config.output_format.native_unit());

        if let Some(engine) = &self.pbc {
            engine.apply(&mut frame)?.drain_into(&mut diagnostics);
        }
        if timestep.is_some() {
            frame.timestep = timestep;
        }
        Ok(Outcome::with_diagnostics(frame, diagnostics))
    }
}

/// `(index, t0 + index × dt)` when a time step is configured.
fn frame_timestep(timing: &TimingConfig, index: usize) -> Option<Timestep> {
    timing
        .time_step
        .map(|dt| Timestep::new(index as u64, timing.start_time + index as f64 * dt))
}
