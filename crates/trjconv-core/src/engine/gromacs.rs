use super::pbc::{Granularity, ImageBackend, ImageRequest, PbcError};
use crate::core::io::g96::G96File;
use crate::core::io::traits::FrameFormat;
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use crate::core::models::units::LengthUnit;
use nalgebra::{Point3, Vector3};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const EXCHANGE_INPUT: &str = "mol.g96";
pub const EXCHANGE_OUTPUT: &str = "mol_fix.g96";
const TRJCONV_LOG: &str = "trjconv.log";
const EXCHANGE_TITLE: &str = "tinker-trjconv exchange frame";
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const LOG_TAIL_LINES: usize = 5;

/// Re-images through an external `gmx trjconv -pbc` run.
///
/// Every call writes `mol.g96` into the working directory, runs
/// `gmx trjconv -f mol.g96 -o mol_fix.g96 -pbc <mode>` there with output
/// group `0` fed on stdin, and reads the positions back from `mol_fix.g96`.
#[derive(Debug, Clone)]
pub struct GromacsBackend {
    executable: PathBuf,
    workdir: PathBuf,
    structure: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl GromacsBackend {
    pub fn new(executable: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            workdir: workdir.into(),
            structure: None,
            timeout: None,
        }
    }

    /// Passes a run-input/structure file to `trjconv` via `-s`.
    pub fn with_structure(mut self, structure: impl Into<PathBuf>) -> Self {
        self.structure = Some(structure.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn program(&self) -> String {
        self.executable.display().to_string()
    }

    /// `-pbc res|mol` reads molecule boundaries from a run-input file.
    fn lacks_run_input(&self, granularity: Granularity) -> bool {
        granularity != Granularity::Atom && self.structure.is_none()
    }

    fn command_args(&self, granularity: Granularity) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["trjconv", "-f", EXCHANGE_INPUT, "-o", EXCHANGE_OUTPUT]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push("-pbc".into());
        args.push(granularity.gmx_flag().into());
        if let Some(structure) = &self.structure {
            args.push("-s".into());
            args.push(structure.as_os_str().to_owned());
        }
        args
    }

    fn write_exchange(&self, request: &ImageRequest<'_>) -> Result<PathBuf, PbcError> {
        let mut frame = Frame::new(EXCHANGE_TITLE, LengthUnit::Nanometer);
        frame.box_vector = Some(request.box_vector);
        frame.atoms = request
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| Atom::new(i + 1, "", *p).with_velocity(Vector3::zeros()))
            .collect();

        let path = self.workdir.join(EXCHANGE_INPUT);
        G96File::write_to_path(&frame, &path).map_err(|source| PbcError::Exchange {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn read_exchange(&self) -> Result<Vec<Point3<f64>>, PbcError> {
        let path = self.workdir.join(EXCHANGE_OUTPUT);
        let frame = G96File::read_from_path(&path)
            .map_err(|source| PbcError::Exchange {
                path: path.clone(),
                source,
            })?
            .value;
        Ok(frame.positions())
    }

    fn wait_with_timeout(&self, child: &mut Child, limit: Duration) -> Result<ExitStatus, PbcError> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() >= limit {
                // The child may have exited between the two calls; either way it is reaped.
                let _ = child.kill();
                let _ = child.wait();
                return Err(PbcError::Timeout {
                    program: self.program(),
                    seconds: limit.as_secs_f64(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn log_tail(&self) -> String {
        let text = fs::read_to_string(self.workdir.join(TRJCONV_LOG)).unwrap_or_default();
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(LOG_TAIL_LINES);
        if lines.is_empty() {
            "no output".to_string()
        } else {
            lines[start..].join(" | ")
        }
    }

    fn run(&self, granularity: Granularity) -> Result<(), PbcError> {
        let log = File::create(self.workdir.join(TRJCONV_LOG))?;
        if self.lacks_run_input(granularity) {
            warn!(
                pbc = granularity.gmx_flag(),
                "No run-input file configured for trjconv (-s); '-pbc {}' usually requires one",
                granularity.gmx_flag()
            );
        }
        let args = self.command_args(granularity);
        debug!(program = %self.program(), ?args, "Launching trjconv");

        let mut child = Command::new(&self.executable)
            .args(&args)
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(|source| PbcError::Launch {
                program: self.program(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // Output group selection; trjconv may exit before reading it.
            match stdin.write_all(b"0\n") {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let status = match self.timeout {
            Some(limit) => self.wait_with_timeout(&mut child, limit)?,
            None => child.wait()?,
        };
        if !status.success() {
            return Err(PbcError::ExternalFailed {
                program: self.program(),
                status: status.to_string(),
                detail: self.log_tail(),
            });
        }
        Ok(())
    }
}

impl ImageBackend for GromacsBackend {
    fn name(&self) -> &str {
        "gmx"
    }

    #[instrument(skip_all, fields(atoms = request.positions.len(), pbc = request.granularity.gmx_flag()))]
    fn reimage(&self, request: &ImageRequest<'_>) -> Result<Vec<Point3<f64>>, PbcError> {
        fs::create_dir_all(&self.workdir)?;
        let input = self.write_exchange(request)?;
        self.run(request.granularity)?;
        let positions = self.read_exchange()?;
        info!(exchange = %input.display(), "trjconv re-imaging finished");
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // `sh trjconv <args>` runs a script named `trjconv` in the working
    // directory, which stands in for the real GROMACS binary.
    fn fake_gmx(dir: &TempDir, script: &str) -> GromacsBackend {
        fs::write(dir.path().join("trjconv"), script).unwrap();
        GromacsBackend::new("sh", dir.path())
    }

    fn request<'a>(positions: &'a [Point3<f64>], groups: &'a [Vec<usize>]) -> ImageRequest<'a> {
        ImageRequest {
            positions,
            box_vector: Vector3::new(2.0, 2.0, 2.0),
            granularity: Granularity::Residue,
            groups,
        }
    }

    #[test]
    fn command_line_matches_trjconv_usage() {
        let backend = GromacsBackend::new("gmx", "/tmp").with_structure("topol.tpr");
        let args: Vec<String> = backend
            .command_args(Granularity::Molecule)
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            [
                "trjconv", "-f", "mol.g96", "-o", "mol_fix.g96", "-pbc", "mol", "-s", "topol.tpr"
            ]
        );
    }

    #[test]
    fn grouped_modes_without_structure_are_flagged() {
        let bare = GromacsBackend::new("gmx", "/tmp");
        assert!(bare.lacks_run_input(Granularity::Molecule));
        assert!(bare.lacks_run_input(Granularity::Residue));
        assert!(!bare.lacks_run_input(Granularity::Atom));

        let with_tpr = bare.with_structure("topol.tpr");
        assert!(!with_tpr.lacks_run_input(Granularity::Molecule));
    }

    #[test]
    fn result_is_read_from_the_fixed_exchange_file() {
        let dir = TempDir::new().unwrap();
        let script = concat!(
            "read group\n",
            "echo \"$group $@\" > args.txt\n",
            "sed 's/ -0.100000000/  1.900000000/' mol.g96 > mol_fix.g96\n",
        );
        let backend = fake_gmx(&dir, script);
        let positions = [Point3::new(-0.1, 0.5, 0.5), Point3::new(0.3, 0.5, 0.5)];
        let groups = [vec![0, 1]];

        let moved = backend.reimage(&request(&positions, &groups)).unwrap();

        assert_eq!(moved.len(), 2);
        assert!((moved[0].x - 1.9).abs() < 1e-9);
        assert!((moved[1].x - 0.3).abs() < 1e-9);
        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), "0 -f mol.g96 -o mol_fix.g96 -pbc res");
    }

    #[test]
    fn failing_run_reports_its_output() {
        let dir = TempDir::new().unwrap();
        let backend = fake_gmx(&dir, "echo 'Fatal error: no tpr' >&2\nexit 3\n");
        let positions = [Point3::origin()];
        let groups = [vec![0]];

        let error = backend.reimage(&request(&positions, &groups)).unwrap_err();
        match error {
            PbcError::ExternalFailed { detail, .. } => assert!(detail.contains("no tpr")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_executable_is_a_launch_error() {
        let dir = TempDir::new().unwrap();
        let backend = GromacsBackend::new(dir.path().join("no-such-gmx"), dir.path());
        let positions = [Point3::origin()];
        let groups = [vec![0]];
        assert!(matches!(
            backend.reimage(&request(&positions, &groups)),
            Err(PbcError::Launch { .. })
        ));
    }

    #[test]
    fn slow_run_times_out() {
        let dir = TempDir::new().unwrap();
        let backend =
            fake_gmx(&dir, "sleep 5\n").with_timeout(Duration::from_millis(100));
        let positions = [Point3::origin()];
        let groups = [vec![0]];
        assert!(matches!(
            backend.reimage(&request(&positions, &groups)),
            Err(PbcError::Timeout { .. })
        ));
    }
}
