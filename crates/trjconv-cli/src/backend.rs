use crate::cli::BackendChoice;
use crate::config::BackendSettings;
use crate::error::{CliError, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use trjconv::engine::gromacs::GromacsBackend;
use trjconv::engine::pbc::{ConnectivityBackend, ImageBackend};

const GMX_ENV: &str = "GMX";
const GMX_PROGRAM: &str = "gmx";

/// Finds the GROMACS executable: an explicit path first, then `$GMX`, then
/// `gmx` on the search path.
fn locate_gmx(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    search_path: Option<OsString>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(value));
    }
    env::split_paths(&search_path?)
        .map(|dir| dir.join(GMX_PROGRAM))
        .find(|candidate| candidate.is_file())
}

/// Scratch directory for `gmx trjconv` exchange files when none is configured.
pub fn default_workdir() -> PathBuf {
    env::temp_dir().join(format!("tinker-trjconv-{}", std::process::id()))
}

fn gromacs_backend(settings: &BackendSettings, executable: PathBuf) -> GromacsBackend {
    let workdir = settings.workdir.clone().unwrap_or_else(default_workdir);
    let mut backend = GromacsBackend::new(executable, workdir);
    if let Some(structure) = &settings.structure {
        backend = backend.with_structure(structure.clone());
    }
    if let Some(timeout) = settings.timeout {
        backend = backend.with_timeout(timeout);
    }
    backend
}

fn resolve_with(
    settings: &BackendSettings,
    env_value: Option<OsString>,
    search_path: Option<OsString>,
) -> Result<Option<Box<dyn ImageBackend>>> {
    let located = || locate_gmx(settings.gmx.as_deref(), env_value, search_path);
    let backend: Option<Box<dyn ImageBackend>> = match settings.choice {
        BackendChoice::None => None,
        BackendChoice::Native => Some(Box::new(ConnectivityBackend)),
        BackendChoice::Gmx => {
            let executable = located().ok_or_else(|| {
                CliError::Backend(
                    "no GROMACS executable found; pass --gmx or set $GMX".to_string(),
                )
            })?;
            Some(Box::new(gromacs_backend(settings, executable)))
        }
        BackendChoice::Auto => match located() {
            Some(executable) => Some(Box::new(gromacs_backend(settings, executable))),
            None => {
                debug!("No GROMACS executable found; grouped re-imaging is unavailable.");
                None
            }
        },
    };
    if let Some(backend) = &backend {
        info!("Using '{}' imaging backend.", backend.name());
    }
    Ok(backend)
}

/// Turns the resolved backend settings into an imaging backend, looking up
/// GROMACS in the process environment.
pub fn resolve(settings: &BackendSettings) -> Result<Option<Box<dyn ImageBackend>>> {
    resolve_with(settings, env::var_os(GMX_ENV), env::var_os("PATH"))
}
