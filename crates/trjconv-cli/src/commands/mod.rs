pub mod convert;
pub mod fix;

use crate::backend;
use crate::config::ResolvedConfig;
use crate::error::{CliError, Result};
use crate::utils::backup::backup_existing;
use crate::utils::progress::CliProgressHandler;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use trjconv::core::diagnostics::Diagnostic;
use trjconv::engine::progress::ProgressReporter;
use trjconv::workflows::convert::{ConversionSummary, Converter};

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.frame {
            Some(frame) => warn!(frame, "{}", diagnostic.kind),
            None => warn!("{}", diagnostic.kind),
        }
    }
}

fn print_summary(summary: &ConversionSummary, output: &Path, warnings: usize) {
    let pbc = summary
        .granularity
        .map_or_else(|| "off".to_string(), |g| g.to_string());
    println!(
        "Wrote {} of {} frame(s) to {} (pbc: {}).",
        summary.frames_written,
        summary.frames_read,
        output.display(),
        pbc
    );
    if warnings > 0 {
        println!("{} warning(s) were reported; rerun with -v for details.", warnings);
    }
}

/// Runs one resolved conversion end to end: backend lookup, output backup,
/// the conversion itself and the final report.
pub(crate) fn execute(resolved: ResolvedConfig, no_backup: bool, quiet: bool) -> Result<()> {
    let ResolvedConfig {
        conversion,
        backend: settings,
    } = resolved;

    if same_file(&conversion.input, &conversion.output) {
        return Err(CliError::SameFile(conversion.input.clone()));
    }

    let image_backend = backend::resolve(&settings)?;
    let (converter, mut diagnostics) = Converter::new(conversion, image_backend)?.into_parts();
    report(&diagnostics);

    let output = converter.config().output.clone();
    if !no_backup {
        let backed_up = backup_existing(&output).map_err(|source| CliError::Backup {
            path: output.clone(),
            source,
        })?;
        if let Some(backup) = backed_up {
            println!("Backed up existing {} to {}", output.display(), backup.display());
        }
    }

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!(
        input = %converter.config().input.display(),
        output = %output.display(),
        "Starting conversion"
    );
    let result = converter.run(&reporter);

    if settings.workdir.is_none() {
        let scratch = backend::default_workdir();
        if scratch.exists() {
            debug!("Removing scratch directory {}", scratch.display());
            if let Err(e) = fs::remove_dir_all(&scratch) {
                warn!("Could not remove scratch directory {}: {}", scratch.display(), e);
            }
        }
    }

    let (summary, run_diagnostics) = result?.into_parts();
    report(&run_diagnostics);
    diagnostics.extend(run_diagnostics);

    if !quiet {
        print_summary(&summary, &output, diagnostics.len());
    }
    Ok(())
}
