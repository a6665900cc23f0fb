use super::execute;
use crate::cli::FixArgs;
use crate::config::PartialConversionConfig;
use crate::error::Result;
use tracing::info;

pub fn run(args: FixArgs, quiet: bool) -> Result<()> {
    let partial_config = PartialConversionConfig::load(args.config.as_deref())?;
    let resolved = partial_config.merge_with_fix_args(&args)?;
    info!(
        pbc = ?resolved.conversion.pbc.as_ref().map(|p| p.granularity),
        "Re-imaging Tinker trajectory"
    );
    execute(resolved, args.no_backup, quiet)
}
