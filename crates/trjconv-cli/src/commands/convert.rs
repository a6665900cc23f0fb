use super::execute;
use crate::cli::ConvertArgs;
use crate::config::PartialConversionConfig;
use crate::error::Result;
use tracing::info;

pub fn run(args: ConvertArgs, quiet: bool) -> Result<()> {
    let partial_config = PartialConversionConfig::load(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let resolved = partial_config.merge_with_convert_args(&args)?;
    info!(
        input_format = %resolved.conversion.input_format,
        output_format = %resolved.conversion.output_format,
        "Resolved conversion"
    );
    execute(resolved, args.no_backup, quiet)
}
