use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use trjconv::engine::pbc::Granularity;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    name = "tinker-trjconv",
    author = "mizu-bai",
    version,
    about = "A Tinker trajectory converter: Tinker XYZ/ARC to and from GROMACS g96/gro, with PBC re-imaging.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a trajectory between Tinker XYZ/ARC and GROMACS g96/gro.
    Convert(ConvertArgs),
    /// Re-image a Tinker trajectory into its periodic box, keeping it in Tinker format.
    Fix(FixArgs),
}

/// Which imaging backend handles residue/molecule re-imaging.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendChoice {
    /// GROMACS when it can be found, otherwise none.
    Auto,
    /// Always run `gmx trjconv`.
    Gmx,
    /// In-process re-imaging from connectivity.
    Native,
    /// Only per-atom wrapping is available.
    None,
}

/// Options shared by every command that can re-image coordinates.
#[derive(Args, Debug, Clone, Default)]
pub struct PbcArgs {
    /// Re-image coordinates into the box, keeping atoms, residues or molecules whole.
    #[arg(long = "pbc", value_name = "atom|res|mol")]
    pub granularity: Option<Granularity>,

    /// Imaging backend for residue and molecule re-imaging.
    #[arg(long, value_enum, value_name = "BACKEND")]
    pub backend: Option<BackendChoice>,

    /// Path to the GROMACS executable (defaults to $GMX, then `gmx` on PATH).
    #[arg(long, value_name = "PATH")]
    pub gmx: Option<PathBuf>,

    /// Run-input or structure file passed to `gmx trjconv -s`.
    #[arg(long, value_name = "PATH")]
    pub gmx_structure: Option<PathBuf>,

    /// Abort a `gmx trjconv` call that runs longer than this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub gmx_timeout: Option<u64>,

    /// Fall back to per-atom wrapping when no backend can keep residues or molecules whole.
    #[arg(long)]
    pub lenient_pbc: bool,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    // --- Files ---
    /// Input trajectory: Tinker xyz/txyz/arc, g96 or gro.
    #[arg(short = 'f', long = "input", required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Structure template: a Tinker file for Tinker output, g96/gro for GROMACS output.
    #[arg(short = 's', long = "template", value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Output trajectory: Tinker xyz/txyz/arc, g96 or gro.
    #[arg(short, long, default_value = "traj.g96", value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Timing ---
    /// Time step between input frames, in ps.
    #[arg(long, value_name = "PS")]
    pub timestep: Option<f64>,

    /// Time of the first frame, in ps [default: 0.0].
    #[arg(long, value_name = "PS")]
    pub t0: Option<f64>,

    /// Only write frames whose time modulo this interval equals the first frame's.
    #[arg(long, value_name = "PS")]
    pub dt: Option<f64>,

    // --- Re-imaging ---
    #[command(flatten)]
    pub pbc: PbcArgs,

    /// Overwrite an existing output file instead of renaming it to `#name.N#`.
    #[arg(long)]
    pub no_backup: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S time.step=0.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `fix` subcommand.
#[derive(Args, Debug)]
pub struct FixArgs {
    /// Input Tinker trajectory.
    #[arg(short = 'f', long = "input", required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output Tinker trajectory.
    #[arg(short, long, default_value = "mol.txyz", value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub pbc: PbcArgs,

    /// Overwrite an existing output file instead of renaming it to `#name.N#`.
    #[arg(long)]
    pub no_backup: bool,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
