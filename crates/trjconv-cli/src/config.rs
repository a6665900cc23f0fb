use crate::cli::{BackendChoice, ConvertArgs, FixArgs, PbcArgs};
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use trjconv::core::io::format::Format;
use trjconv::engine::config::{ConversionConfig, ConversionConfigBuilder};
use trjconv::engine::pbc::{FallbackPolicy, Granularity};

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct PartialTimeConfig {
    start: Option<f64>,
    step: Option<f64>,
    stride: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct PartialPbcConfig {
    mode: Option<Granularity>,
    backend: Option<BackendChoice>,
    gmx: Option<PathBuf>,
    #[serde(rename = "gmx-structure")]
    gmx_structure: Option<PathBuf>,
    #[serde(rename = "gmx-timeout")]
    gmx_timeout: Option<u64>,
    lenient: Option<bool>,
    workdir: Option<PathBuf>,
}

/// Settings for the imaging backend, resolved from the file and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub choice: BackendChoice,
    pub gmx: Option<PathBuf>,
    pub structure: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub workdir: Option<PathBuf>,
}

/// Everything a command needs: the core configuration and backend settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub conversion: ConversionConfig,
    pub backend: BackendSettings,
}

/// Contents of a `tinker-trjconv` TOML file; every field may be overridden on
/// the command line.
///
/// ```toml
/// template = "ref.gro"
///
/// [time]
/// start = 0.0
/// step = 0.5
/// stride = 2.0
///
/// [pbc]
/// mode = "res"
/// backend = "gmx"
/// gmx-timeout = 120
/// ```
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PartialConversionConfig {
    template: Option<PathBuf>,
    time: Option<PartialTimeConfig>,
    pbc: Option<PartialPbcConfig>,
}

impl PartialConversionConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::ConfigFile {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads `path` when given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn merge_with_convert_args(mut self, args: &ConvertArgs) -> Result<ResolvedConfig> {
        self.apply_set_values(&args.set_values)?;
        let time = self.time.take().unwrap_or_default();
        let pbc = self.pbc.take().unwrap_or_default();

        let mut builder = ConversionConfigBuilder::new()
            .input(args.input.clone())
            .output(args.output.clone());
        if let Some(template) = args.template.clone().or(self.template) {
            builder = builder.template(template);
        }
        if let Some(start) = args.t0.or(time.start) {
            builder = builder.start_time(start);
        }
        if let Some(step) = args.timestep.or(time.step) {
            builder = builder.time_step(step);
        }
        if let Some(stride) = args.dt.or(time.stride) {
            builder = builder.stride(stride);
        }

        let (builder, backend) = Self::merge_pbc(builder, &args.pbc, pbc);
        let conversion = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
        Ok(ResolvedConfig {
            conversion,
            backend,
        })
    }

    pub fn merge_with_fix_args(mut self, args: &FixArgs) -> Result<ResolvedConfig> {
        self.apply_set_values(&args.set_values)?;
        let pbc = self.pbc.take().unwrap_or_default();
        if args.pbc.granularity.or(pbc.mode).is_none() {
            return Err(CliError::Config(
                "A PBC mode is required for 'fix', via --pbc or `pbc.mode`.".to_string(),
            ));
        }

        let builder = ConversionConfigBuilder::new()
            .input(args.input.clone())
            .input_format(Format::Tinker)
            .output(args.output.clone())
            .output_format(Format::Tinker);
        let (builder, backend) = Self::merge_pbc(builder, &args.pbc, pbc);
        let conversion = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
        Ok(ResolvedConfig {
            conversion,
            backend,
        })
    }

    fn merge_pbc(
        mut builder: ConversionConfigBuilder,
        cli: &PbcArgs,
        file: PartialPbcConfig,
    ) -> (ConversionConfigBuilder, BackendSettings) {
        if let Some(granularity) = cli.granularity.or(file.mode) {
            builder = builder.pbc(granularity);
        }
        let lenient = cli.lenient_pbc || file.lenient.unwrap_or(false);
        builder = builder.fallback(if lenient {
            FallbackPolicy::Lenient
        } else {
            FallbackPolicy::Strict
        });

        let backend = BackendSettings {
            choice: cli.backend.or(file.backend).unwrap_or(BackendChoice::Auto),
            gmx: cli.gmx.clone().or(file.gmx),
            structure: cli.gmx_structure.clone().or(file.gmx_structure),
            timeout: cli.gmx_timeout.or(file.gmx_timeout).map(Duration::from_secs),
            workdir: file.workdir,
        };
        (builder, backend)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let float = || {
                value_str.parse::<f64>().map_err(|_| {
                    CliError::Config(format!("Invalid float value for {}: {}", key, value_str))
                })
            };

            match key {
                "template" => self.template = Some(PathBuf::from(value_str)),
                "time.start" => self.time.get_or_insert_with(Default::default).start = Some(float()?),
                "time.step" => self.time.get_or_insert_with(Default::default).step = Some(float()?),
                "time.stride" => {
                    self.time.get_or_insert_with(Default::default).stride = Some(float()?)
                }
                "pbc.mode" => {
                    self.pbc.get_or_insert_with(Default::default).mode =
                        Some(value_str.parse().map_err(|e| CliError::Config(format!("{e}")))?)
                }
                "pbc.gmx" => {
                    self.pbc.get_or_insert_with(Default::default).gmx = Some(PathBuf::from(value_str))
                }
                "pbc.lenient" => {
                    self.pbc.get_or_insert_with(Default::default).lenient =
                        Some(value_str.parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid boolean value for {}: {}",
                                key, value_str
                            ))
                        })?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
