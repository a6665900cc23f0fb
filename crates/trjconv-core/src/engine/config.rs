use super::pbc::{FallbackPolicy, Granularity};
use crate::core::io::format::{Format, FormatLookupError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Format(#[from] FormatLookupError),
}

/// How frame times are assigned and which frames are kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    /// Time of the first frame, in ps.
    pub start_time: f64,
    /// Time between consecutive input frames, in ps.
    pub time_step: Option<f64>,
    /// Output interval in ps; `None` keeps every frame.
    pub stride: Option<f64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            time_step: None,
            stride: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbcConfig {
    pub granularity: Granularity,
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    pub input: PathBuf,
    pub input_format: Format,
    pub output: PathBuf,
    pub output_format: Format,
    /// Structure file supplying what the input format lacks.
    pub template: Option<PathBuf>,
    pub timing: TimingConfig,
    /// `None` leaves coordinates as read.
    pub pbc: Option<PbcConfig>,
}

#[derive(Default)]
pub struct ConversionConfigBuilder {
    input: Option<PathBuf>,
    input_format: Option<Format>,
    output: Option<PathBuf>,
    output_format: Option<Format>,
    template: Option<PathBuf>,
    start_time: Option<f64>,
    time_step: Option<f64>,
    stride: Option<f64>,
    pbc: Option<Granularity>,
    fallback: Option<FallbackPolicy>,
}

fn require_positive(name: &'static str, value: Option<f64>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a positive number of ps, got {v}"),
        }),
        _ => Ok(()),
    }
}

impl ConversionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, path: PathBuf) -> Self {
        self.input = Some(path);
        self
    }
    /// Overrides the format otherwise inferred from the input extension.
    pub fn input_format(mut self, format: Format) -> Self {
        self.input_format = Some(format);
        self
    }
    pub fn output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }
    pub fn output_format(mut self, format: Format) -> Self {
        self.output_format = Some(format);
        self
    }
    pub fn template(mut self, path: PathBuf) -> Self {
        self.template = Some(path);
        self
    }
    pub fn start_time(mut self, ps: f64) -> Self {
        self.start_time = Some(ps);
        self
    }
    pub fn time_step(mut self, ps: f64) -> Self {
        self.time_step = Some(ps);
        self
    }
    pub fn stride(mut self, ps: f64) -> Self {
        self.stride = Some(ps);
        self
    }
    pub fn pbc(mut self, granularity: Granularity) -> Self {
        self.pbc = Some(granularity);
        self
    }
    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = Some(policy);
        self
    }

    pub fn build(self) -> Result<ConversionConfig, ConfigError> {
        let input = self.input.ok_or(ConfigError::MissingParameter("input"))?;
        let output = self.output.ok_or(ConfigError::MissingParameter("output"))?;
        let input_format = match self.input_format {
            Some(format) => format,
            None => Format::from_path(&input)?,
        };
        let output_format = match self.output_format {
            Some(format) => format,
            None => Format::from_path(&output)?,
        };

        require_positive("time_step", self.time_step)?;
        require_positive("stride", self.stride)?;
        // Only G96/GRO store frame times, and striding is defined on time.
        if self.time_step.is_none() && (!output_format.is_tinker() || self.stride.is_some()) {
            return Err(ConfigError::MissingParameter("time_step"));
        }
        let start_time = self.start_time.unwrap_or(0.0);
        if !start_time.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "start_time",
                reason: format!("must be finite, got {start_time}"),
            });
        }

        Ok(ConversionConfig {
            input,
            input_format,
            output,
            output_format,
            template: self.template,
            timing: TimingConfig {
                start_time,
                time_step: self.time_step,
                stride: self.stride,
            },
            pbc: self.pbc.map(|granularity| PbcConfig {
                granularity,
                fallback: self.fallback.unwrap_or_default(),
            }),
        })
    }
}
