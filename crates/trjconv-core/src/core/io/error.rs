use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{format} parse error on line {line}: {kind}")]
    Parse {
        format: &'static str,
        line: usize,
        kind: ParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Inconsistent data: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("Invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Required field {field} is missing")]
    MissingField { field: &'static str },
    #[error("Block '{block}' is not terminated by END")]
    UnterminatedBlock { block: String },
}

impl FormatError {
    pub(crate) fn parse(format: &'static str, line: usize, kind: ParseErrorKind) -> Self {
        Self::Parse { format, line, kind }
    }
}

/// Parses `value` as `T`, mapping failure onto a [`FormatError::Parse`].
pub(crate) fn parse_int<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
    format: &'static str,
    line: usize,
) -> Result<T, FormatError> {
    value.trim().parse().map_err(|_| {
        FormatError::parse(
            format,
            line,
            ParseErrorKind::InvalidInt {
                field,
                value: value.trim().to_string(),
            },
        )
    })
}

pub(crate) fn parse_float(
    value: &str,
    field: &'static str,
    format: &'static str,
    line: usize,
) -> Result<f64, FormatError> {
    value.trim().parse().map_err(|_| {
        FormatError::parse(
            format,
            line,
            ParseErrorKind::InvalidFloat {
                field,
                value: value.trim().to_string(),
            },
        )
    })
}
