use std::fmt;

use serde::Serialize;

/// Per-record detail attached to validation errors and dropped-record reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDetail {
    pub sheet: String,
    /// 1-based spreadsheet row (the header is row 1).
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_code: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub enum AdjustError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown store, empty column name, etc.).
    ConfigValidation(String),
    /// Input container could not be opened or is not tabular.
    Parse(String),
    /// Input parsed but yields no usable records.
    Validation { message: String, details: Vec<RecordDetail> },
    /// Employee or rate reference store could not be queried.
    ReferenceUnavailable { store: String, message: String },
    /// Output artifact could not be generated.
    Output(String),
    /// IO error (staging, file read, etc.).
    Io(String),
}

/// Caller-facing classification of an [`AdjustError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ClientInput,
    Service,
    Config,
}

impl AdjustError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), details: Vec::new() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) | Self::Validation { .. } => ErrorKind::ClientInput,
            Self::ReferenceUnavailable { .. } | Self::Output(_) | Self::Io(_) => ErrorKind::Service,
            Self::ConfigParse(_) | Self::ConfigValidation(_) => ErrorKind::Config,
        }
    }

    pub fn details(&self) -> &[RecordDetail] {
        match self {
            Self::Validation { details, .. } => details,
            _ => &[],
        }
    }
}

impl fmt::Display for AdjustError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Parse(msg) => write!(f, "cannot parse input: {msg}"),
            Self::Validation { message, details } => {
                if details.is_empty() {
                    write!(f, "{message}")
                } else {
                    write!(f, "{message} ({} record(s))", details.len())
                }
            }
            Self::ReferenceUnavailable { store, message } => {
                write!(f, "reference store '{store}' unavailable: {message}")
            }
            Self::Output(msg) => write!(f, "cannot build output: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for AdjustError {}
