use thiserror::Error;

#[derive(Error, Debug)]
pub enum PpgError {
    #[error("Serial device error: {0}")]
    SerialDevice(String),

    #[error("No serial ports found")]
    NoPorts,

    #[error("Invalid port selection: {0}")]
    InvalidSelection(String),

    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("Insufficient data: need {needed} samples, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Filter produced non-finite output at index {0}")]
    NonFinite(usize),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PpgError>;

/// Rejection reasons for a line that carries the `PPG_RAW` marker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected at least {expected} fields, got {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("field {index} is not an integer: {value:?}")]
    InvalidField { index: usize, value: String },
}
