//! trie-esn error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EsnError {
    /// A symbol at or above the configured alphabet size.
    #[error("OutOfRangeSymbol: symbol {symbol} outside alphabet of size {alphabet_size}")]
    OutOfRangeSymbol { symbol: u8, alphabet_size: usize },

    #[error("NumericOverflow: {0}")]
    NumericOverflow(String),

    #[error("ConfigurationError: {0}")]
    Configuration(String),

    #[error("DimensionMismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("InvalidLabel: gold index {index} but readout has {classes} classes")]
    InvalidLabel { index: usize, classes: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EsnError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EsnError>;
