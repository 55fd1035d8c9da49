//! Error types for quire.

use thiserror::Error;

/// Errors raised while reading or writing a PDF.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Structural violation of the file format.
    #[error("PDF format error: {0}")]
    Format(String),

    /// Stream filter that has no decoder.
    #[error("unsupported stream filter: {0}")]
    UnsupportedFilter(String),

    /// Compressed payload that failed to decode.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// Returns a [`PdfError::Format`] from the enclosing function unless the condition holds.
#[macro_export]
macro_rules! ensure_format {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::PdfError::Format(format!($($arg)+)));
        }
    };
}
