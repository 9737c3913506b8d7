//! Error taxonomy shared by every opfcost crate.
//!
//! Each variant maps to one failure category of the costing pipeline. None of
//! them is transient: there is no retry anywhere in the core, so every error is
//! surfaced to the caller as-is.
//!
//! # Example
//!
//! ```
//! use opfcost_core::{CostError, CostResult};
//!
//! fn read_count(text: &str) -> CostResult<usize> {
//!     text.trim()
//!         .parse()
//!         .map_err(|_| CostError::config(format!("'{text}' is not a count")))
//! }
//!
//! assert_eq!(read_count(" 12 ").unwrap(), 12);
//! assert!(matches!(read_count("x"), Err(CostError::Configuration(_))));
//! ```

use thiserror::Error;

/// Unified error type for case parsing and distributed costing.
#[derive(Error, Debug)]
pub enum CostError {
    /// Malformed section nesting in a case file.
    #[error("Format error at line {line}: {message}")]
    Format { line: usize, message: String },

    /// A row or field of a dynamic table could not be coerced.
    #[error("Parse error in table '{table}' row {row}: {message}")]
    Parse {
        table: String,
        row: usize,
        message: String,
    },

    /// Unknown table, column or unit identity.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Caller preconditions violated before any solving starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Workers disagree on the base cost. Fatal for the whole group.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// The solver did not converge or failed outright.
    #[error("Solver failure: {0}")]
    SolverFailure(String),

    /// File access errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using CostError.
pub type CostResult<T> = Result<T, CostError>;

impl CostError {
    pub fn lookup(message: impl Into<String>) -> Self {
        CostError::Lookup(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        CostError::Configuration(message.into())
    }

    pub fn solver(message: impl Into<String>) -> Self {
        CostError::SolverFailure(message.into())
    }
}

// Wrapped anyhow errors come from file helpers; they carry no better category.
impl From<anyhow::Error> for CostError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<CostError>() {
            Ok(inner) => return inner,
            Err(other) => other,
        };
        let kind = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<std::io::Error>())
            .map(std::io::Error::kind)
            .unwrap_or(std::io::ErrorKind::Other);
        CostError::Io(std::io::Error::new(kind, format!("{err:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CostError::Parse {
            table: "gen".into(),
            row: 3,
            message: "expected 21 or 25 fields, found 7".into(),
        };
        let text = err.to_string();
        assert!(text.contains("table 'gen'"));
        assert!(text.contains("row 3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CostError = io_err.into();
        assert!(matches!(err, CostError::Io(_)));
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_category() {
        let wrapped = anyhow::Error::new(CostError::lookup("no gen at bus 7"));
        let err: CostError = wrapped.into();
        assert!(matches!(err, CostError::Lookup(_)));
    }

    #[test]
    fn test_anyhow_context_keeps_io_kind() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let wrapped = anyhow::Error::new(missing).context("opening case 'absent.m'");
        match CostError::from(wrapped) {
            CostError::Io(io) => {
                assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
                assert!(io.to_string().contains("absent.m"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_plain_anyhow_message_becomes_other_io() {
        let err = CostError::from(anyhow::anyhow!("unexpected end of input"));
        assert!(matches!(err, CostError::Io(ref io) if io.kind() == std::io::ErrorKind::Other));
    }
}
