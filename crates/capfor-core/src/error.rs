//! Unified error types for the capfor pipeline.
//!
//! This module provides a common error type [`CapforError`] shared by the
//! aggregation and forecasting stages. Domain-specific failures (an empty
//! region, a ragged feature matrix) are explicit variants so callers can
//! distinguish "skip this column" conditions from fatal ones.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for all capfor operations.
#[derive(Error, Debug)]
pub enum CapforError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required input dataset or region file is absent.
    #[error("missing input file: {path}\n{hint}")]
    MissingInputFile { path: PathBuf, hint: String },

    /// A capacity-factor column name does not match the
    /// `<region> <index> <energy-suffix>` format.
    #[error("unparseable capacity-factor column '{0}'")]
    UnparseableColumn(String),

    /// An energy type has no feature-set entry.
    #[error("unknown energy type for column '{0}'")]
    UnknownEnergyType(String),

    /// A region received zero grid points during aggregation. Averaging
    /// over it would divide by zero, so the whole aggregation aborts.
    #[error("region '{region}' was assigned no grid points")]
    EmptyRegionAssignment { region: String },

    /// Target and feature series lengths diverge.
    #[error("shape mismatch: expected {expected} timesteps, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// Parsing/deserialization errors
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CapforError.
pub type CapforResult<T> = Result<T, CapforError>;

impl From<anyhow::Error> for CapforError {
    fn from(err: anyhow::Error) -> Self {
        CapforError::Other(err.to_string())
    }
}

impl From<String> for CapforError {
    fn from(s: String) -> Self {
        CapforError::Other(s)
    }
}

impl From<&str> for CapforError {
    fn from(s: &str) -> Self {
        CapforError::Other(s.to_string())
    }
}
