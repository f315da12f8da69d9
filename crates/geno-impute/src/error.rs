//! Error types for genotype imputation.
//!
//! Input validation errors (`EmptyMatrix`, `RaggedMatrix`, `InvalidCategory`)
//! are raised when a [`GenotypeMatrix`](crate::types::GenotypeMatrix) is built,
//! before any distance is computed. Per-locus failures (`AllMissingColumn`,
//! `InsufficientNeighbors`) are raised by the imputer and may be tolerated by
//! the configured policies.
//!
//! Errors serialize as `{ code, message }` so they can be embedded in JSON
//! reports.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for genotype imputation.
#[derive(Error, Debug)]
pub enum ImputationError {
    /// Every sample is missing at this locus, so there is nothing to vote with.
    #[error("Locus {locus} has no observed genotypes")]
    AllMissingColumn { locus: usize },

    /// Fewer observed samples than K at this locus under the fail-fast policy.
    #[error("Locus {locus} has {available} observed samples, fewer than the {requested} neighbors requested")]
    InsufficientNeighbors {
        locus: usize,
        available: usize,
        requested: usize,
    },

    /// A cell holds a value outside the declared alphabet.
    #[error("Invalid genotype '{value}' at sample {sample}, locus {locus}")]
    InvalidCategory {
        sample: usize,
        locus: usize,
        value: String,
    },

    /// The matrix has no samples or no loci.
    #[error("Genotype matrix is empty")]
    EmptyMatrix,

    /// A row has a different number of loci than the first row.
    #[error("Row {row} has {found} loci, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Two matrices (or a matrix and its labels) disagree on shape.
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A locus index past the end of the matrix.
    #[error("Locus {locus} is out of range for a matrix with {n_loci} loci")]
    LocusOutOfRange { locus: usize, n_loci: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (e.g., thread pool construction failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputationError>,
    },
}

impl ImputationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AllMissingColumn { .. } => "ALL_MISSING_COLUMN",
            Self::InsufficientNeighbors { .. } => "INSUFFICIENT_NEIGHBORS",
            Self::InvalidCategory { .. } => "INVALID_CATEGORY",
            Self::EmptyMatrix => "EMPTY_MATRIX",
            Self::RaggedMatrix { .. } => "RAGGED_MATRIX",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::LocusOutOfRange { .. } => "LOCUS_OUT_OF_RANGE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a per-locus failure that leaves the other loci imputable.
    pub fn is_locus_local(&self) -> bool {
        match self {
            Self::AllMissingColumn { .. } | Self::InsufficientNeighbors { .. } => true,
            Self::WithContext { source, .. } => source.is_locus_local(),
            _ => false,
        }
    }

    /// Check if this error was raised by input validation.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::InvalidCategory { .. }
            | Self::EmptyMatrix
            | Self::RaggedMatrix { .. }
            | Self::ShapeMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_invalid_input(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ImputationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputationError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ImputationError::EmptyMatrix.error_code(), "EMPTY_MATRIX");
        assert_eq!(
            ImputationError::AllMissingColumn { locus: 3 }.error_code(),
            "ALL_MISSING_COLUMN"
        );
    }

    #[test]
    fn test_is_locus_local() {
        assert!(ImputationError::AllMissingColumn { locus: 0 }.is_locus_local());
        assert!(
            ImputationError::InsufficientNeighbors {
                locus: 0,
                available: 1,
                requested: 3
            }
            .is_locus_local()
        );
        assert!(!ImputationError::EmptyMatrix.is_locus_local());
    }

    #[test]
    fn test_is_invalid_input() {
        let error = ImputationError::InvalidCategory {
            sample: 1,
            locus: 2,
            value: "7".to_string(),
        };
        assert!(error.is_invalid_input());
        assert!(!ImputationError::InvalidConfig("k".to_string()).is_invalid_input());
    }

    #[test]
    fn test_error_serialization() {
        let error = ImputationError::AllMissingColumn { locus: 4 };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("ALL_MISSING_COLUMN"));
        assert!(json.contains("Locus 4"));
    }

    #[test]
    fn test_with_context() {
        let error = ImputationError::EmptyMatrix.with_context("Loading dogs.tsv");
        assert!(error.to_string().contains("Loading dogs.tsv"));
        assert_eq!(error.error_code(), "EMPTY_MATRIX");
        assert!(error.is_invalid_input());
    }
}
