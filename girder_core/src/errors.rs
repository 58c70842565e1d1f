//! # Error Types
//!
//! Structured error types for girder_core. Every numerical failure carries
//! the full analysis location (segment, point of interest, interval) so the
//! caller can decide whether to retry with a different configuration. The
//! engine never retries on its own.
//!
//! ## Taxonomy
//!
//! | Class          | Variants                                 | Handling                     |
//! |----------------|------------------------------------------|------------------------------|
//! | Configuration  | `Configuration`                          | fatal at first use           |
//! | Numerical      | `NonConvergence`, `DegenerateInput`      | fatal for one (interval, POI)|
//! | Input          | `InvalidInput`, `MissingData`            | fix the bridge description   |
//! | Defect         | `InvariantViolation`                     | data corruption              |
//! | Outer layer    | `Serialization`, `FileError`             | project/criteria loading     |
//!
//! Inapplicability is not an error; see [`crate::diagnostics::Applicability`].
//!
//! ## Example
//!
//! ```rust
//! use girder_core::errors::{EngineError, EngineResult};
//!
//! fn validate_area(area_in2: f64) -> EngineResult<()> {
//!     if area_in2 <= 0.0 {
//!         return Err(EngineError::invalid_input(
//!             "area_in2",
//!             area_in2.to_string(),
//!             "Area must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_area(-1.0).is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::{PoiId, SegmentKey};
use crate::timeline::IntervalIndex;

/// Result type alias for girder_core operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Where in the analysis a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisLocation {
    pub segment: Option<SegmentKey>,
    pub poi: Option<PoiId>,
    pub interval: Option<IntervalIndex>,
}

impl AnalysisLocation {
    pub fn new(segment: SegmentKey, poi: PoiId, interval: IntervalIndex) -> Self {
        AnalysisLocation {
            segment: Some(segment),
            poi: Some(poi),
            interval: Some(interval),
        }
    }

    pub fn at_poi(segment: SegmentKey, poi: PoiId) -> Self {
        AnalysisLocation {
            segment: Some(segment),
            poi: Some(poi),
            interval: None,
        }
    }

    /// Location with nothing known yet; filled in by the caller via `with_*`.
    pub fn unknown() -> Self {
        AnalysisLocation::default()
    }

    pub fn with_interval(mut self, interval: IntervalIndex) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl fmt::Display for AnalysisLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(segment) = self.segment {
            parts.push(format!("segment {}", segment));
        }
        if let Some(poi) = self.poi {
            parts.push(format!("poi {}", poi));
        }
        if let Some(interval) = self.interval {
            parts.push(format!("interval {}", interval));
        }
        if parts.is_empty() {
            write!(f, "unspecified location")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Structured error type for analysis operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum EngineError {
    /// Unsupported method selector or inconsistent criteria
    #[error("Configuration error for '{key}': {reason}")]
    Configuration { key: String, reason: String },

    /// An iterative numerical procedure did not converge
    #[error("{computation} did not converge after {iterations} iterations at {location} (residual {residual:e})")]
    NonConvergence {
        computation: String,
        location: AnalysisLocation,
        iterations: usize,
        residual: f64,
    },

    /// A numerical routine received non-physical input
    #[error("{computation} received degenerate input at {location}: {reason}")]
    DegenerateInput {
        computation: String,
        location: AnalysisLocation,
        reason: String,
    },

    /// An input value is invalid (out of range, wrong sign, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A collaborator has no data for the requested key
    #[error("Missing data: {what}")]
    MissingData { what: String },

    /// An internal identity failed to hold
    #[error("Invariant violated: {invariant} (expected {expected}, actual {actual})")]
    InvariantViolation {
        invariant: String,
        expected: f64,
        actual: f64,
    },

    /// JSON or TOML (de)serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },
}

impl EngineError {
    /// Create a Configuration error
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a NonConvergence error
    pub fn non_convergence(
        computation: impl Into<String>,
        location: AnalysisLocation,
        iterations: usize,
        residual: f64,
    ) -> Self {
        EngineError::NonConvergence {
            computation: computation.into(),
            location,
            iterations,
            residual,
        }
    }

    /// Create a DegenerateInput error
    pub fn degenerate(
        computation: impl Into<String>,
        location: AnalysisLocation,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::DegenerateInput {
            computation: computation.into(),
            location,
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingData error
    pub fn missing_data(what: impl Into<String>) -> Self {
        EngineError::MissingData { what: what.into() }
    }

    /// Create an InvariantViolation error
    pub fn invariant(invariant: impl Into<String>, expected: f64, actual: f64) -> Self {
        EngineError::InvariantViolation {
            invariant: invariant.into(),
            expected,
            actual,
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach location context to a numerical error raised without it.
    pub fn at(self, location: AnalysisLocation) -> Self {
        match self {
            EngineError::NonConvergence {
                computation,
                iterations,
                residual,
                ..
            } => EngineError::NonConvergence {
                computation,
                location,
                iterations,
                residual,
            },
            EngineError::DegenerateInput {
                computation,
                reason,
                ..
            } => EngineError::DegenerateInput {
                computation,
                location,
                reason,
            },
            other => other,
        }
    }

    /// Numerical failures are scoped to one (interval, POI) computation.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            EngineError::NonConvergence { .. } | EngineError::DegenerateInput { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Configuration { .. } => "CONFIGURATION",
            EngineError::NonConvergence { .. } => "NON_CONVERGENCE",
            EngineError::DegenerateInput { .. } => "DEGENERATE_INPUT",
            EngineError::InvalidInput { .. } => "INVALID_INPUT",
            EngineError::MissingData { .. } => "MISSING_DATA",
            EngineError::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            EngineError::Serialization { .. } => "SERIALIZATION_ERROR",
            EngineError::FileError { .. } => "FILE_ERROR",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization {
            reason: err.to_string(),
        }
    }
}
