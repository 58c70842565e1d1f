//! # Diagnostics
//!
//! Warnings produced alongside a computation's primary result, and the
//! explicit "not applicable" outcome. Renderers decide how to show them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AnalysisLocation;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

/// A single warning or note attached to an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable machine-readable code, e.g. `ANCHOR_SET_ZONE_CLAMPED`
    pub code: String,
    pub message: String,
    pub location: AnalysisLocation,
}

impl Diagnostic {
    pub fn warning(code: impl Into<String>, message: impl Into<String>, location: AnalysisLocation) -> Self {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            location,
        };
        tracing::warn!(code = %diagnostic.code, location = %location, "{}", diagnostic.message);
        diagnostic
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>, location: AnalysisLocation) -> Self {
        Diagnostic {
            severity: Severity::Info,
            code: code.into(),
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} at {}: {}", self.severity, self.code, self.location, self.message)
    }
}

/// Result of a check that may not apply at a given interval or location.
///
/// `NotApplicable` is distinct from a zero or passing value so that
/// downstream consumers can render "N/A" instead of a false pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value")]
pub enum Applicability<T> {
    Applicable(T),
    NotApplicable { reason: String },
}

impl<T> Applicability<T> {
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Applicability::NotApplicable { reason: reason.into() }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Applicability::Applicable(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Applicability::Applicable(value) => Some(value),
            Applicability::NotApplicable { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Applicability<U> {
        match self {
            Applicability::Applicable(value) => Applicability::Applicable(f(value)),
            Applicability::NotApplicable { reason } => Applicability::NotApplicable { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_applicable_is_not_a_value() {
        let na: Applicability<f64> = Applicability::not_applicable("no composite deck");
        assert!(!na.is_applicable());
        assert!(na.as_option().is_none());
        assert_eq!(Applicability::Applicable(2.0).map(|x| x * 2.0).as_option(), Some(&4.0));
    }

    #[test]
    fn test_applicability_serialization() {
        let na: Applicability<f64> = Applicability::not_applicable("before deck cast");
        let json = serde_json::to_string(&na).unwrap();
        assert!(json.contains("NotApplicable"));
        let back: Applicability<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, na);
    }
}
