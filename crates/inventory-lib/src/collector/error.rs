//! Per-unit collection errors
//!
//! Every variant is recoverable for the run as a whole: the failing node or
//! namespace is left out of the snapshot and the run moves on.

use serde::Serialize;
use thiserror::Error;

/// Why a node or namespace could not be collected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectionError {
    #[error("no pods in namespace {unit}")]
    NoPods { unit: String },

    #[error("malformed data for {unit}: {reason}")]
    MalformedData { unit: String, reason: String },

    #[error("could not build record for {unit}: {reason}")]
    ConstructionFailure { unit: String, reason: String },

    #[error("metrics unavailable for {unit}: {reason}")]
    MetricsUnavailable { unit: String, reason: String },
}

/// Discriminant of [`CollectionError`], for reports and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoPods,
    MalformedData,
    ConstructionFailure,
    MetricsUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoPods => "no_pods",
            ErrorKind::MalformedData => "malformed_data",
            ErrorKind::ConstructionFailure => "construction_failure",
            ErrorKind::MetricsUnavailable => "metrics_unavailable",
        }
    }
}

impl CollectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectionError::NoPods { .. } => ErrorKind::NoPods,
            CollectionError::MalformedData { .. } => ErrorKind::MalformedData,
            CollectionError::ConstructionFailure { .. } => ErrorKind::ConstructionFailure,
            CollectionError::MetricsUnavailable { .. } => ErrorKind::MetricsUnavailable,
        }
    }

    /// Soft errors degrade a record instead of dropping it
    pub fn is_soft(&self) -> bool {
        matches!(self, CollectionError::MetricsUnavailable { .. })
    }

    pub(crate) fn no_pods(unit: &str) -> Self {
        CollectionError::NoPods {
            unit: unit.to_string(),
        }
    }

    pub(crate) fn malformed(unit: &str, reason: impl ToString) -> Self {
        CollectionError::MalformedData {
            unit: unit.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn construction(unit: &str, reason: impl ToString) -> Self {
        CollectionError::ConstructionFailure {
            unit: unit.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn metrics(unit: &str, reason: impl ToString) -> Self {
        CollectionError::MetricsUnavailable {
            unit: unit.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CollectionError::no_pods("ns").kind(), ErrorKind::NoPods);
        assert_eq!(
            CollectionError::malformed("ns", "bad").kind(),
            ErrorKind::MalformedData
        );
        assert!(CollectionError::metrics("node-1", "down").is_soft());
        assert!(!CollectionError::construction("ns", "nan").is_soft());
    }

    #[test]
    fn test_error_display() {
        let err = CollectionError::malformed("shop", "pod without spec");
        assert_eq!(err.to_string(), "malformed data for shop: pod without spec");
        assert_eq!(ErrorKind::NoPods.as_str(), "no_pods");
    }
}
