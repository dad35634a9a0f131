//! Cross-section errors.

use mt_core::MtError;
use thiserror::Error;

/// Result type for cross-section operations.
pub type XsResult<T> = Result<T, XsError>;

/// Errors raised while assembling or querying cross sections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XsError {
    /// A per-group array has the wrong length.
    #[error("Material '{material}': {what} has {actual} entries, expected {expected}")]
    Shape {
        material: String,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Negative, zero (for Σt) or non-finite data.
    #[error("Material '{material}': non-physical {what} in group {group}: {value}")]
    NonPhysical {
        material: String,
        what: &'static str,
        group: usize,
        value: f64,
    },

    /// Fissionable material without a fission spectrum.
    #[error("Material '{material}' is fissionable but chi is zero")]
    MissingChi { material: String },

    /// Materials in one library disagree on the group structure.
    #[error("Material '{material}' has {actual} groups, library uses {expected}")]
    GroupMismatch {
        material: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown material '{name}'")]
    UnknownMaterial { name: String },

    #[error("Group {group} out of range ({num_groups} groups)")]
    GroupOutOfRange { group: usize, num_groups: usize },
}

impl From<XsError> for MtError {
    fn from(err: XsError) -> Self {
        match err {
            XsError::UnknownMaterial { .. } | XsError::GroupOutOfRange { .. } => {
                MtError::InvalidArg {
                    what: err.to_string(),
                }
            }
            other => MtError::Invariant {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = XsError::UnknownMaterial {
            name: "UO2".into(),
        };
        assert!(err.to_string().contains("UO2"));
    }

    #[test]
    fn error_to_mt_error() {
        let err = XsError::MissingChi {
            material: "fuel".into(),
        };
        let mt: MtError = err.into();
        assert!(matches!(mt, MtError::Invariant { .. }));
    }
}
