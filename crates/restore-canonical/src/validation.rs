use thiserror::Error;

/// Validation errors for canonical primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When a value is not in the order its collection requires.
    #[error("{field} ('{value}') is out of order")]
    OutOfOrder {
        /// Collection whose order was violated.
        field: &'static str,
        /// First offending value.
        value: String,
    },
    /// When two entries of a collection share an identifier.
    #[error("{field} ('{value}') is duplicated")]
    Duplicate {
        /// Collection containing the duplicate.
        field: &'static str,
        /// Duplicated identifier.
        value: String,
    },
    /// When two fields that must agree do not.
    #[error("{field} ('{value}') does not match '{expected}'")]
    Mismatch {
        /// Field that disagrees.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Value it had to match.
        expected: String,
    },
    /// When a conditionally required field is missing.
    #[error("{field} is required: {reason}")]
    Missing {
        /// Field that is missing.
        field: &'static str,
        /// Condition that requires it.
        reason: &'static str,
    },
}
