//! Contract errors raised before any storage I/O happens.

use crate::status::HandlingStatus;

/// Argument and contract violations detected while building an operation.
///
/// These are programmer errors: they are raised at construction time and are
/// never caught or retried by the handling engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("{parameter} must not be empty or whitespace")]
    Blank { parameter: &'static str },

    #[error("{parameter} '{value}' is reserved for internal use")]
    ReservedConcern {
        parameter: &'static str,
        value: String,
    },

    #[error("{parameter} contains at least one null element")]
    NullTagElement { parameter: &'static str },

    #[error("{parameter} must contain at least one element")]
    Empty { parameter: &'static str },

    #[error("{parameter} is Unknown")]
    UnknownStrategy { parameter: &'static str },

    #[error("{parameter} '{value}' is not a supported value")]
    UnsupportedStrategy {
        parameter: &'static str,
        value: String,
    },

    #[error("retentionCount is required when existingRecordStrategy is {strategy}")]
    MissingRetentionCount { strategy: String },

    #[error(
        "retentionCount must not be specified when existingRecordStrategy is {strategy}; it only applies to pruning strategies"
    )]
    RetentionCountWithoutPruning { strategy: String },

    #[error("retentionCount must not be negative (got {count})")]
    NegativeRetentionCount { count: i64 },

    #[error("{parameter} must be positive (got {value})")]
    NonPositive { parameter: &'static str, value: i64 },

    #[error("{parameter} is malformed: {message}")]
    Malformed {
        parameter: &'static str,
        message: String,
    },
}

/// Raised when a set of statuses falls through every composition rule.
///
/// This signals a status value that the reducer was never taught about; it
/// is fatal and must not be defaulted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositeStatusError {
    #[error("cannot reduce to a composite status: {statuses:?}")]
    CannotReduce { statuses: Vec<HandlingStatus> },
}

/// Shorthand for a non-blank string check.
pub fn require_non_blank(parameter: &'static str, value: &str) -> Result<(), OperationError> {
    if value.trim().is_empty() {
        return Err(OperationError::Blank { parameter });
    }
    Ok(())
}
