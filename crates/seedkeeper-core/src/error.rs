//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by domain-model level operations.
///
/// Condition evaluation itself never returns an error (invalid inputs
/// collapse to `false` per the evaluator's contract); this type exists for
/// the handful of operations that do have a meaningful failure mode, such
/// as parsing a malformed tracker pattern list at rule-save time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A condition tree exceeded the maximum allowed nesting depth.
    #[error("condition tree exceeds maximum depth of {max}")]
    ConditionTooDeep {
        /// Maximum depth allowed.
        max: u32,
    },

    /// A glob pattern used in a tracker rule or condition failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern text that failed to compile.
        pattern: String,
        /// Human-readable compiler error.
        reason: String,
    },
}

/// Convenience alias for fallible domain operations.
pub type Result<T> = std::result::Result<T, CoreError>;
