//! Crate error types.

use thiserror::Error;

/// Errors surfaced by the [`crate::rule_store::RuleStore`] collaborator boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleStoreError {
    /// The backing rule store could not produce a rule set for the instance.
    #[error("failed to load rules for instance '{instance_id}': {reason}")]
    Load {
        /// Instance the load was attempted for.
        instance_id: String,
        /// Human-readable failure detail.
        reason: String,
    },
}
