//! The rule-store collaborator boundary.
//!
//! This workspace does not own rule persistence: some other service owns the
//! rule catalog and exposes it through this trait. The scheduler and API
//! layers depend on [`RuleStore`], never on a concrete implementation.

use async_trait::async_trait;
use seedkeeper_core::Rule;

use crate::error::RuleStoreError;

/// Loads the rule set configured for an instance, in no particular order
/// (the rule processor sorts by `(sortOrder, id)` itself).
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Return every rule configured for `instance_id`.
    async fn list_rules(&self, instance_id: &str) -> Result<Vec<Rule>, RuleStoreError>;
}
