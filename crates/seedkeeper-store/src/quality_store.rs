//! The quality-profile-store collaborator boundary.
//!
//! Like [`crate::rule_store::RuleStore`], this workspace does not own
//! quality profile definitions (ranking tiers and their value orders):
//! some other service owns the catalog and exposes it through this trait.

use async_trait::async_trait;
use seedkeeper_indices::QualityProfile;

use crate::error::RuleStoreError;

/// Loads the quality profiles referenced by an instance's rules, in no
/// particular order.
#[async_trait]
pub trait QualityProfileStore: Send + Sync {
    /// Return every quality profile configured for `instance_id`.
    async fn list_profiles(&self, instance_id: &str) -> Result<Vec<QualityProfile>, RuleStoreError>;
}
