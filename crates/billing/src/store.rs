//! Persistence seam
//!
//! The engine does not own a database. It reads and writes organization
//! entitlement data through [`OrganizationStore`], implemented by the
//! platform's persistence layer. An in-memory implementation is provided for
//! tests and embedding.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use glowdesk_shared::{OrgId, Plan};

use crate::error::{BillingError, BillingResult};
use crate::features::FeatureSet;

/// Organization fields the billing engine reads
#[derive(Debug, Clone)]
pub struct OrganizationRecord {
    pub id: OrgId,
    pub plan: Plan,
    /// Serialized [`crate::state::AddonState`] blob; may be null or malformed
    /// in old records
    pub addons_json: Option<String>,
}

/// Entitlement fields written back to the organization record after a
/// lifecycle operation
#[derive(Debug, Clone)]
pub struct EntitlementUpdate {
    /// Re-serialized add-on state blob
    pub addons_json: String,
    /// Resolved feature flags, persisted as boolean columns
    pub features: FeatureSet,
}

/// Storage contract for organization entitlement state.
///
/// # Concurrency contract
///
/// Lifecycle operations are read-modify-write sequences over a single
/// organization record. Implementations MUST let the caller scope each
/// operation to a transaction or an optimistic-concurrency check on that one
/// record (e.g. `UPDATE ... WHERE updated_at = $expected`), and history
/// appends MUST be serialized per organization; otherwise two interleaved
/// operations lose updates. The engine itself takes no locks.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Fetch an organization's billing-relevant fields. `Ok(None)` means the
    /// organization does not exist.
    async fn fetch_organization(&self, org_id: OrgId) -> BillingResult<Option<OrganizationRecord>>;

    /// Persist the re-serialized add-on blob and resolved feature flags.
    async fn persist_entitlements(
        &self,
        org_id: OrgId,
        update: EntitlementUpdate,
    ) -> BillingResult<()>;
}

/// In-memory store for tests and single-process embedding.
///
/// A single `RwLock` over the whole map serializes writers, which satisfies
/// the per-organization serialization contract trivially.
#[derive(Clone, Default)]
pub struct InMemoryOrganizationStore {
    orgs: Arc<RwLock<HashMap<OrgId, OrganizationRecord>>>,
    flags: Arc<RwLock<HashMap<OrgId, FeatureSet>>>,
}

impl InMemoryOrganizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an organization record
    pub async fn upsert(&self, record: OrganizationRecord) {
        self.orgs.write().await.insert(record.id, record);
    }

    /// Read back a record (test helper)
    pub async fn get(&self, org_id: OrgId) -> Option<OrganizationRecord> {
        self.orgs.read().await.get(&org_id).cloned()
    }

    /// Last feature flags written for an organization (test helper)
    pub async fn persisted_features(&self, org_id: OrgId) -> Option<FeatureSet> {
        self.flags.read().await.get(&org_id).copied()
    }
}

#[async_trait]
impl OrganizationStore for InMemoryOrganizationStore {
    async fn fetch_organization(&self, org_id: OrgId) -> BillingResult<Option<OrganizationRecord>> {
        Ok(self.orgs.read().await.get(&org_id).cloned())
    }

    async fn persist_entitlements(
        &self,
        org_id: OrgId,
        update: EntitlementUpdate,
    ) -> BillingResult<()> {
        let mut orgs = self.orgs.write().await;
        let record = orgs
            .get_mut(&org_id)
            .ok_or_else(|| BillingError::NotFound(org_id.to_string()))?;
        record.addons_json = Some(update.addons_json);
        self.flags.write().await.insert(org_id, update.features);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn test_fetch_missing_org_is_none() {
        let store = InMemoryOrganizationStore::new();
        let got = store.fetch_organization(OrgId::new()).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_persist_to_missing_org_errors() {
        let store = InMemoryOrganizationStore::new();
        let update = EntitlementUpdate {
            addons_json: "{}".to_string(),
            features: FeatureSet::default(),
        };
        let err = store.persist_entitlements(OrgId::new(), update).await;
        assert!(matches!(err, Err(BillingError::NotFound(_))));
    }
}
