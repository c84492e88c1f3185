//! Add-on lifecycle management
//!
//! Activates and deactivates add-ons for an organization: merges ids into the
//! persisted active sets, recomputes the recurring monthly total, appends to
//! the history log and flips unlocked feature flags.
//!
//! Batch semantics are best-effort: ids that cannot be processed (unknown,
//! plan not eligible, already active) are dropped from the operation and
//! reported in the outcome; they never fail the batch. A missing organization
//! is fatal.
//!
//! Every operation here is a read-modify-write over one organization record;
//! the caller must scope it as described on
//! [`OrganizationStore`](crate::store::OrganizationStore).

use serde::Serialize;
use time::OffsetDateTime;

use glowdesk_shared::{OrgId, Plan};

use crate::catalog::{self, Addon, AddonRecurrence};
use crate::error::{BillingError, BillingResult};
use crate::features::active_features;
use crate::state::{AddonAction, AddonEvent, AddonState};
use crate::store::{EntitlementUpdate, OrganizationStore};

/// Why an id was dropped from a batch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Id not present in the catalog
    UnknownAddon,
    /// The organization's plan does not meet the add-on's minimum plan
    PlanNotEligible,
    /// Recurring add-on already active (idempotent no-op)
    AlreadyActive,
    /// One-time add-on already purchased
    AlreadyPurchased,
    /// Deactivation target was not active
    NotActive,
}

/// An id dropped from a batch, with the reason, reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAddon {
    pub id: String,
    pub reason: SkipReason,
}

/// Result of [`AddonLifecycle::activate_addons`]
#[derive(Debug, Clone, Serialize)]
pub struct ActivationOutcome {
    /// Ids that actually changed state in this call
    pub activated: Vec<String>,
    /// Ids dropped from the batch, with reasons
    pub skipped: Vec<SkippedAddon>,
    /// Increase of the recurring monthly total, in cents
    pub additional_monthly_cost_cents: i64,
    /// One-time charges incurred by this call, in cents
    pub one_time_cost_cents: i64,
    /// Recurring monthly total after the call (plan + active add-ons)
    pub total_monthly_cost_cents: i64,
}

/// Result of [`AddonLifecycle::deactivate_addons`]
#[derive(Debug, Clone, Serialize)]
pub struct DeactivationOutcome {
    /// Ids removed from the active set
    pub deactivated: Vec<String>,
    /// Ids dropped from the batch, with reasons
    pub skipped: Vec<SkippedAddon>,
    /// Recurring add-on ids still active after the call
    pub remaining: Vec<String>,
    /// Recurring monthly total after the call (plan + remaining add-ons)
    pub new_monthly_cost_cents: i64,
}

/// Service managing per-organization add-on state
pub struct AddonLifecycle<S> {
    store: S,
}

impl<S: OrganizationStore> AddonLifecycle<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Activate a batch of add-ons for an organization.
    ///
    /// Re-activating an already-active id does not duplicate it and does not
    /// count toward the cost delta. Recurring add-ons join the active set;
    /// one-time add-ons join the purchased set and are charged once.
    pub async fn activate_addons(
        &self,
        org_id: OrgId,
        addon_ids: &[&str],
    ) -> BillingResult<ActivationOutcome> {
        let record = self.load_org(org_id).await?;
        let mut state = AddonState::from_json(record.addons_json.as_deref());

        let mut activated: Vec<String> = Vec::new();
        let mut skipped: Vec<SkippedAddon> = Vec::new();
        let mut additional_monthly = 0i64;
        let mut one_time_cost = 0i64;

        for &id in addon_ids {
            let Some(addon) = catalog::addon(id) else {
                skipped.push(SkippedAddon {
                    id: id.to_string(),
                    reason: SkipReason::UnknownAddon,
                });
                continue;
            };
            if let Some(min) = addon.min_plan {
                if !record.plan.satisfies(min) {
                    skipped.push(SkippedAddon {
                        id: id.to_string(),
                        reason: SkipReason::PlanNotEligible,
                    });
                    continue;
                }
            }
            match addon.recurrence {
                AddonRecurrence::Recurring => {
                    if state.is_recurring_active(id) {
                        skipped.push(SkippedAddon {
                            id: id.to_string(),
                            reason: SkipReason::AlreadyActive,
                        });
                        continue;
                    }
                    state.recurring.push(id.to_string());
                    additional_monthly += addon.price_cents;
                    activated.push(id.to_string());
                }
                AddonRecurrence::OneTime => {
                    if state.is_purchased(id) {
                        skipped.push(SkippedAddon {
                            id: id.to_string(),
                            reason: SkipReason::AlreadyPurchased,
                        });
                        continue;
                    }
                    state.one_time.push(id.to_string());
                    one_time_cost += addon.price_cents;
                    activated.push(id.to_string());
                }
            }
        }

        if !activated.is_empty() {
            state.history.push(AddonEvent {
                action: AddonAction::Activate,
                addon_ids: activated.clone(),
                timestamp: OffsetDateTime::now_utc(),
                monthly_cost_delta_cents: additional_monthly,
            });
            self.store
                .persist_entitlements(
                    org_id,
                    EntitlementUpdate {
                        addons_json: state.to_json()?,
                        features: active_features(record.plan, &state),
                    },
                )
                .await?;

            tracing::info!(
                org_id = %org_id,
                activated = activated.len(),
                skipped = skipped.len(),
                additional_monthly_cost_cents = additional_monthly,
                "Activated add-ons"
            );
        }

        Ok(ActivationOutcome {
            activated,
            skipped,
            additional_monthly_cost_cents: additional_monthly,
            one_time_cost_cents: one_time_cost,
            total_monthly_cost_cents: monthly_total(record.plan, &state),
        })
    }

    /// Deactivate a batch of recurring add-ons.
    ///
    /// A removed add-on's unlocked feature is cleared only when the feature is
    /// not part of the plan's base matrix; plan-included capability is never
    /// revoked by add-on changes.
    pub async fn deactivate_addons(
        &self,
        org_id: OrgId,
        addon_ids: &[&str],
    ) -> BillingResult<DeactivationOutcome> {
        let record = self.load_org(org_id).await?;
        let mut state = AddonState::from_json(record.addons_json.as_deref());

        let mut deactivated: Vec<String> = Vec::new();
        let mut skipped: Vec<SkippedAddon> = Vec::new();
        let mut removed_monthly = 0i64;

        for &id in addon_ids {
            if !state.is_recurring_active(id) {
                skipped.push(SkippedAddon {
                    id: id.to_string(),
                    reason: SkipReason::NotActive,
                });
                continue;
            }
            state.recurring.retain(|a| a != id);
            // Ids kept in state but since removed from the catalog price at 0
            if let Some(addon) = catalog::addon(id) {
                removed_monthly += addon.price_cents;
            }
            deactivated.push(id.to_string());
        }

        if !deactivated.is_empty() {
            state.history.push(AddonEvent {
                action: AddonAction::Deactivate,
                addon_ids: deactivated.clone(),
                timestamp: OffsetDateTime::now_utc(),
                monthly_cost_delta_cents: -removed_monthly,
            });

            let mut features = active_features(record.plan, &state);
            let base = crate::features::base_matrix(record.plan);
            for id in &deactivated {
                if let Some(feature) = catalog::addon(id).and_then(|a| a.unlocks) {
                    // Clears on plan-inclusion alone; a feature unlocked by two
                    // active add-ons goes dark when either one is removed
                    if !base.get(feature) {
                        features.set(feature, false);
                    }
                }
            }

            self.store
                .persist_entitlements(
                    org_id,
                    EntitlementUpdate {
                        addons_json: state.to_json()?,
                        features,
                    },
                )
                .await?;

            tracing::info!(
                org_id = %org_id,
                deactivated = deactivated.len(),
                skipped = skipped.len(),
                removed_monthly_cost_cents = removed_monthly,
                "Deactivated add-ons"
            );
        }

        let remaining = state.recurring.clone();
        Ok(DeactivationOutcome {
            deactivated,
            skipped,
            remaining,
            new_monthly_cost_cents: monthly_total(record.plan, &state),
        })
    }

    /// Resolve the organization's active recurring add-ons to catalog records,
    /// dropping ids the catalog no longer knows.
    pub async fn active_addons(&self, org_id: OrgId) -> BillingResult<Vec<&'static Addon>> {
        let record = self.load_org(org_id).await?;
        let state = AddonState::from_json(record.addons_json.as_deref());
        Ok(state
            .recurring
            .iter()
            .filter_map(|id| catalog::addon(id))
            .collect())
    }

    /// Resolve purchased one-time add-ons to catalog records.
    pub async fn purchased_addons(&self, org_id: OrgId) -> BillingResult<Vec<&'static Addon>> {
        let record = self.load_org(org_id).await?;
        let state = AddonState::from_json(record.addons_json.as_deref());
        Ok(state
            .one_time
            .iter()
            .filter_map(|id| catalog::addon(id))
            .collect())
    }

    /// Current recurring monthly total: plan price plus active recurring
    /// add-ons. One-time purchases never contribute.
    pub async fn total_monthly_cost_cents(&self, org_id: OrgId) -> BillingResult<i64> {
        let record = self.load_org(org_id).await?;
        let state = AddonState::from_json(record.addons_json.as_deref());
        Ok(monthly_total(record.plan, &state))
    }

    async fn load_org(&self, org_id: OrgId) -> BillingResult<crate::store::OrganizationRecord> {
        self.store
            .fetch_organization(org_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(org_id.to_string()))
    }
}

/// Plan price plus the sum of active recurring add-on prices, in cents
pub(crate) fn monthly_total(plan: Plan, state: &AddonState) -> i64 {
    let addons: i64 = state
        .recurring
        .iter()
        .filter_map(|id| catalog::addon(id))
        .map(|a| a.price_cents)
        .sum();
    plan.price_cents() + addons
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::store::{InMemoryOrganizationStore, OrganizationRecord};

    async fn lifecycle_with_org(
        plan: Plan,
        addons_json: Option<&str>,
    ) -> (AddonLifecycle<InMemoryOrganizationStore>, OrgId) {
        let store = InMemoryOrganizationStore::new();
        let org_id = OrgId::new();
        store
            .upsert(OrganizationRecord {
                id: org_id,
                plan,
                addons_json: addons_json.map(String::from),
            })
            .await;
        (AddonLifecycle::new(store), org_id)
    }

    #[tokio::test]
    async fn test_missing_org_is_fatal() {
        let lifecycle = AddonLifecycle::new(InMemoryOrganizationStore::new());
        let err = lifecycle.activate_addons(OrgId::new(), &["feature-shop"]).await;
        assert!(matches!(err, Err(BillingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_reported_not_fatal() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, None).await;
        let outcome = lifecycle
            .activate_addons(org_id, &["feature-shop", "no-such-addon"])
            .await
            .unwrap();
        assert_eq!(outcome.activated, vec!["feature-shop"]);
        assert_eq!(
            outcome.skipped,
            vec![SkippedAddon {
                id: "no-such-addon".to_string(),
                reason: SkipReason::UnknownAddon,
            }]
        );
        assert_eq!(outcome.additional_monthly_cost_cents, 2_500);
    }

    #[tokio::test]
    async fn test_plan_eligibility_is_enforced() {
        // SMS requires DUO or higher
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Solo, None).await;
        let outcome = lifecycle.activate_addons(org_id, &["feature-sms"]).await.unwrap();
        assert!(outcome.activated.is_empty());
        assert_eq!(outcome.skipped[0].reason, SkipReason::PlanNotEligible);
        assert_eq!(outcome.total_monthly_cost_cents, Plan::Solo.price_cents());
    }

    #[tokio::test]
    async fn test_activation_is_idempotent() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, None).await;
        let first = lifecycle.activate_addons(org_id, &["feature-shop"]).await.unwrap();
        let second = lifecycle.activate_addons(org_id, &["feature-shop"]).await.unwrap();

        assert_eq!(first.additional_monthly_cost_cents, 2_500);
        assert_eq!(second.additional_monthly_cost_cents, 0);
        assert_eq!(second.skipped[0].reason, SkipReason::AlreadyActive);
        assert_eq!(
            first.total_monthly_cost_cents,
            second.total_monthly_cost_cents
        );
        assert_eq!(
            lifecycle.active_addons(org_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_one_time_addons_charge_once_and_stay_out_of_recurring() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Solo, None).await;
        let outcome = lifecycle
            .activate_addons(org_id, &["onboarding-pack"])
            .await
            .unwrap();
        assert_eq!(outcome.one_time_cost_cents, 9_900);
        assert_eq!(outcome.additional_monthly_cost_cents, 0);
        assert_eq!(outcome.total_monthly_cost_cents, Plan::Solo.price_cents());

        let again = lifecycle
            .activate_addons(org_id, &["onboarding-pack"])
            .await
            .unwrap();
        assert_eq!(again.one_time_cost_cents, 0);
        assert_eq!(again.skipped[0].reason, SkipReason::AlreadyPurchased);

        let purchased = lifecycle.purchased_addons(org_id).await.unwrap();
        assert_eq!(purchased.len(), 1);
        assert_eq!(purchased[0].id, "onboarding-pack");
    }

    #[tokio::test]
    async fn test_deactivation_restores_cost_baseline() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, None).await;
        let baseline = lifecycle.total_monthly_cost_cents(org_id).await.unwrap();

        let activation = lifecycle.activate_addons(org_id, &["feature-shop"]).await.unwrap();
        let activated: Vec<&str> = activation.activated.iter().map(String::as_str).collect();
        let outcome = lifecycle.deactivate_addons(org_id, &activated).await.unwrap();

        assert_eq!(outcome.deactivated, vec!["feature-shop"]);
        assert!(outcome.remaining.is_empty());
        assert_eq!(outcome.new_monthly_cost_cents, baseline);
    }

    #[tokio::test]
    async fn test_deactivating_inactive_id_is_reported() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, None).await;
        let outcome = lifecycle.deactivate_addons(org_id, &["feature-shop"]).await.unwrap();
        assert!(outcome.deactivated.is_empty());
        assert_eq!(outcome.skipped[0].reason, SkipReason::NotActive);
    }

    #[tokio::test]
    async fn test_history_records_signed_deltas() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, None).await;
        lifecycle.activate_addons(org_id, &["feature-shop"]).await.unwrap();
        lifecycle.deactivate_addons(org_id, &["feature-shop"]).await.unwrap();

        let record = lifecycle.store.get(org_id).await.unwrap();
        let state = AddonState::from_json(record.addons_json.as_deref());
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].monthly_cost_delta_cents, 2_500);
        assert_eq!(state.history[1].monthly_cost_delta_cents, -2_500);
        assert_eq!(state.replay_history(), state.recurring);
    }

    #[tokio::test]
    async fn test_malformed_blob_degrades_to_empty_state() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, Some("{broken")).await;
        let total = lifecycle.total_monthly_cost_cents(org_id).await.unwrap();
        assert_eq!(total, Plan::Duo.price_cents());
    }

    #[tokio::test]
    async fn test_stale_catalog_ids_are_dropped_from_active_addons() {
        let blob = r#"{"recurring":["feature-shop","retired-addon"]}"#;
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, Some(blob)).await;

        let active = lifecycle.active_addons(org_id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "feature-shop");

        // retired id prices at zero
        let total = lifecycle.total_monthly_cost_cents(org_id).await.unwrap();
        assert_eq!(total, Plan::Duo.price_cents() + 2_500);
    }

    #[tokio::test]
    async fn test_feature_flags_follow_activation() {
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, None).await;
        lifecycle.activate_addons(org_id, &["feature-shop"]).await.unwrap();

        let flags = lifecycle.store.persisted_features(org_id).await.unwrap();
        assert!(flags.shop);
        assert!(flags.blog); // from the plan

        lifecycle.deactivate_addons(org_id, &["feature-shop"]).await.unwrap();
        let flags = lifecycle.store.persisted_features(org_id).await.unwrap();
        assert!(!flags.shop);
        assert!(flags.blog);
    }

    #[tokio::test]
    async fn test_plan_included_feature_is_never_cleared() {
        // Blog is in the DUO base matrix; activating and removing the blog
        // module must leave the flag on. The module is not offered to DUO,
        // but old state can still hold it.
        let blob = r#"{"recurring":["feature-blog"]}"#;
        let (lifecycle, org_id) = lifecycle_with_org(Plan::Duo, Some(blob)).await;

        lifecycle.deactivate_addons(org_id, &["feature-blog"]).await.unwrap();
        let flags = lifecycle.store.persisted_features(org_id).await.unwrap();
        assert!(flags.blog);
    }
}
