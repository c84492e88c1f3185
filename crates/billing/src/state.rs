//! Persisted add-on state
//!
//! Each organization record carries a serialized add-on blob:
//! `{"recurring": [...], "oneTime": [...], "history": [...]}`. This module
//! owns the parse/serialize contract for that blob.
//!
//! Parsing is fail-soft: a null, empty or malformed blob degrades to the
//! empty state. Access control stays fail-closed regardless - an empty state
//! grants nothing beyond the plan floor.
//!
//! The history log is append-only and is the source of truth: the active
//! recurring set can be rebuilt from it with [`AddonState::replay_history`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::BillingResult;

/// Lifecycle action recorded in the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonAction {
    Activate,
    Deactivate,
}

impl std::fmt::Display for AddonAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddonAction::Activate => write!(f, "activate"),
            AddonAction::Deactivate => write!(f, "deactivate"),
        }
    }
}

/// One entry of the append-only add-on history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonEvent {
    pub action: AddonAction,
    /// Ids the action applied to (only those that actually changed state)
    pub addon_ids: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Signed change to the recurring monthly total, in cents.
    /// Positive on activate, negative on deactivate, zero for one-time-only
    /// purchases.
    pub monthly_cost_delta_cents: i64,
}

/// Per-organization add-on state, as persisted on the organization record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddonState {
    /// Active recurring add-on ids, in activation order, no duplicates
    pub recurring: Vec<String>,
    /// One-time add-ons already purchased
    pub one_time: Vec<String>,
    /// Append-only event log
    pub history: Vec<AddonEvent>,
}

impl AddonState {
    /// Parse the persisted blob. `None`, empty and malformed JSON all degrade
    /// to the empty state so that a corrupt blob locks features rather than
    /// breaking reads.
    pub fn from_json(addons_json: Option<&str>) -> Self {
        let Some(raw) = addons_json else {
            return Self::default();
        };
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "malformed addons blob, using empty state");
                Self::default()
            }
        }
    }

    /// Re-serialize for persistence
    pub fn to_json(&self) -> BillingResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_recurring_active(&self, id: &str) -> bool {
        self.recurring.iter().any(|a| a == id)
    }

    pub fn is_purchased(&self, id: &str) -> bool {
        self.one_time.iter().any(|a| a == id)
    }

    /// Rebuild the active recurring set from the history log alone.
    ///
    /// The stored `recurring` vec is a cache of this replay; reconciliation
    /// jobs compare the two to detect drift.
    pub fn replay_history(&self) -> Vec<String> {
        let mut active: Vec<String> = Vec::new();
        for event in &self.history {
            match event.action {
                AddonAction::Activate => {
                    for id in &event.addon_ids {
                        if let Some(a) = crate::catalog::addon(id) {
                            if a.recurrence != crate::catalog::AddonRecurrence::Recurring {
                                continue;
                            }
                        }
                        if !active.iter().any(|a| a == id) {
                            active.push(id.clone());
                        }
                    }
                }
                AddonAction::Deactivate => {
                    active.retain(|a| !event.addon_ids.contains(a));
                }
            }
        }
        active
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_null_and_empty_blobs_degrade_to_empty_state() {
        assert_eq!(AddonState::from_json(None), AddonState::default());
        assert_eq!(AddonState::from_json(Some("")), AddonState::default());
        assert_eq!(AddonState::from_json(Some("   ")), AddonState::default());
    }

    #[test]
    fn test_malformed_blob_degrades_to_empty_state() {
        assert_eq!(AddonState::from_json(Some("{not json")), AddonState::default());
        assert_eq!(AddonState::from_json(Some("[1,2,3]")), AddonState::default());
    }

    #[test]
    fn test_missing_fields_default() {
        let state = AddonState::from_json(Some(r#"{"recurring":["feature-shop"]}"#));
        assert_eq!(state.recurring, vec!["feature-shop"]);
        assert!(state.one_time.is_empty());
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_camel_case_fields() {
        let state = AddonState {
            recurring: vec!["feature-shop".to_string()],
            one_time: vec!["onboarding-pack".to_string()],
            history: vec![AddonEvent {
                action: AddonAction::Activate,
                addon_ids: vec!["feature-shop".to_string()],
                timestamp: datetime!(2025-03-01 10:00:00 UTC),
                monthly_cost_delta_cents: 2_500,
            }],
        };
        let json = state.to_json().unwrap();
        assert!(json.contains("\"oneTime\""));
        assert!(json.contains("\"addonIds\""));
        assert_eq!(AddonState::from_json(Some(&json)), state);
    }

    #[test]
    fn test_replay_rebuilds_active_set() {
        let at = datetime!(2025-03-01 10:00:00 UTC);
        let state = AddonState {
            recurring: vec!["feature-crm".to_string()],
            one_time: vec![],
            history: vec![
                AddonEvent {
                    action: AddonAction::Activate,
                    addon_ids: vec!["feature-shop".to_string(), "feature-crm".to_string()],
                    timestamp: at,
                    monthly_cost_delta_cents: 6_500,
                },
                AddonEvent {
                    action: AddonAction::Deactivate,
                    addon_ids: vec!["feature-shop".to_string()],
                    timestamp: at,
                    monthly_cost_delta_cents: -2_500,
                },
            ],
        };
        assert_eq!(state.replay_history(), state.recurring);
    }

    #[test]
    fn test_replay_skips_one_time_purchases() {
        let at = datetime!(2025-03-01 10:00:00 UTC);
        let state = AddonState {
            recurring: vec![],
            one_time: vec!["onboarding-pack".to_string()],
            history: vec![AddonEvent {
                action: AddonAction::Activate,
                addon_ids: vec!["onboarding-pack".to_string()],
                timestamp: at,
                monthly_cost_delta_cents: 0,
            }],
        };
        assert!(state.replay_history().is_empty());
    }
}
