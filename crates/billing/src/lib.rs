//! GlowDesk entitlement and billing engine
//!
//! Determines which product features an organization has unlocked from three
//! orthogonal axes (subscription plan, purchased add-ons, member role) and
//! computes the monetary consequences of changing any of them mid-cycle.
//!
//! ## Design Principles
//!
//! 1. **Fail-closed access**: any ambiguous lookup (unknown feature key,
//!    unknown role) resolves to denied
//! 2. **Monotonic grants**: add-ons only add capability on top of the plan
//!    floor, never subtract it
//! 3. **Pure computation**: the resolver and the invoice calculator operate on
//!    values passed in; all I/O goes through the [`store`] seam
//!
//! The persistence engine, payment processor and invoice renderer are external
//! collaborators; this crate only defines the contracts it needs from them.

pub mod catalog;
pub mod error;
pub mod features;
pub mod history;
pub mod invoice;
pub mod lifecycle;
pub mod state;
pub mod store;

pub use catalog::{addon, addons_for_plan, Addon, AddonCategory, AddonRecurrence, ADDON_CATALOG};
pub use error::{BillingError, BillingResult};
pub use features::{
    accessible_features, active_features, allowed_features, base_matrix, base_matrix_for_key,
    can_access_feature, can_access_feature_key, FeatureSet,
};
pub use history::export_history_csv;
pub use invoice::{
    billing_period_for, current_billing_period, due_date, generate_invoice_number,
    invoice_line_items, invoice_metadata, invoice_total_cents, next_billing_date, prorata,
    BillingPeriod, ChangeType, InvoiceMetadata, LineItem, LineItemKind, PlanChange, Prorata,
};
pub use lifecycle::{
    ActivationOutcome, AddonLifecycle, DeactivationOutcome, SkipReason, SkippedAddon,
};
pub use state::{AddonAction, AddonEvent, AddonState};
pub use store::{
    EntitlementUpdate, InMemoryOrganizationStore, OrganizationRecord, OrganizationStore,
};
