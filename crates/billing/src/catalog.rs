//! Add-on catalog
//!
//! Immutable catalog of purchasable add-ons. Organizations on a lower plan can
//! buy individual modules from higher plans, plus standalone options and
//! one-time services.
//!
//! The catalog is static and read-only: tenant state never mutates it, and
//! catalog evolution (removing an add-on) must not break organizations whose
//! persisted state still references the old id — lookups are non-fatal.

use glowdesk_shared::{Feature, Plan};
use serde::Serialize;

/// Add-on category for UI grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonCategory {
    /// A feature tab from a higher plan, purchasable individually
    Module,
    /// Standalone recurring option
    Option,
    /// One-time service
    Service,
}

/// Billing recurrence of an add-on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonRecurrence {
    /// Billed every month while active
    Recurring,
    /// Billed once at purchase
    OneTime,
}

/// A purchasable add-on
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Addon {
    /// Stable string key, referenced by persisted organization state
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Price in cents (monthly for recurring, total for one-time)
    pub price_cents: i64,
    pub recurrence: AddonRecurrence,
    pub category: AddonCategory,
    /// Minimum plan required to purchase, if any
    pub min_plan: Option<Plan>,
    /// Feature flipped on while this add-on is active
    pub unlocks: Option<Feature>,
}

/// The full add-on catalog, in display order
pub const ADDON_CATALOG: &[Addon] = &[
    // Modules from higher plans
    Addon {
        id: "feature-blog",
        name: "Blog",
        description: "Publish articles and beauty tips on your site",
        price_cents: 1_500,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Solo),
        unlocks: Some(Feature::Blog),
    },
    Addon {
        id: "feature-crm",
        name: "CRM & Prospecting",
        description: "Lead management, prospect pipeline and client segmentation",
        price_cents: 4_000,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Solo),
        unlocks: Some(Feature::Crm),
    },
    Addon {
        id: "feature-emailing",
        name: "Email Marketing",
        description: "Email campaigns, automations and analytics",
        price_cents: 2_000,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Solo),
        unlocks: Some(Feature::Emailing),
    },
    Addon {
        id: "feature-shop",
        name: "Online Shop",
        description: "Sell products and trainings online, with order management",
        price_cents: 2_500,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Solo),
        unlocks: Some(Feature::Shop),
    },
    Addon {
        id: "feature-whatsapp",
        name: "WhatsApp",
        description: "Automated reminders and WhatsApp marketing",
        price_cents: 2_000,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Solo),
        unlocks: Some(Feature::WhatsApp),
    },
    Addon {
        id: "feature-sms",
        name: "SMS Marketing",
        description: "SMS campaigns to retain your clients (500 SMS/mo included)",
        price_cents: 3_000,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Duo),
        unlocks: Some(Feature::Sms),
    },
    Addon {
        id: "feature-social-media",
        name: "Social Media",
        description: "Schedule and publish to Instagram, Facebook and TikTok",
        price_cents: 2_500,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Solo),
        unlocks: Some(Feature::SocialMedia),
    },
    Addon {
        id: "feature-stock",
        name: "Advanced Stock",
        description: "Detailed inventory of consumables and retail products",
        price_cents: 2_500,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Module,
        min_plan: Some(Plan::Solo),
        unlocks: Some(Feature::Stock),
    },
    // Standalone options
    Addon {
        id: "custom-domain",
        name: "Custom Domain with SSL",
        description: "Your own domain name with an SSL certificate",
        price_cents: 1_000,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Option,
        min_plan: None,
        unlocks: None,
    },
    Addon {
        id: "priority-support",
        name: "Priority Support",
        description: "Priority assistance by email, chat and phone",
        price_cents: 3_500,
        recurrence: AddonRecurrence::Recurring,
        category: AddonCategory::Option,
        min_plan: None,
        unlocks: None,
    },
    // One-time services
    Addon {
        id: "onboarding-pack",
        name: "Onboarding Pack",
        description: "Guided setup session with a product specialist",
        price_cents: 9_900,
        recurrence: AddonRecurrence::OneTime,
        category: AddonCategory::Service,
        min_plan: None,
        unlocks: None,
    },
    Addon {
        id: "data-migration",
        name: "Data Migration",
        description: "Import of your existing client and appointment records",
        price_cents: 14_900,
        recurrence: AddonRecurrence::OneTime,
        category: AddonCategory::Service,
        min_plan: None,
        unlocks: None,
    },
];

/// Look up an add-on by id. A miss is not an error; persisted state may
/// reference ids removed from the catalog.
pub fn addon(id: &str) -> Option<&'static Addon> {
    ADDON_CATALOG.iter().find(|a| a.id == id)
}

/// Add-ons an organization on `plan` can be offered.
///
/// Excludes add-ons whose unlocked feature the plan already includes (never
/// offer a redundant purchase) and add-ons whose minimum plan the current plan
/// does not meet.
pub fn addons_for_plan(plan: Plan) -> Vec<&'static Addon> {
    let base = crate::features::base_matrix(plan);
    ADDON_CATALOG
        .iter()
        .filter(|a| match a.unlocks {
            Some(feature) => !base.get(feature),
            None => true,
        })
        .filter(|a| match a.min_plan {
            Some(min) => plan.satisfies(min),
            None => true,
        })
        .collect()
}
