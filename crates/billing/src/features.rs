//! Entitlement resolver
//!
//! Answers "which features does this organization have, and can this role use
//! them?". Resolution is a fixed three-stage pipeline:
//!
//! 1. plan floor - the base matrix of the subscription plan
//! 2. addon grants - active recurring add-ons force their feature on
//! 3. role restriction - non-admin roles only see their allow-list
//!
//! Stages 1 and 2 are monotonic: an add-on can only add capability, never
//! revoke what the plan already includes. Stage 3 only restricts. Every
//! ambiguous lookup (unknown feature key, unknown role) resolves to denied.

use glowdesk_shared::{Feature, Plan, Role};
use serde::{Deserialize, Serialize};

use crate::state::AddonState;

/// Resolved feature flags for an organization.
///
/// Field names match the boolean feature columns persisted on the
/// organization record, so this struct serializes straight into the
/// persistence payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(rename = "featureBlog")]
    pub blog: bool,
    #[serde(rename = "featureCRM")]
    pub crm: bool,
    #[serde(rename = "featureEmailing")]
    pub emailing: bool,
    #[serde(rename = "featureShop")]
    pub shop: bool,
    #[serde(rename = "featureWhatsApp")]
    pub whatsapp: bool,
    #[serde(rename = "featureSMS")]
    pub sms: bool,
    #[serde(rename = "featureSocialMedia")]
    pub social_media: bool,
    #[serde(rename = "featureStock")]
    pub stock: bool,
    #[serde(rename = "featureMultiLocation")]
    pub multi_location: bool,
    #[serde(rename = "featureMultiUser")]
    pub multi_user: bool,
}

impl FeatureSet {
    pub fn get(&self, feature: Feature) -> bool {
        match feature {
            Feature::Blog => self.blog,
            Feature::Crm => self.crm,
            Feature::Emailing => self.emailing,
            Feature::Shop => self.shop,
            Feature::WhatsApp => self.whatsapp,
            Feature::Sms => self.sms,
            Feature::SocialMedia => self.social_media,
            Feature::Stock => self.stock,
            Feature::MultiLocation => self.multi_location,
            Feature::MultiUser => self.multi_user,
        }
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        match feature {
            Feature::Blog => self.blog = enabled,
            Feature::Crm => self.crm = enabled,
            Feature::Emailing => self.emailing = enabled,
            Feature::Shop => self.shop = enabled,
            Feature::WhatsApp => self.whatsapp = enabled,
            Feature::Sms => self.sms = enabled,
            Feature::SocialMedia => self.social_media = enabled,
            Feature::Stock => self.stock = enabled,
            Feature::MultiLocation => self.multi_location = enabled,
            Feature::MultiUser => self.multi_user = enabled,
        }
    }

    /// Features currently enabled, in catalog order
    pub fn enabled(&self) -> Vec<Feature> {
        Feature::ALL.into_iter().filter(|f| self.get(*f)).collect()
    }
}

/// Base feature matrix for a plan.
///
/// Tiers are cumulative: everything DUO includes, TEAM includes too.
pub fn base_matrix(plan: Plan) -> FeatureSet {
    match plan {
        // Core tabs only
        Plan::Solo => FeatureSet::default(),
        // Basic marketing
        Plan::Duo => FeatureSet {
            blog: true,
            crm: true,
            emailing: true,
            multi_user: true,
            ..FeatureSet::default()
        },
        // E-commerce and full communication; advanced stock stays PREMIUM
        Plan::Team => FeatureSet {
            blog: true,
            crm: true,
            emailing: true,
            shop: true,
            whatsapp: true,
            sms: true,
            social_media: true,
            multi_location: true,
            multi_user: true,
            stock: false,
        },
        Plan::Premium => FeatureSet {
            blog: true,
            crm: true,
            emailing: true,
            shop: true,
            whatsapp: true,
            sms: true,
            social_media: true,
            stock: true,
            multi_location: true,
            multi_user: true,
        },
    }
}

/// Strict variant of [`base_matrix`] for persisted plan strings: legacy plan
/// aliases resolve through [`Plan::from_str`](std::str::FromStr), anything
/// else is a fatal error rather than a silent fallback to some default plan.
pub fn base_matrix_for_key(plan_key: &str) -> crate::error::BillingResult<FeatureSet> {
    let plan: Plan = plan_key.parse()?;
    Ok(base_matrix(plan))
}

/// Compute the effective feature set for an organization: plan floor plus
/// monotonic grants from active recurring add-ons.
///
/// A feature in the plan's base matrix is always on in the result, whatever
/// the add-on state says.
pub fn active_features(plan: Plan, addons: &AddonState) -> FeatureSet {
    let mut features = base_matrix(plan);
    for id in &addons.recurring {
        if let Some(addon) = crate::catalog::addon(id) {
            if let Some(feature) = addon.unlocks {
                features.set(feature, true);
            }
        }
    }
    features
}

/// Features a role is allowed to use, before intersecting with the
/// organization's active set.
///
/// Full-access roles short-circuit to the full feature list; every other role
/// gets an explicit allow-list, and features not listed are denied.
pub fn allowed_features(role: Role) -> &'static [Feature] {
    match role {
        // Full-access roles short-circuit in can_access_feature
        Role::SuperAdmin | Role::OrgAdmin => &Feature::ALL,
        Role::LocationManager => &[
            Feature::Blog,
            Feature::Crm,
            Feature::Emailing,
            Feature::Shop,
            Feature::WhatsApp,
            Feature::Sms,
            Feature::SocialMedia,
            Feature::Stock,
            Feature::MultiLocation,
        ],
        Role::Staff => &[Feature::Crm, Feature::WhatsApp],
        Role::Receptionist => &[Feature::Crm, Feature::WhatsApp, Feature::Sms],
        Role::Accountant => &[Feature::Shop, Feature::Stock],
    }
}

/// Whether `role` can use `feature` given the organization's resolved feature
/// set. Both conditions must hold: the feature is active for the organization
/// and the role is granted it.
pub fn can_access_feature(feature: Feature, features: &FeatureSet, role: Role) -> bool {
    if !features.get(feature) {
        return false;
    }
    if role.is_full_access() {
        return true;
    }
    allowed_features(role).contains(&feature)
}

/// Stringly-typed variant for route guards. Unknown feature or role keys deny
/// access; they never error.
pub fn can_access_feature_key(feature_key: &str, features: &FeatureSet, role_key: &str) -> bool {
    let (Some(feature), Some(role)) = (Feature::from_str(feature_key), Role::from_str(role_key))
    else {
        return false;
    };
    can_access_feature(feature, features, role)
}

/// Per-role authorization map over every known feature, for building route
/// tables and navigation menus.
pub fn accessible_features(features: &FeatureSet, role: Role) -> FeatureSet {
    let mut out = FeatureSet::default();
    for feature in Feature::ALL {
        out.set(feature, can_access_feature(feature, features, role));
    }
    out
}
