//! Common types used across GlowDesk

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Organization ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub Uuid);

impl OrgId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrgId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for OrgId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Plans
// =============================================================================

/// Error returned when a persisted plan string is not recognized.
///
/// Unknown plans are a hard error: silently falling back to a default plan
/// would grant or deny features based on a typo in persisted data.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid plan: {0}")]
pub struct InvalidPlan(pub String);

/// Subscription plan for an organization.
///
/// Four current tiers. The pre-2025 plan names are still present in old
/// organization records and resolve through an explicit alias table in
/// [`Plan::from_str`]; they are not variants of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    /// Independent practitioner, single location
    Solo,
    /// Small institute, 2-3 people
    Duo,
    /// Established institute, several locations
    Team,
    /// Chains and franchises
    Premium,
}

/// Sentinel for quotas with no cap.
pub const UNLIMITED: u32 = u32::MAX;

impl Plan {
    /// All plans, lowest tier first
    pub fn all() -> [Self; 4] {
        [Self::Solo, Self::Duo, Self::Team, Self::Premium]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "SOLO",
            Self::Duo => "DUO",
            Self::Team => "TEAM",
            Self::Premium => "PREMIUM",
        }
    }

    /// Get the display name for this plan
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Solo => "Solo",
            Self::Duo => "Duo",
            Self::Team => "Team",
            Self::Premium => "Premium",
        }
    }

    /// Get the description for this plan
    pub fn description(&self) -> &'static str {
        match self {
            Self::Solo => "For an independent practitioner with a single location",
            Self::Duo => "For a growing institute with a small team",
            Self::Team => "For established institutes with several locations",
            Self::Premium => "For chains and franchises, everything unlimited",
        }
    }

    /// Base monthly price in cents
    pub fn price_cents(&self) -> i64 {
        match self {
            Self::Solo => 4_900,    // 49 EUR/mo
            Self::Duo => 8_900,     // 89 EUR/mo
            Self::Team => 14_900,   // 149 EUR/mo
            Self::Premium => 24_900, // 249 EUR/mo
        }
    }

    /// Tier ordering used for addon plan-applicability checks (higher = more)
    pub fn rank(&self) -> u8 {
        match self {
            Self::Solo => 1,
            Self::Duo => 2,
            Self::Team => 3,
            Self::Premium => 4,
        }
    }

    /// Whether this plan is at least `other` in the tier ordering
    pub fn satisfies(&self, other: Plan) -> bool {
        self.rank() >= other.rank()
    }

    /// Maximum users for this plan
    pub fn max_users(&self) -> u32 {
        match self {
            Self::Solo => 1,
            Self::Duo => 3,
            Self::Team => 8,
            Self::Premium => UNLIMITED,
        }
    }

    /// Maximum locations for this plan
    pub fn max_locations(&self) -> u32 {
        match self {
            Self::Solo | Self::Duo => 1,
            Self::Team => 3,
            Self::Premium => UNLIMITED,
        }
    }

    /// Included storage in GB
    pub fn storage_gb(&self) -> u32 {
        match self {
            Self::Solo => 5,
            Self::Duo => 15,
            Self::Team => 30,
            Self::Premium => UNLIMITED,
        }
    }

    /// Included marketing emails per month
    pub fn emails_per_month(&self) -> u32 {
        match self {
            Self::Solo => 1_000,
            Self::Duo => 2_000,
            Self::Team => 5_000,
            Self::Premium => UNLIMITED,
        }
    }

    /// Included WhatsApp messages per month
    pub fn whatsapp_per_month(&self) -> u32 {
        match self {
            Self::Solo => 200,
            Self::Duo => 500,
            Self::Team => 1_000,
            Self::Premium => UNLIMITED,
        }
    }

    /// Included SMS per month (0 = not included in the plan)
    pub fn sms_per_month(&self) -> u32 {
        match self {
            Self::Solo | Self::Duo => 0,
            Self::Team => 200,
            Self::Premium => 1_000,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = InvalidPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOLO" => Ok(Self::Solo),
            "DUO" => Ok(Self::Duo),
            "TEAM" => Ok(Self::Team),
            "PREMIUM" => Ok(Self::Premium),
            // Legacy plan names kept for existing organization records
            "STARTER" => Ok(Self::Solo),
            "ESSENTIAL" => Ok(Self::Duo),
            "PROFESSIONAL" => Ok(Self::Team),
            "ENTERPRISE" => Ok(Self::Premium),
            _ => Err(InvalidPlan(s.to_string())),
        }
    }
}

// =============================================================================
// Features
// =============================================================================

/// Product features that can be unlocked per organization.
///
/// One feature = one full admin tab. Core tabs (dashboard, planning,
/// reservations, services, clients, loyalty, reviews, accounting, design,
/// settings) are always available and are not modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Blog tab: articles, categories, SEO
    Blog,
    /// CRM tab: leads, prospects, pipeline, segmentation
    Crm,
    /// Email marketing tab: campaigns, automations, analytics
    Emailing,
    /// Shop tab: products, trainings, orders
    Shop,
    /// WhatsApp tab: marketing, automations
    WhatsApp,
    /// SMS tab: campaigns, automations
    Sms,
    /// Social media tab: Instagram, Facebook, TikTok, scheduling
    SocialMedia,
    /// Advanced stock tab: inventory, alerts, suppliers
    Stock,
    /// Multiple points of sale
    MultiLocation,
    /// Staff accounts with roles
    MultiUser,
}

impl Feature {
    /// All known features, in catalog order
    pub const ALL: [Self; 10] = [
        Self::Blog,
        Self::Crm,
        Self::Emailing,
        Self::Shop,
        Self::WhatsApp,
        Self::Sms,
        Self::SocialMedia,
        Self::Stock,
        Self::MultiLocation,
        Self::MultiUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Crm => "crm",
            Self::Emailing => "emailing",
            Self::Shop => "shop",
            Self::WhatsApp => "whatsapp",
            Self::Sms => "sms",
            Self::SocialMedia => "social_media",
            Self::Stock => "stock",
            Self::MultiLocation => "multi_location",
            Self::MultiUser => "multi_user",
        }
    }

    /// Parse a feature key. Unknown keys return `None`; access checks treat
    /// that as denied.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "blog" => Some(Self::Blog),
            "crm" => Some(Self::Crm),
            "emailing" => Some(Self::Emailing),
            "shop" => Some(Self::Shop),
            "whatsapp" => Some(Self::WhatsApp),
            "sms" => Some(Self::Sms),
            "social_media" => Some(Self::SocialMedia),
            "stock" => Some(Self::Stock),
            "multi_location" => Some(Self::MultiLocation),
            "multi_user" => Some(Self::MultiUser),
            _ => None,
        }
    }

    /// Get the display name for this feature
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Blog => "Blog",
            Self::Crm => "CRM",
            Self::Emailing => "Email Marketing",
            Self::Shop => "Online Shop",
            Self::WhatsApp => "WhatsApp",
            Self::Sms => "SMS",
            Self::SocialMedia => "Social Media",
            Self::Stock => "Advanced Stock",
            Self::MultiLocation => "Multi-Location",
            Self::MultiUser => "Multi-User",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Roles
// =============================================================================

/// Organization member role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Platform operator, full access everywhere
    SuperAdmin,
    /// Organization owner/administrator, full access within the organization
    OrgAdmin,
    /// Manages one location's day-to-day operations
    LocationManager,
    /// Practitioner
    Staff,
    /// Front desk
    Receptionist,
    /// Bookkeeping
    Accountant,
}

impl Role {
    /// Roles that bypass the per-role feature allow-list entirely
    pub fn is_full_access(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::OrgAdmin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::OrgAdmin => "ORG_ADMIN",
            Self::LocationManager => "LOCATION_MANAGER",
            Self::Staff => "STAFF",
            Self::Receptionist => "RECEPTIONIST",
            Self::Accountant => "ACCOUNTANT",
        }
    }

    /// Parse a role string. Unknown roles return `None`; access checks treat
    /// that as denied.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            "ORG_ADMIN" => Some(Self::OrgAdmin),
            "LOCATION_MANAGER" => Some(Self::LocationManager),
            "STAFF" => Some(Self::Staff),
            "RECEPTIONIST" => Some(Self::Receptionist),
            "ACCOUNTANT" => Some(Self::Accountant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
