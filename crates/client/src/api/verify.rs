//! Download verification payloads and normalization.
//!
//! The upstream may omit any field or nested object. [`VerificationResult`]
//! is the fully-populated shape handed back to callers; the conversion from
//! the raw payload is total.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const UNKNOWN_SITE: &str = "Unknown";
const FREE_PLAN: &str = "Free Plan";

/// Raw response from the upstream verification endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyPayload {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<RawVerification>,
}

impl VerifyPayload {
    /// Upstream considers the verification successful.
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(false)
    }

    /// Best message the upstream gave for a rejection.
    pub fn failure_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}

/// Verification data with every field optional.
#[derive(Debug, Default, Deserialize)]
pub struct RawVerification {
    #[serde(default)]
    pub is_supported: Option<bool>,
    #[serde(default)]
    pub is_allowed: Option<bool>,
    #[serde(default)]
    pub can_afford: Option<bool>,
    #[serde(default)]
    pub site: Option<RawSite>,
    #[serde(default)]
    pub subscription: Option<RawSubscription>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSite {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pricing: Option<f64>,
    #[serde(default)]
    pub is_external: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSubscription {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub credits_remaining: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub credits_total: Option<i64>,
    #[serde(default)]
    pub validity_date: Option<String>,
    #[serde(default)]
    pub allowed_sites: Option<Vec<String>>,
}

/// Normalized verification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_supported: bool,
    pub is_allowed: bool,
    pub can_afford: bool,
    pub site: SiteInfo,
    pub subscription: SubscriptionInfo,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub name: String,
    pub icon: String,
    pub pricing: f64,
    pub is_external: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub active: bool,
    pub plan_name: String,
    pub credits_remaining: i64,
    pub credits_total: i64,
    pub validity_date: String,
    pub allowed_sites: Vec<String>,
}

impl From<Option<RawSite>> for SiteInfo {
    fn from(raw: Option<RawSite>) -> Self {
        let raw = raw.unwrap_or_default();
        SiteInfo {
            name: raw.name.filter(|n| !n.is_empty()).unwrap_or_else(|| UNKNOWN_SITE.to_string()),
            icon: raw.icon.unwrap_or_default(),
            pricing: raw.pricing.unwrap_or(0.0),
            is_external: raw.is_external.unwrap_or(false),
        }
    }
}

impl From<Option<RawSubscription>> for SubscriptionInfo {
    fn from(raw: Option<RawSubscription>) -> Self {
        let raw = raw.unwrap_or_default();
        SubscriptionInfo {
            active: raw.active.unwrap_or(false),
            plan_name: raw.plan_name.filter(|n| !n.is_empty()).unwrap_or_else(|| FREE_PLAN.to_string()),
            credits_remaining: raw.credits_remaining.unwrap_or(0),
            credits_total: raw.credits_total.unwrap_or(0),
            validity_date: raw.validity_date.unwrap_or_default(),
            allowed_sites: raw.allowed_sites.unwrap_or_default(),
        }
    }
}

impl From<Option<RawVerification>> for VerificationResult {
    /// Fill every field the upstream left out with its default.
    fn from(raw: Option<RawVerification>) -> Self {
        let raw = raw.unwrap_or_default();
        VerificationResult {
            is_supported: raw.is_supported.unwrap_or(false),
            is_allowed: raw.is_allowed.unwrap_or(false),
            can_afford: raw.can_afford.unwrap_or(false),
            site: raw.site.into(),
            subscription: raw.subscription.into(),
            warnings: raw.warnings.unwrap_or_default(),
        }
    }
}

/// Accept numbers, numeric strings, or null.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.map(|n| n.trunc() as i64))
}
