//! Ad publishing domain types: per-step creation specs, the complete-ad
//! request, and the resulting bundle.
//!
//! Platform enums that the core merely forwards (objective, optimization
//! goal, billing event, call-to-action) stay as strings with default
//! constants; the platform is the authority on which values are valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::ResourceId;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default campaign objective.
pub const DEFAULT_OBJECTIVE: &str = "OUTCOME_TRAFFIC";
/// Default ad-set optimization goal.
pub const DEFAULT_OPTIMIZATION_GOAL: &str = "LINK_CLICKS";
/// Default ad-set billing event.
pub const DEFAULT_BILLING_EVENT: &str = "IMPRESSIONS";
/// Default creative call-to-action type.
pub const DEFAULT_CALL_TO_ACTION: &str = "LEARN_MORE";

/// Divisor for the default bid heuristic (10% of the daily budget).
const DEFAULT_BID_DIVISOR: u64 = 10;

fn default_objective() -> String {
    DEFAULT_OBJECTIVE.to_string()
}

fn default_optimization_goal() -> String {
    DEFAULT_OPTIMIZATION_GOAL.to_string()
}

fn default_billing_event() -> String {
    DEFAULT_BILLING_EVENT.to_string()
}

fn default_call_to_action() -> String {
    DEFAULT_CALL_TO_ACTION.to_string()
}

// ---------------------------------------------------------------------------
// Status / targeting
// ---------------------------------------------------------------------------

/// Delivery status of a created resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Created but not eligible to spend or deliver.
    #[default]
    Paused,
    Active,
}

impl ResourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceStatus::Paused => "PAUSED",
            ResourceStatus::Active => "ACTIVE",
        }
    }
}

/// Opaque audience targeting payload (geography, age range, interests,
/// life events). Forwarded to the platform as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Targeting(pub serde_json::Value);

impl Targeting {
    /// Fallback audience used when an automation job does not specify one.
    pub fn default_audience() -> Self {
        Targeting(serde_json::json!({
            "geo_locations": { "countries": ["BR"] },
            "age_min": 25,
            "age_max": 55,
        }))
    }

    /// Require the payload to be present as a JSON object.
    pub fn ensure_present(&self) -> Result<(), CoreError> {
        match &self.0 {
            serde_json::Value::Object(_) => Ok(()),
            serde_json::Value::Null => {
                Err(CoreError::Validation("targeting is required".to_string()))
            }
            _ => Err(CoreError::Validation(
                "targeting must be a JSON object".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Bid heuristic
// ---------------------------------------------------------------------------

/// Default bid: `floor(daily_budget * 0.1)` in minor currency units.
pub fn default_bid_amount(daily_budget: u64) -> u64 {
    daily_budget / DEFAULT_BID_DIVISOR
}

/// Explicit bids pass through unchanged; otherwise apply
/// [`default_bid_amount`].
pub fn resolve_bid_amount(daily_budget: u64, bid_amount: Option<u64>) -> u64 {
    bid_amount.unwrap_or_else(|| default_bid_amount(daily_budget))
}

// ---------------------------------------------------------------------------
// Per-step specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSpec {
    pub name: String,
    pub objective: String,
    pub status: ResourceStatus,
    /// Regulatory categories (e.g. `HOUSING`, `CREDIT`, `EMPLOYMENT`).
    /// `None` omits the field; `Some` is forwarded verbatim.
    pub special_ad_categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdSetSpec {
    pub campaign_id: ResourceId,
    pub name: String,
    /// Daily budget in the smallest currency unit (e.g. cents).
    pub daily_budget: u64,
    pub targeting: Targeting,
    pub optimization_goal: String,
    pub billing_event: String,
    /// Always resolved; see [`resolve_bid_amount`].
    pub bid_amount: u64,
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreativeSpec {
    pub name: String,
    pub image_hash: String,
    pub title: String,
    pub body: String,
    pub link_url: String,
    pub call_to_action: String,
    /// Publisher identity the ad is attributed to.
    pub page_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdSpec {
    pub ad_set_id: ResourceId,
    pub creative_id: ResourceId,
    pub name: String,
    pub status: ResourceStatus,
}

// ---------------------------------------------------------------------------
// Complete ad request / bundle
// ---------------------------------------------------------------------------

/// Everything needed to publish one ad from a local image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CompleteAdRequest {
    #[validate(length(min = 1, message = "campaign_name must not be empty"))]
    pub campaign_name: String,
    #[validate(length(min = 1, message = "ad_name must not be empty"))]
    pub ad_name: String,
    pub image_path: PathBuf,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "body must not be empty"))]
    pub body: String,
    #[validate(url(message = "link_url must be an absolute URL"))]
    pub link_url: String,
    #[validate(range(min = 1, message = "daily_budget must be positive"))]
    pub daily_budget: u64,
    pub targeting: Targeting,
    #[serde(default = "default_objective")]
    pub objective: String,
    #[serde(default = "default_call_to_action")]
    pub call_to_action: String,
    #[serde(default)]
    pub special_ad_categories: Option<Vec<String>>,
    #[serde(default)]
    pub bid_amount: Option<u64>,
    #[serde(default = "default_optimization_goal")]
    pub optimization_goal: String,
    #[serde(default = "default_billing_event")]
    pub billing_event: String,
    /// Overrides the configured page for this ad only.
    #[serde(default)]
    pub page_id: Option<String>,
}

impl CompleteAdRequest {
    /// Build a request with platform defaults for every optional field.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        campaign_name: impl Into<String>,
        ad_name: impl Into<String>,
        image_path: impl Into<PathBuf>,
        title: impl Into<String>,
        body: impl Into<String>,
        link_url: impl Into<String>,
        daily_budget: u64,
        targeting: Targeting,
    ) -> Self {
        Self {
            campaign_name: campaign_name.into(),
            ad_name: ad_name.into(),
            image_path: image_path.into(),
            title: title.into(),
            body: body.into(),
            link_url: link_url.into(),
            daily_budget,
            targeting,
            objective: default_objective(),
            call_to_action: default_call_to_action(),
            special_ad_categories: None,
            bid_amount: None,
            optimization_goal: default_optimization_goal(),
            billing_event: default_billing_event(),
            page_id: None,
        }
    }

    /// Run all input checks. Called before any remote call is made.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        if self.image_path.as_os_str().is_empty() {
            return Err(CoreError::Validation(
                "image_path must not be empty".to_string(),
            ));
        }
        self.targeting.ensure_present()
    }

    pub fn ad_set_name(&self) -> String {
        format!("{} - Ad Set", self.ad_name)
    }

    pub fn creative_name(&self) -> String {
        format!("{} - Creative", self.ad_name)
    }

    pub fn campaign_spec(&self) -> CampaignSpec {
        CampaignSpec {
            name: self.campaign_name.clone(),
            objective: self.objective.clone(),
            status: ResourceStatus::Paused,
            special_ad_categories: self.special_ad_categories.clone(),
        }
    }

    pub fn ad_set_spec(&self, campaign_id: &str) -> AdSetSpec {
        AdSetSpec {
            campaign_id: campaign_id.to_string(),
            name: self.ad_set_name(),
            daily_budget: self.daily_budget,
            targeting: self.targeting.clone(),
            optimization_goal: self.optimization_goal.clone(),
            billing_event: self.billing_event.clone(),
            bid_amount: resolve_bid_amount(self.daily_budget, self.bid_amount),
            status: ResourceStatus::Paused,
        }
    }

    pub fn creative_spec(&self, image_hash: &str, page_id: &str) -> CreativeSpec {
        CreativeSpec {
            name: self.creative_name(),
            image_hash: image_hash.to_string(),
            title: self.title.clone(),
            body: self.body.clone(),
            link_url: self.link_url.clone(),
            call_to_action: self.call_to_action.clone(),
            page_id: page_id.to_string(),
        }
    }

    pub fn ad_spec(&self, ad_set_id: &str, creative_id: &str) -> AdSpec {
        AdSpec {
            ad_set_id: ad_set_id.to_string(),
            creative_id: creative_id.to_string(),
            name: self.ad_name.clone(),
            status: ResourceStatus::Paused,
        }
    }
}

/// Identifiers of every resource created for one ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdBundle {
    pub campaign_id: ResourceId,
    pub ad_set_id: ResourceId,
    pub creative_id: ResourceId,
    pub ad_id: ResourceId,
    pub image_hash: String,
}

impl AdBundle {
    /// A bundle is only valid when every identifier is non-empty.
    pub fn is_complete(&self) -> bool {
        [
            &self.campaign_id,
            &self.ad_set_id,
            &self.creative_id,
            &self.ad_id,
            &self.image_hash,
        ]
        .iter()
        .all(|id| !id.trim().is_empty())
    }
}
