//! Request payloads for the resource-creation endpoints.
//!
//! Pure builders: each returns the JSON body posted to its edge so the
//! exact wire shape can be checked without a network.

use serde_json::{json, Value};

use adgen_core::ad::{AdSetSpec, AdSpec, CampaignSpec, CreativeSpec};

/// Body for `POST /{account}/campaigns`.
pub fn campaign_body(spec: &CampaignSpec) -> Value {
    let mut body = json!({
        "name": spec.name,
        "objective": spec.objective,
        "status": spec.status.as_str(),
        "is_adset_budget_sharing_enabled": false,
    });
    if let Some(categories) = &spec.special_ad_categories {
        body["special_ad_categories"] = json!(categories);
    }
    body
}

/// Body for `POST /{account}/adsets`.
pub fn ad_set_body(spec: &AdSetSpec) -> Value {
    json!({
        "name": spec.name,
        "campaign_id": spec.campaign_id,
        "daily_budget": spec.daily_budget,
        "billing_event": spec.billing_event,
        "optimization_goal": spec.optimization_goal,
        "targeting": spec.targeting,
        "bid_amount": spec.bid_amount,
        "status": spec.status.as_str(),
    })
}

/// Body for `POST /{account}/adcreatives`: a single-image link ad.
pub fn creative_body(spec: &CreativeSpec) -> Value {
    json!({
        "name": spec.name,
        "object_story_spec": {
            "page_id": spec.page_id,
            "link_data": {
                "image_hash": spec.image_hash,
                "link": spec.link_url,
                "message": spec.body,
                "name": spec.title,
                "call_to_action": {
                    "type": spec.call_to_action,
                    "value": { "link": spec.link_url },
                },
            },
        },
    })
}

/// Body for `POST /{account}/ads`.
pub fn ad_body(spec: &AdSpec) -> Value {
    json!({
        "name": spec.name,
        "adset_id": spec.ad_set_id,
        "creative": { "creative_id": spec.creative_id },
        "status": spec.status.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use adgen_core::ad::{CompleteAdRequest, Targeting};

    use super::*;

    fn request() -> CompleteAdRequest {
        CompleteAdRequest::new(
            "Luxury Apartments",
            "Ocean View",
            "img.png",
            "Ocean view apartment",
            "Schedule a visit",
            "https://example.com/apartments",
            10_000,
            Targeting::default_audience(),
        )
    }

    #[test]
    fn campaign_omits_categories_when_unset() {
        let body = campaign_body(&request().campaign_spec());
        assert_eq!(body["status"], "PAUSED");
        assert_eq!(body["objective"], "OUTCOME_TRAFFIC");
        assert_eq!(body["is_adset_budget_sharing_enabled"], false);
        assert!(body.get("special_ad_categories").is_none());
    }

    #[test]
    fn campaign_forwards_categories_verbatim() {
        let mut req = request();
        req.special_ad_categories = Some(vec!["HOUSING".into(), "CREDIT".into()]);
        let body = campaign_body(&req.campaign_spec());
        assert_eq!(body["special_ad_categories"], json!(["HOUSING", "CREDIT"]));
    }

    #[test]
    fn ad_set_carries_targeting_and_bid() {
        let body = ad_set_body(&request().ad_set_spec("111"));
        assert_eq!(body["campaign_id"], "111");
        assert_eq!(body["name"], "Ocean View - Ad Set");
        assert_eq!(body["daily_budget"], 10_000);
        assert_eq!(body["bid_amount"], 1_000);
        assert_eq!(body["targeting"]["geo_locations"]["countries"][0], "BR");
        assert_eq!(body["status"], "PAUSED");
    }

    #[test]
    fn creative_is_link_ad() {
        let body = creative_body(&request().creative_spec("abc", "page-9"));
        let story = &body["object_story_spec"];
        assert_eq!(body["name"], "Ocean View - Creative");
        assert_eq!(story["page_id"], "page-9");
        assert_eq!(story["link_data"]["image_hash"], "abc");
        assert_eq!(story["link_data"]["name"], "Ocean view apartment");
        assert_eq!(story["link_data"]["message"], "Schedule a visit");
        assert_eq!(story["link_data"]["call_to_action"]["type"], "LEARN_MORE");
        assert_eq!(
            story["link_data"]["call_to_action"]["value"]["link"],
            "https://example.com/apartments"
        );
    }

    #[test]
    fn ad_links_parents() {
        let body = ad_body(&request().ad_spec("222", "333"));
        assert_eq!(body["adset_id"], "222");
        assert_eq!(body["creative"]["creative_id"], "333");
        assert_eq!(body["name"], "Ocean View");
        assert_eq!(body["status"], "PAUSED");
    }
}
