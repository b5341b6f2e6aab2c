//! HTTP client for the Graph-style advertising API.
//!
//! [`GraphApiClient`] is an explicit, injectable client object: it owns
//! the credential, the ad account it writes to, and a pooled
//! [`reqwest::Client`]. Nothing is initialized process-wide.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use adgen_core::account::validate_ad_account_id;
use adgen_core::ad::{AdSetSpec, AdSpec, CampaignSpec, CreativeSpec};
use adgen_core::error::CoreError;
use adgen_core::types::ResourceId;

use crate::asset::ImageAsset;
use crate::error::{PlatformError, UploadError};
use crate::payload;
use crate::platform::AdPlatform;
use crate::proof::appsecret_proof;

/// Default API base URL.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Default API version path segment.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Default HTTP timeout for a single platform call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for one ad account.
#[derive(Clone)]
pub struct GraphConfig {
    pub base_url: String,
    pub api_version: String,
    pub access_token: String,
    /// Enables `appsecret_proof` on every request when set.
    pub app_secret: Option<String>,
    /// `act_<digits>`.
    pub ad_account_id: String,
    pub page_id: Option<String>,
    pub request_timeout: Duration,
}

impl GraphConfig {
    /// Config with default endpoint, version, and timeout.
    pub fn new(access_token: String, ad_account_id: String) -> Result<Self, CoreError> {
        validate_ad_account_id(&ad_account_id)?;
        Ok(Self {
            base_url: DEFAULT_GRAPH_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            access_token,
            app_secret: None,
            ad_account_id,
            page_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("access_token", &"<redacted>")
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("ad_account_id", &self.ad_account_id)
            .field("page_id", &self.page_id)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// HTTP client bound to one ad account.
pub struct GraphApiClient {
    client: reqwest::Client,
    config: GraphConfig,
    proof: Option<String>,
}

impl GraphApiClient {
    pub fn new(config: GraphConfig) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GraphConfig) -> Self {
        let proof = config
            .app_secret
            .as_deref()
            .map(|secret| appsecret_proof(secret, &config.access_token));
        Self {
            client,
            config,
            proof,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn ad_account_id(&self) -> &str {
        &self.config.ad_account_id
    }

    // ---- URLs ----

    /// `{base}/{version}/{node}`.
    pub(crate) fn node_url(&self, node: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            node
        )
    }

    /// `{base}/{version}/{account}/{edge}`.
    pub(crate) fn account_edge_url(&self, edge: &str) -> String {
        self.node_url(&format!("{}/{}", self.config.ad_account_id, edge))
    }

    // ---- transport ----

    /// POST a JSON body and return the decoded response object.
    async fn post_json(&self, url: &str, mut body: Value) -> Result<Value, PlatformError> {
        if let (Some(proof), Some(obj)) = (&self.proof, body.as_object_mut()) {
            obj.insert("appsecret_proof".into(), Value::String(proof.clone()));
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await?;

        parse_response(response).await
    }

    /// GET a node with the given `fields` selection.
    pub(crate) async fn get_json(&self, url: &str, fields: &[&str]) -> Result<Value, PlatformError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }
        if let Some(proof) = &self.proof {
            query.push(("appsecret_proof", proof.clone()));
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .query(&query)
            .send()
            .await?;

        parse_response(response).await
    }

    /// POST to an account edge and return the created object's `id`.
    async fn create(&self, edge: &str, body: Value) -> Result<ResourceId, PlatformError> {
        let url = self.account_edge_url(edge);
        tracing::debug!(edge, "Creating platform resource");
        let response = self.post_json(&url, body).await?;
        created_id(&response)
    }
}

#[async_trait]
impl AdPlatform for GraphApiClient {
    async fn upload_image(&self, asset: &ImageAsset) -> Result<String, UploadError> {
        tracing::info!(
            path = %asset.path.display(),
            bytes = asset.bytes.len(),
            width = asset.width,
            height = asset.height,
            "Uploading image",
        );

        let part = reqwest::multipart::Part::bytes(asset.bytes.clone())
            .file_name(asset.file_name.clone())
            .mime_str(asset.mime_type())
            .map_err(|e| UploadError::Rejected(PlatformError::Request(e)))?;
        let mut form = reqwest::multipart::Form::new().part("filename", part);
        if let Some(proof) = &self.proof {
            form = form.text("appsecret_proof", proof.clone());
        }

        let response = self
            .client
            .post(self.account_edge_url("adimages"))
            .bearer_auth(&self.config.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Rejected(e.into()))?;

        let body = parse_response(response)
            .await
            .map_err(UploadError::Rejected)?;
        parse_image_hash(&body)
    }

    async fn create_campaign(&self, spec: &CampaignSpec) -> Result<ResourceId, PlatformError> {
        self.create("campaigns", payload::campaign_body(spec)).await
    }

    async fn create_ad_set(&self, spec: &AdSetSpec) -> Result<ResourceId, PlatformError> {
        self.create("adsets", payload::ad_set_body(spec)).await
    }

    async fn create_creative(&self, spec: &CreativeSpec) -> Result<ResourceId, PlatformError> {
        self.create("adcreatives", payload::creative_body(spec)).await
    }

    async fn create_ad(&self, spec: &AdSpec) -> Result<ResourceId, PlatformError> {
        self.create("ads", payload::ad_body(spec)).await
    }

    fn default_page_id(&self) -> Option<&str> {
        self.config.page_id.as_deref()
    }
}

// ---- private helpers ----

/// Decode a response: non-2xx bodies become [`PlatformError`]s with the
/// platform's own error text, 2xx bodies must be JSON.
async fn parse_response(response: reqwest::Response) -> Result<Value, PlatformError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(PlatformError::from_response(status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| PlatformError::Decode(format!("response is not JSON: {e}")))
}

/// Extract the `id` of a created object. Numeric IDs are stringified.
pub fn created_id(response: &Value) -> Result<ResourceId, PlatformError> {
    match response.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(PlatformError::Decode(format!(
            "response missing 'id': {response}"
        ))),
    }
}

/// Extract the content hash from an `adimages` response:
/// `{"images": {"<file name>": {"hash": "...", "url": "..."}}}`.
pub fn parse_image_hash(response: &Value) -> Result<String, UploadError> {
    response
        .get("images")
        .and_then(Value::as_object)
        .and_then(|images| images.values().next())
        .and_then(|image| image.get("hash"))
        .and_then(Value::as_str)
        .filter(|hash| !hash.is_empty())
        .map(str::to_string)
        .ok_or(UploadError::MissingHash)
}
