//! REST API client for the image-generation endpoint.
//!
//! Wraps `POST /v1/images/generations` (one image per request), the
//! follow-up download of the returned image URL, and `GET /v1/models` as a
//! cheap credential check, using [`reqwest`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use adgen_core::image::{validate_prompt, ImageOptions};

use crate::download::{download_to, DOWNLOAD_TIMEOUT};
use crate::error::ImageGenError;
use crate::provider::{GeneratedImage, ImageProvider};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Image model used for every request. It only supports `n = 1`.
pub const DEFAULT_MODEL: &str = "dall-e-3";

/// HTTP request timeout for a generation call. Generation is slow; the
/// bound is generous but finite.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the image-generation API.
pub struct ImageGenApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Response body of the generations endpoint.
#[derive(Debug, Deserialize)]
struct GenerationsResponse {
    #[serde(default)]
    data: Vec<GeneratedItem>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelItem>,
}

#[derive(Debug, Deserialize)]
struct ModelItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedItem {
    url: Option<String>,
    revised_prompt: Option<String>,
}

impl ImageGenApi {
    /// Create a new API client.
    ///
    /// * `base_url` - API base URL, e.g. `https://api.openai.com`.
    /// * `api_key`  - bearer credential.
    pub fn new(base_url: String, api_key: String) -> Result<Self, ImageGenError> {
        let client = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the image model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Generate one image for `prompt`.
    ///
    /// The prompt is validated locally first; an oversized prompt never
    /// reaches the network.
    pub async fn generate_image(
        &self,
        prompt: &str,
        options: ImageOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        validate_prompt(prompt)?;

        tracing::info!(
            model = %self.model,
            size = %options.size,
            quality = %options.quality,
            style = %options.style,
            prompt_preview = %preview(prompt),
            "Generating image",
        );

        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&build_request_body(&self.model, prompt, options))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body: GenerationsResponse = response.json().await?;
        let image = parse_generation(body, prompt, options)?;

        tracing::info!(url = %image.url, "Image generated");
        tracing::debug!(revised_prompt = %image.revised_prompt, "Revised prompt");
        Ok(image)
    }

    /// List the model ids the key can use. Costs nothing, so it doubles as
    /// a credential check.
    pub async fn list_models(&self) -> Result<Vec<String>, ImageGenError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body: ModelsResponse = response.json().await?;
        Ok(body.data.into_iter().map(|m| m.id).collect())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Download `url` to `path`, creating parent directories as needed.
    pub async fn download(&self, url: &str, path: &Path) -> Result<PathBuf, ImageGenError> {
        download_to(&self.client, url, path, DOWNLOAD_TIMEOUT).await
    }
}

#[async_trait]
impl ImageProvider for ImageGenApi {
    async fn generate(
        &self,
        prompt: &str,
        options: ImageOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        self.generate_image(prompt, options).await
    }

    async fn persist(&self, url: &str, path: &Path) -> Result<PathBuf, ImageGenError> {
        self.download(url, path).await
    }
}

// ---- helpers ----

/// JSON body for the generations endpoint.
pub fn build_request_body(model: &str, prompt: &str, options: ImageOptions) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "prompt": prompt,
        "size": options.size.as_str(),
        "quality": options.quality.as_str(),
        "style": options.style.as_str(),
        "n": 1,
    })
}

/// Pick the first returned image. A missing revised prompt falls back to
/// the prompt that was sent.
fn parse_generation(
    body: GenerationsResponse,
    prompt: &str,
    options: ImageOptions,
) -> Result<GeneratedImage, ImageGenError> {
    let item = body
        .data
        .into_iter()
        .next()
        .ok_or(ImageGenError::EmptyResponse)?;
    let url = item
        .url
        .filter(|u| !u.is_empty())
        .ok_or(ImageGenError::EmptyResponse)?;

    Ok(GeneratedImage {
        url,
        revised_prompt: item.revised_prompt.unwrap_or_else(|| prompt.to_string()),
        options,
        local_path: None,
    })
}

/// Map a non-2xx response to [`ImageGenError::Api`], keeping the body text.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ImageGenError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ImageGenError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn preview(prompt: &str) -> String {
    let mut out: String = prompt.trim().chars().take(100).collect();
    if prompt.trim().chars().count() > 100 {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use adgen_core::error::CoreError;
    use adgen_core::image::{ImageQuality, ImageSize, ImageStyle, MAX_PROMPT_CHARS};

    use super::*;

    #[test]
    fn request_body_shape() {
        let options = ImageOptions {
            size: ImageSize::Landscape,
            quality: ImageQuality::Hd,
            style: ImageStyle::Natural,
        };
        let body = build_request_body(DEFAULT_MODEL, "a house", options);
        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["prompt"], "a house");
        assert_eq!(body["size"], "1792x1024");
        assert_eq!(body["quality"], "hd");
        assert_eq!(body["style"], "natural");
        assert_eq!(body["n"], 1);
    }

    #[test]
    fn parse_takes_first_image() {
        let body: GenerationsResponse = serde_json::from_value(serde_json::json!({
            "created": 1,
            "data": [
                { "url": "https://img/1.png", "revised_prompt": "a nicer house" },
                { "url": "https://img/2.png" }
            ]
        }))
        .unwrap();

        let image = parse_generation(body, "a house", ImageOptions::default()).unwrap();
        assert_eq!(image.url, "https://img/1.png");
        assert_eq!(image.revised_prompt, "a nicer house");
        assert!(image.local_path.is_none());
    }

    #[test]
    fn parse_falls_back_to_original_prompt() {
        let body: GenerationsResponse = serde_json::from_value(serde_json::json!({
            "data": [{ "url": "https://img/1.png" }]
        }))
        .unwrap();

        let image = parse_generation(body, "a house", ImageOptions::default()).unwrap();
        assert_eq!(image.revised_prompt, "a house");
    }

    #[test]
    fn parse_empty_data_is_error() {
        let body: GenerationsResponse =
            serde_json::from_value(serde_json::json!({ "data": [] })).unwrap();
        assert_matches!(
            parse_generation(body, "p", ImageOptions::default()),
            Err(ImageGenError::EmptyResponse)
        );
    }

    #[test]
    fn models_response_lists_ids() {
        let body: ModelsResponse = serde_json::from_value(serde_json::json!({
            "object": "list",
            "data": [
                { "id": "dall-e-3", "object": "model" },
                { "id": "gpt-4o", "object": "model" }
            ]
        }))
        .unwrap();
        let ids: Vec<_> = body.data.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["dall-e-3", "gpt-4o"]);
    }

    #[tokio::test]
    async fn list_models_surfaces_connection_errors() {
        let api = ImageGenApi::new("http://127.0.0.1:9".into(), "key".into()).unwrap();
        assert_matches!(api.list_models().await, Err(ImageGenError::Request(_)));
    }

    #[test]
    fn preview_truncates_long_prompts() {
        let long = "x".repeat(150);
        assert_eq!(preview(&long).len(), 103);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn oversized_prompt_rejected_before_request() {
        // Port 9 (discard) on localhost: any request would fail with a
        // connection error, so a Validation error proves no request was made.
        let api = ImageGenApi::new("http://127.0.0.1:9".into(), "key".into()).unwrap();
        let prompt = "a".repeat(MAX_PROMPT_CHARS + 1);

        let result = api.generate_image(&prompt, ImageOptions::default()).await;
        assert_matches!(
            result,
            Err(ImageGenError::Validation(CoreError::Validation(_)))
        );
    }
}
