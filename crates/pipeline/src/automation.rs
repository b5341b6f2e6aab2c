//! End-to-end automation: prompt → image → published ad → JSON record.
//!
//! Each job generates one image, saves it under the images directory,
//! publishes it through [`AdPublisher::publish`], and writes an
//! [`AutomationRecord`] to `{logs_dir}/automation_log_{stamp}_{id}.json`.
//! The record is written whether the run succeeded or not.

use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use adgen_adplatform::AdPlatform;
use adgen_core::ad::{CompleteAdRequest, Targeting};
use adgen_core::image::{ImageOptions, ImageQuality, ImageSize, ImageStyle};
use adgen_core::steps::CreatedResource;
use adgen_core::types::{name_stamp, Timestamp};
use adgen_imagegen::{GeneratedImage, ImageProvider};

use crate::publisher::AdPublisher;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_TITLE: &str = "Discover something amazing";
pub const DEFAULT_LINK_URL: &str = "https://www.example.com";
pub const DEFAULT_DAILY_BUDGET: u64 = 5000;

/// Longest ad body taken from the revised prompt, in characters.
pub const MAX_BODY_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Job / record types
// ---------------------------------------------------------------------------

/// One automation job. Only `prompt` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationJob {
    pub prompt: String,
    pub campaign_name: Option<String>,
    pub ad_name: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub link_url: Option<String>,
    pub daily_budget: Option<u64>,
    pub targeting: Option<Targeting>,
    pub bid_amount: Option<u64>,
    pub special_ad_categories: Option<Vec<String>>,
    pub page_id: Option<String>,
    pub image_size: Option<ImageSize>,
    pub image_quality: Option<ImageQuality>,
    pub image_style: Option<ImageStyle>,
}

impl AutomationJob {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    fn image_options(&self, defaults: ImageOptions) -> ImageOptions {
        ImageOptions {
            size: self.image_size.unwrap_or(defaults.size),
            quality: self.image_quality.unwrap_or(defaults.quality),
            style: self.image_style.unwrap_or(defaults.style),
        }
    }

    /// Build the publish request, filling unset fields with defaults.
    pub fn ad_request(
        &self,
        image_path: &Path,
        revised_prompt: &str,
        stamp: &str,
    ) -> CompleteAdRequest {
        let source = if revised_prompt.trim().is_empty() {
            self.prompt.as_str()
        } else {
            revised_prompt
        };
        let body = self
            .body
            .clone()
            .unwrap_or_else(|| source.trim().chars().take(MAX_BODY_CHARS).collect());

        let mut req = CompleteAdRequest::new(
            self.campaign_name
                .clone()
                .unwrap_or_else(|| format!("Campaign_{stamp}")),
            self.ad_name.clone().unwrap_or_else(|| format!("Ad_{stamp}")),
            image_path,
            self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body,
            self.link_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LINK_URL.to_string()),
            self.daily_budget.unwrap_or(DEFAULT_DAILY_BUDGET),
            self.targeting
                .clone()
                .unwrap_or_else(Targeting::default_audience),
        );
        req.bid_amount = self.bid_amount;
        req.special_ad_categories = self.special_ad_categories.clone();
        req.page_id = self.page_id.clone();
        req
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub local_path: Option<PathBuf>,
    pub revised_prompt: String,
    pub size: ImageSize,
    pub quality: ImageQuality,
    pub style: ImageStyle,
}

impl From<&GeneratedImage> for ImageRecord {
    fn from(image: &GeneratedImage) -> Self {
        Self {
            url: image.url.clone(),
            local_path: image.local_path.clone(),
            revised_prompt: image.revised_prompt.clone(),
            size: image.options.size,
            quality: image.options.quality,
            style: image.options.style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdRecord {
    pub campaign_id: String,
    pub ad_set_id: String,
    pub creative_id: String,
    pub ad_id: String,
    pub image_hash: String,
    pub campaign_name: String,
    pub title: String,
    pub body: String,
    pub link: String,
    pub daily_budget: u64,
}

/// Outcome of one automation run, as written to the log directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRecord {
    pub success: bool,
    pub timestamp: Timestamp,
    pub prompt: String,
    pub image: Option<ImageRecord>,
    pub ad: Option<AdRecord>,
    pub error: Option<String>,
    /// Publish attempts made (0 when image generation failed).
    pub attempts: u32,
    /// Resources created by failed publish attempts.
    #[serde(default)]
    pub orphaned: Vec<CreatedResource>,
}

/// A run whose record has been written.
#[derive(Debug, Clone)]
pub struct AutomationOutcome {
    pub record: AutomationRecord,
    pub log_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("Failed to write automation log {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize automation log: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// AdAutomation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AutomationSettings {
    pub images_dir: PathBuf,
    pub logs_dir: PathBuf,
    /// Options used where a job leaves them unset.
    pub image_options: ImageOptions,
    /// Jobs run at once by [`AdAutomation::run_batch`]. At least 1.
    pub batch_concurrency: usize,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("generated_images"),
            logs_dir: PathBuf::from("logs"),
            image_options: ImageOptions {
                quality: ImageQuality::Hd,
                ..Default::default()
            },
            batch_concurrency: 1,
        }
    }
}

pub struct AdAutomation<I, P> {
    images: I,
    publisher: AdPublisher<P>,
    settings: AutomationSettings,
}

impl<I: ImageProvider, P: AdPlatform> AdAutomation<I, P> {
    pub fn new(images: I, publisher: AdPublisher<P>, settings: AutomationSettings) -> Self {
        Self {
            images,
            publisher,
            settings,
        }
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    /// Run one job and write its record.
    pub async fn run(
        &self,
        job: &AutomationJob,
        cancel: &CancellationToken,
    ) -> Result<AutomationOutcome, AutomationError> {
        let now = Utc::now();
        let stamp = name_stamp(now);
        let run_id = short_id();

        let record = self.execute(job, cancel, now, &stamp, &run_id).await;
        let log_path = self.write_record(&record, &stamp, &run_id).await?;

        if record.success {
            tracing::info!(log = %log_path.display(), "Automation run succeeded");
        } else {
            tracing::error!(
                log = %log_path.display(),
                error = record.error.as_deref().unwrap_or_default(),
                "Automation run failed",
            );
        }

        Ok(AutomationOutcome { record, log_path })
    }

    /// Run jobs with bounded concurrency. Results are in input order.
    pub async fn run_batch(
        &self,
        jobs: &[AutomationJob],
        cancel: &CancellationToken,
    ) -> Vec<Result<AutomationOutcome, AutomationError>> {
        let concurrency = self.settings.batch_concurrency.max(1);
        tracing::info!(jobs = jobs.len(), concurrency, "Starting batch");

        stream::iter(jobs)
            .map(|job| self.run(job, cancel))
            .buffered(concurrency)
            .collect()
            .await
    }

    async fn execute(
        &self,
        job: &AutomationJob,
        cancel: &CancellationToken,
        now: Timestamp,
        stamp: &str,
        run_id: &str,
    ) -> AutomationRecord {
        let mut record = AutomationRecord {
            success: false,
            timestamp: now,
            prompt: job.prompt.clone(),
            image: None,
            ad: None,
            error: None,
            attempts: 0,
            orphaned: Vec::new(),
        };

        let image_path = self
            .settings
            .images_dir
            .join(format!("ad_image_{stamp}_{run_id}.png"));
        let options = job.image_options(self.settings.image_options);

        let image = match self
            .images
            .generate_and_persist(&job.prompt, options, Some(&image_path))
            .await
        {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(error = %e, "Image generation failed");
                record.error = Some(e.to_string());
                return record;
            }
        };
        record.image = Some(ImageRecord::from(&image));

        let local_path = image.local_path.as_deref().unwrap_or(&image_path);
        let req = job.ad_request(local_path, &image.revised_prompt, stamp);

        match self.publisher.publish(&req, cancel).await {
            Ok(published) => {
                let bundle = published.value;
                record.success = true;
                record.attempts = published.attempts;
                record.orphaned = published.orphaned;
                record.ad = Some(AdRecord {
                    campaign_id: bundle.campaign_id,
                    ad_set_id: bundle.ad_set_id,
                    creative_id: bundle.creative_id,
                    ad_id: bundle.ad_id,
                    image_hash: bundle.image_hash,
                    campaign_name: req.campaign_name,
                    title: req.title,
                    body: req.body,
                    link: req.link_url,
                    daily_budget: req.daily_budget,
                });
            }
            Err(failure) => {
                record.error = Some(failure.error.to_string());
                record.attempts = failure.attempts;
                record.orphaned = failure.orphaned;
            }
        }

        record
    }

    async fn write_record(
        &self,
        record: &AutomationRecord,
        stamp: &str,
        run_id: &str,
    ) -> Result<PathBuf, AutomationError> {
        let dir = &self.settings.logs_dir;
        let path = dir.join(format!("automation_log_{stamp}_{run_id}.json"));
        let json = serde_json::to_vec_pretty(record)?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| AutomationError::Log {
                path: dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| AutomationError::Log {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

/// First 8 hex digits of a random UUID; keeps concurrent runs started in
/// the same second from sharing file names.
fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_defaults_fill_request() {
        let job = AutomationJob::new("A cozy cafe");
        let revised = "x".repeat(800);
        let req = job.ad_request(Path::new("img.png"), &revised, "20250101_120000");

        assert_eq!(req.campaign_name, "Campaign_20250101_120000");
        assert_eq!(req.ad_name, "Ad_20250101_120000");
        assert_eq!(req.title, DEFAULT_TITLE);
        assert_eq!(req.body.chars().count(), MAX_BODY_CHARS);
        assert_eq!(req.link_url, DEFAULT_LINK_URL);
        assert_eq!(req.daily_budget, 5000);
        assert_eq!(req.targeting, Targeting::default_audience());
        assert!(req.check().is_ok());
    }

    #[test]
    fn blank_revised_prompt_falls_back_to_prompt() {
        let job = AutomationJob::new("Coffee shop at dawn");
        let req = job.ad_request(Path::new("img.png"), "  ", "s");
        assert_eq!(req.body, "Coffee shop at dawn");
        assert!(req.check().is_ok());
    }

    #[test]
    fn job_overrides_win() {
        let job: AutomationJob = serde_json::from_value(serde_json::json!({
            "prompt": "Gym",
            "title": "Join now",
            "daily_budget": 2000,
            "bid_amount": 150,
            "image_quality": "standard"
        }))
        .unwrap();

        let req = job.ad_request(Path::new("img.png"), "revised", "s");
        assert_eq!(req.title, "Join now");
        assert_eq!(req.body, "revised");
        assert_eq!(req.ad_set_spec("1").bid_amount, 150);

        let options = job.image_options(AutomationSettings::default().image_options);
        assert_eq!(options.quality, ImageQuality::Standard);
        assert_eq!(options.size, ImageSize::Square);
    }

    #[test]
    fn default_settings_use_hd() {
        assert_eq!(
            AutomationSettings::default().image_options.quality,
            ImageQuality::Hd
        );
    }

    #[test]
    fn short_id_is_eight_hex_chars() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
