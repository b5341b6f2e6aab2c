//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use adgen_adplatform::diagnostics::{run_diagnostics, DiagnosticReport};
use adgen_adplatform::GraphApiClient;
use adgen_core::account::mask_secret;
use adgen_core::image::ImageOptions;
use adgen_imagegen::{GeneratedImage, ImageGenApi, ImageProvider};
use adgen_pipeline::{AdAutomation, AdPublisher, AutomationJob};

use crate::config::WorkerConfig;

/// A jobs file holds one job object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JobsFile {
    Many(Vec<AutomationJob>),
    One(AutomationJob),
}

pub async fn load_jobs(path: &Path) -> anyhow::Result<Vec<AutomationJob>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading jobs file {}", path.display()))?;
    let jobs = match serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing jobs file {}", path.display()))?
    {
        JobsFile::Many(jobs) => jobs,
        JobsFile::One(job) => vec![job],
    };
    anyhow::ensure!(!jobs.is_empty(), "jobs file {} is empty", path.display());
    Ok(jobs)
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub logs: Vec<PathBuf>,
}

/// Generate and publish every job in `jobs_path`.
pub async fn run(
    config: &WorkerConfig,
    jobs_path: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<RunSummary> {
    let jobs = load_jobs(jobs_path).await?;

    let images = ImageGenApi::new(
        config.openai_base_url.clone(),
        config.openai_api_key()?.to_string(),
    )?;
    let platform = GraphApiClient::new(config.graph_config()?)?;
    let publisher = AdPublisher::new(platform, config.publish_options());
    let automation = AdAutomation::new(images, publisher, config.automation_settings());

    let mut summary = RunSummary {
        succeeded: 0,
        failed: 0,
        logs: Vec::new(),
    };

    for (index, result) in automation
        .run_batch(&jobs, cancel)
        .await
        .into_iter()
        .enumerate()
    {
        let outcome = result.with_context(|| format!("job {}", index + 1))?;
        if outcome.record.success {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
        summary.logs.push(outcome.log_path);
    }

    Ok(summary)
}

/// Result of the image API credential check.
#[derive(Debug, Serialize)]
pub struct ImageApiStatus {
    pub models: usize,
    pub image_model: String,
    pub image_model_available: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub image_api: Result<ImageApiStatus, String>,
    pub platform: DiagnosticReport,
}

impl CheckReport {
    pub fn is_healthy(&self) -> bool {
        self.image_api.is_ok() && self.platform.is_healthy()
    }
}

/// Check both sets of credentials: the image API key and the platform
/// account, token permissions, and pages.
pub async fn check(config: &WorkerConfig) -> anyhow::Result<CheckReport> {
    let image_api = check_image_api(config).await;

    let graph = config.graph_config()?;
    tracing::info!(
        ad_account_id = %graph.ad_account_id,
        access_token = %mask_secret(&graph.access_token),
        api_version = %graph.api_version,
        "Running diagnostics",
    );

    let client = GraphApiClient::new(graph)?;
    let platform = run_diagnostics(&client).await;

    let missing = platform.missing_critical_permissions();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Token lacks critical permissions");
    }
    if platform.page.is_none() {
        tracing::warn!("META_PAGE_ID is not set; creatives need a page");
    }

    Ok(CheckReport {
        image_api,
        platform,
    })
}

/// List models with the configured key. Failures are reported, not raised.
pub async fn check_image_api(config: &WorkerConfig) -> Result<ImageApiStatus, String> {
    let key = config.openai_api_key().map_err(|e| e.to_string())?;
    tracing::info!(api_key = %mask_secret(key), "Checking image API key");

    let api = ImageGenApi::new(config.openai_base_url.clone(), key.to_string())
        .map_err(|e| e.to_string())?;
    let models = api.list_models().await.map_err(|e| {
        tracing::warn!(error = %e, "Image API key check failed");
        e.to_string()
    })?;

    let image_model_available = models.iter().any(|m| m == api.model());
    if !image_model_available {
        tracing::warn!(model = %api.model(), "Image model not listed for this key");
    }
    Ok(ImageApiStatus {
        models: models.len(),
        image_model: api.model().to_string(),
        image_model_available,
    })
}

/// Generate one image, optionally saving it to `out`.
pub async fn generate(
    config: &WorkerConfig,
    prompt: &str,
    options: ImageOptions,
    out: Option<&Path>,
) -> anyhow::Result<GeneratedImage> {
    let api = ImageGenApi::new(
        config.openai_base_url.clone(),
        config.openai_api_key()?.to_string(),
    )?;
    let image = api.generate_and_persist(prompt, options, out).await?;
    Ok(image)
}
