//! The ad publishing orchestrator.
//!
//! One attempt runs upload → campaign → ad set → creative → ad, strictly
//! in that order. Each step consumes identifiers produced earlier, so a
//! failure stops the attempt; nothing is rolled back. Resources created
//! before the failure are returned in the [`PipelineFailure`] ledger.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use adgen_adplatform::client::DEFAULT_REQUEST_TIMEOUT;
use adgen_adplatform::{AdPlatform, ImageAsset};
use adgen_core::ad::{AdBundle, CompleteAdRequest};
use adgen_core::retry::RetryPolicy;
use adgen_core::steps::{require_id, Step};

use crate::error::{PipelineError, PipelineFailure};
use crate::ledger::StepLedger;
use crate::retry::{with_retry, Retried, RetryError, Sleeper, TokioSleeper};

/// Tunables for [`AdPublisher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Upper bound on a single platform call.
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Publishes complete ads through an injected [`AdPlatform`].
pub struct AdPublisher<P> {
    platform: P,
    options: PublishOptions,
    sleeper: Arc<dyn Sleeper>,
}

impl<P: AdPlatform> AdPublisher<P> {
    pub fn new(platform: P, options: PublishOptions) -> Self {
        Self {
            platform,
            options,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    /// Run [`create_complete_ad`](Self::create_complete_ad) under the retry
    /// policy. Every retry starts again from the upload step.
    pub async fn publish(
        &self,
        req: &CompleteAdRequest,
        cancel: &CancellationToken,
    ) -> Result<Retried<AdBundle>, RetryError<PipelineFailure>> {
        with_retry(&self.options.retry, self.sleeper.as_ref(), cancel, move |attempt| {
            tracing::info!(
                attempt,
                max_attempts = self.options.retry.attempts(),
                ad_name = %req.ad_name,
                "Starting publish attempt",
            );
            self.create_complete_ad(req, cancel)
        })
        .await
    }

    /// One attempt at creating the full resource chain.
    pub async fn create_complete_ad(
        &self,
        req: &CompleteAdRequest,
        cancel: &CancellationToken,
    ) -> Result<AdBundle, PipelineFailure> {
        let mut ledger = StepLedger::new();
        match self.run_steps(req, cancel, &mut ledger).await {
            Ok(bundle) => Ok(bundle),
            Err(error) => {
                if !ledger.is_empty() {
                    tracing::warn!(
                        step = ?error.step(),
                        orphans = ledger.created().len(),
                        "Attempt failed after creating resources; they remain paused",
                    );
                }
                Err(PipelineFailure {
                    error,
                    created: ledger.into_created(),
                })
            }
        }
    }

    async fn run_steps(
        &self,
        req: &CompleteAdRequest,
        cancel: &CancellationToken,
        ledger: &mut StepLedger,
    ) -> Result<AdBundle, PipelineError> {
        req.check()?;

        let page_id = req
            .page_id
            .as_deref()
            .or_else(|| self.platform.default_page_id())
            .unwrap_or_default();
        let page_id = require_id(page_id, Step::Creative, "page_id")?;

        // ---- upload ----
        checkpoint(Step::Upload, cancel)?;
        let asset = ImageAsset::load(&req.image_path).await?;
        let image_hash = self
            .bounded(Step::Upload, self.platform.upload_image(&asset))
            .await??;
        ledger.record(Step::Upload, &image_hash);
        require_id(&image_hash, Step::Creative, "image_hash")?;
        tracing::info!(step = %Step::Upload, image_hash = %image_hash, "Image uploaded");

        // ---- campaign ----
        checkpoint(Step::Campaign, cancel)?;
        let campaign_id = self
            .bounded(
                Step::Campaign,
                self.platform.create_campaign(&req.campaign_spec()),
            )
            .await?
            .map_err(PipelineError::at(Step::Campaign))?;
        ledger.record(Step::Campaign, &campaign_id);
        require_id(&campaign_id, Step::AdSet, "campaign_id")?;
        tracing::info!(step = %Step::Campaign, campaign_id = %campaign_id, "Campaign created");

        // ---- ad set ----
        checkpoint(Step::AdSet, cancel)?;
        let ad_set_spec = req.ad_set_spec(&campaign_id);
        tracing::debug!(
            daily_budget = ad_set_spec.daily_budget,
            bid_amount = ad_set_spec.bid_amount,
            "Ad set spec",
        );
        let ad_set_id = self
            .bounded(Step::AdSet, self.platform.create_ad_set(&ad_set_spec))
            .await?
            .map_err(PipelineError::at(Step::AdSet))?;
        ledger.record(Step::AdSet, &ad_set_id);
        require_id(&ad_set_id, Step::Ad, "ad_set_id")?;
        tracing::info!(step = %Step::AdSet, ad_set_id = %ad_set_id, "Ad set created");

        // ---- creative ----
        checkpoint(Step::Creative, cancel)?;
        let creative_id = self
            .bounded(
                Step::Creative,
                self.platform
                    .create_creative(&req.creative_spec(&image_hash, page_id)),
            )
            .await?
            .map_err(PipelineError::at(Step::Creative))?;
        ledger.record(Step::Creative, &creative_id);
        require_id(&creative_id, Step::Ad, "creative_id")?;
        tracing::info!(step = %Step::Creative, creative_id = %creative_id, "Creative created");

        // ---- ad ----
        checkpoint(Step::Ad, cancel)?;
        let ad_id = self
            .bounded(
                Step::Ad,
                self.platform.create_ad(&req.ad_spec(&ad_set_id, &creative_id)),
            )
            .await?
            .map_err(PipelineError::at(Step::Ad))?;
        ledger.record(Step::Ad, &ad_id);
        require_id(&ad_id, Step::Ad, "ad_id")?;
        tracing::info!(step = %Step::Ad, ad_id = %ad_id, "Ad created");

        Ok(AdBundle {
            campaign_id,
            ad_set_id,
            creative_id,
            ad_id,
            image_hash,
        })
    }

    /// Apply the per-call timeout to one platform call.
    async fn bounded<F: Future>(&self, step: Step, call: F) -> Result<F::Output, PipelineError> {
        let after = self.options.call_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| PipelineError::Timeout { step, after })
    }
}

fn checkpoint(step: Step, cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        tracing::info!(%step, "Publishing cancelled");
        return Err(PipelineError::Cancelled { step });
    }
    Ok(())
}
