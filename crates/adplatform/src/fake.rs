use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use adgen_core::ad::{AdSetSpec, AdSpec, CampaignSpec, CreativeSpec};
use adgen_core::steps::Step;
use adgen_core::types::ResourceId;

use crate::asset::ImageAsset;
use crate::diagnostics::{
    AccountInfo, AccountProbe, ManagedPage, PageInfo, PermissionSummary, UserInfo,
    CRITICAL_PERMISSIONS,
};
use crate::error::{GraphErrorDetail, PlatformError, UploadError};
use crate::platform::AdPlatform;

/// Page returned by [`FakeAdPlatform::default_page_id`] unless overridden.
pub const FAKE_PAGE_ID: &str = "page-1";

/// Scripted outcome for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    /// Platform reports a temporary fault (`is_transient: true`).
    Transient,
    /// Invalid parameter, not retryable.
    Permanent,
    /// Invalid parameter naming the page.
    PageIdentity,
    /// The call "succeeds" with an empty identifier.
    EmptyId,
}

impl FakeFailure {
    fn error(self, step: Step) -> Option<PlatformError> {
        let detail = match self {
            FakeFailure::Transient => GraphErrorDetail::new(
                "An unexpected error has occurred. Please retry your request later.",
                2,
            )
            .transient(true),
            FakeFailure::Permanent => GraphErrorDetail::new(
                format!("Invalid parameter in {step} request"),
                100,
            )
            .transient(false),
            FakeFailure::PageIdentity => {
                let mut detail = GraphErrorDetail::new("Invalid parameter", 100).transient(false);
                detail.error_user_msg =
                    Some("The Page ID is missing or you lack permission to use this Page".into());
                detail
            }
            FakeFailure::EmptyId => return None,
        };
        let status = if self == FakeFailure::Transient { 500 } else { 400 };
        Some(PlatformError::Api { status, detail })
    }
}

/// Fixed identifiers returned instead of generated ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeIds {
    pub image_hash: String,
    pub campaign_id: ResourceId,
    pub ad_set_id: ResourceId,
    pub creative_id: ResourceId,
    pub ad_id: ResourceId,
}

impl FakeIds {
    fn for_step(&self, step: Step) -> &str {
        match step {
            Step::Upload => &self.image_hash,
            Step::Campaign => &self.campaign_id,
            Step::AdSet => &self.ad_set_id,
            Step::Creative => &self.creative_id,
            Step::Ad => &self.ad_id,
        }
    }
}

#[derive(Debug, Clone)]
struct Script {
    failure: FakeFailure,
    /// `None` fails forever.
    remaining: Option<u32>,
}

/// Everything the fake has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct FakeRecord {
    /// Every call, including failed ones, in order.
    pub calls: Vec<Step>,
    pub uploads: Vec<PathBuf>,
    pub campaigns: Vec<CampaignSpec>,
    pub ad_sets: Vec<AdSetSpec>,
    pub creatives: Vec<CreativeSpec>,
    pub ads: Vec<AdSpec>,
}

impl FakeRecord {
    pub fn count(&self, step: Step) -> usize {
        self.calls.iter().filter(|s| **s == step).count()
    }
}

/// Read-only probe that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeProbe {
    User,
    Account,
    Permissions,
    ManagedPages,
    Page,
}

#[derive(Default)]
struct FakeState {
    record: FakeRecord,
    scripts: HashMap<Step, Script>,
    delays: HashMap<Step, Duration>,
    failing_probes: HashSet<FakeProbe>,
    next_id: u64,
}

/// `FakeAdPlatform` is an in-memory implementation of [`AdPlatform`] for
/// tests. Each successful create returns a fresh numeric-string ID unless
/// fixed IDs are configured; failures are scripted per step.
#[derive(Clone)]
pub struct FakeAdPlatform {
    state: Arc<Mutex<FakeState>>,
    fixed_ids: Option<FakeIds>,
    page_id: Option<String>,
    managed_pages: Vec<ManagedPage>,
}

impl Default for FakeAdPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAdPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            fixed_ids: None,
            page_id: Some(FAKE_PAGE_ID.to_string()),
            managed_pages: vec![ManagedPage {
                id: FAKE_PAGE_ID.to_string(),
                name: Some("Fake Page".into()),
                tasks: vec!["ADVERTISE".into(), "CREATE_CONTENT".into()],
                has_access_token: true,
            }],
        }
    }

    pub fn with_ids(mut self, ids: FakeIds) -> Self {
        self.fixed_ids = Some(ids);
        self
    }

    pub fn with_page_id(mut self, page_id: Option<&str>) -> Self {
        self.page_id = page_id.map(str::to_string);
        self
    }

    /// Pages listed by the managed-pages probe.
    pub fn with_managed_pages(mut self, pages: Vec<ManagedPage>) -> Self {
        self.managed_pages = pages;
        self
    }

    /// Make `probe` fail with an invalid-token error.
    pub async fn fail_probe(&self, probe: FakeProbe) {
        self.state.lock().await.failing_probes.insert(probe);
    }

    async fn probe_outcome(&self, probe: FakeProbe) -> Result<(), PlatformError> {
        if self.state.lock().await.failing_probes.contains(&probe) {
            return Err(PlatformError::Api {
                status: 400,
                detail: GraphErrorDetail::new("Error validating access token", 190),
            });
        }
        Ok(())
    }

    /// Fail the next call to `step` only.
    pub async fn fail_next(&self, step: Step, failure: FakeFailure) {
        self.fail_times(step, failure, 1).await;
    }

    /// Fail the next `times` calls to `step`.
    pub async fn fail_times(&self, step: Step, failure: FakeFailure, times: u32) {
        self.state.lock().await.scripts.insert(
            step,
            Script {
                failure,
                remaining: Some(times),
            },
        );
    }

    /// Fail every call to `step`.
    pub async fn fail_always(&self, step: Step, failure: FakeFailure) {
        self.state.lock().await.scripts.insert(
            step,
            Script {
                failure,
                remaining: None,
            },
        );
    }

    /// Sleep for `delay` before answering calls to `step`.
    pub async fn delay(&self, step: Step, delay: Duration) {
        self.state.lock().await.delays.insert(step, delay);
    }

    pub async fn record(&self) -> FakeRecord {
        self.state.lock().await.record.clone()
    }

    /// Record the call, apply the script, and hand out the identifier.
    async fn answer(&self, step: Step) -> Result<String, PlatformError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.record.calls.push(step);
            state.delays.get(&step).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if let Some(script) = state.scripts.get_mut(&step) {
            let failure = script.failure;
            match &mut script.remaining {
                Some(0) => {}
                Some(n) => {
                    *n -= 1;
                    return scripted(failure, step);
                }
                None => return scripted(failure, step),
            }
        }

        state.next_id += 1;
        let id = match &self.fixed_ids {
            Some(ids) => ids.for_step(step).to_string(),
            None if step == Step::Upload => format!("hash{:04}", state.next_id),
            None => (120_000_000_000 + state.next_id).to_string(),
        };
        Ok(id)
    }
}

fn scripted(failure: FakeFailure, step: Step) -> Result<String, PlatformError> {
    match failure.error(step) {
        Some(err) => Err(err),
        None => Ok(String::new()),
    }
}

#[async_trait]
impl AdPlatform for FakeAdPlatform {
    async fn upload_image(&self, asset: &ImageAsset) -> Result<String, UploadError> {
        self.state.lock().await.record.uploads.push(asset.path.clone());
        self.answer(Step::Upload).await.map_err(UploadError::Rejected)
    }

    async fn create_campaign(&self, spec: &CampaignSpec) -> Result<ResourceId, PlatformError> {
        self.state.lock().await.record.campaigns.push(spec.clone());
        self.answer(Step::Campaign).await
    }

    async fn create_ad_set(&self, spec: &AdSetSpec) -> Result<ResourceId, PlatformError> {
        self.state.lock().await.record.ad_sets.push(spec.clone());
        self.answer(Step::AdSet).await
    }

    async fn create_creative(&self, spec: &CreativeSpec) -> Result<ResourceId, PlatformError> {
        self.state.lock().await.record.creatives.push(spec.clone());
        self.answer(Step::Creative).await
    }

    async fn create_ad(&self, spec: &AdSpec) -> Result<ResourceId, PlatformError> {
        self.state.lock().await.record.ads.push(spec.clone());
        self.answer(Step::Ad).await
    }

    fn default_page_id(&self) -> Option<&str> {
        self.page_id.as_deref()
    }
}

#[async_trait]
impl AccountProbe for FakeAdPlatform {
    fn configured_page_id(&self) -> Option<&str> {
        self.page_id.as_deref()
    }

    async fn user_info(&self) -> Result<UserInfo, PlatformError> {
        self.probe_outcome(FakeProbe::User).await?;
        Ok(UserInfo {
            id: "user-1".into(),
            name: Some("Fake User".into()),
        })
    }

    async fn account_info(&self) -> Result<AccountInfo, PlatformError> {
        self.probe_outcome(FakeProbe::Account).await?;
        Ok(AccountInfo {
            id: "act_1".into(),
            name: Some("Fake Account".into()),
            account_status: Some(1),
            currency: Some("BRL".into()),
            timezone_name: Some("America/Sao_Paulo".into()),
            business: None,
        })
    }

    async fn permissions(&self) -> Result<PermissionSummary, PlatformError> {
        self.probe_outcome(FakeProbe::Permissions).await?;
        Ok(PermissionSummary {
            granted: CRITICAL_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
            declined: Vec::new(),
        })
    }

    async fn managed_pages(&self) -> Result<Vec<ManagedPage>, PlatformError> {
        self.probe_outcome(FakeProbe::ManagedPages).await?;
        Ok(self.managed_pages.clone())
    }

    async fn page_info(&self, page_id: &str) -> Result<PageInfo, PlatformError> {
        self.probe_outcome(FakeProbe::Page).await?;
        let name = self
            .managed_pages
            .iter()
            .find(|page| page.id == page_id)
            .and_then(|page| page.name.clone());
        Ok(PageInfo {
            id: page_id.to_string(),
            name,
            is_published: Some(true),
        })
    }
}
