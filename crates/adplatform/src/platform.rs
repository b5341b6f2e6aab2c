//! The [`AdPlatform`] seam: one method per resource-creation step.

use async_trait::async_trait;

use adgen_core::ad::{AdSetSpec, AdSpec, CampaignSpec, CreativeSpec};
use adgen_core::types::ResourceId;

use crate::asset::ImageAsset;
use crate::error::{PlatformError, UploadError};

/// Account-scoped, additive resource creation on an advertising platform.
///
/// Implementations hold their own credentials and account context; the
/// caller constructs one and injects it into the publisher.
#[async_trait]
pub trait AdPlatform: Send + Sync {
    /// Upload image bytes to the account's image library and return the
    /// platform content hash.
    async fn upload_image(&self, asset: &ImageAsset) -> Result<String, UploadError>;

    async fn create_campaign(&self, spec: &CampaignSpec) -> Result<ResourceId, PlatformError>;

    async fn create_ad_set(&self, spec: &AdSetSpec) -> Result<ResourceId, PlatformError>;

    async fn create_creative(&self, spec: &CreativeSpec) -> Result<ResourceId, PlatformError>;

    async fn create_ad(&self, spec: &AdSpec) -> Result<ResourceId, PlatformError>;

    /// Page creatives are attributed to when a request does not name one.
    fn default_page_id(&self) -> Option<&str>;
}
