//! The [`ImageProvider`] seam and its result types.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use adgen_core::image::ImageOptions;

use crate::error::ImageGenError;

/// One generated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Remote URL the image can be downloaded from.
    pub url: String,
    /// Prompt as rewritten by the model.
    pub revised_prompt: String,
    pub options: ImageOptions,
    /// Set once the image has been persisted locally.
    pub local_path: Option<PathBuf>,
}

/// Produces images from text prompts.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image. Must reject invalid prompts before any remote call.
    async fn generate(
        &self,
        prompt: &str,
        options: ImageOptions,
    ) -> Result<GeneratedImage, ImageGenError>;

    /// Fetch the image at `url` and write it to `path`.
    async fn persist(&self, url: &str, path: &Path) -> Result<PathBuf, ImageGenError>;

    /// Generate an image and, when `save_path` is given, persist it there.
    async fn generate_and_persist(
        &self,
        prompt: &str,
        options: ImageOptions,
        save_path: Option<&Path>,
    ) -> Result<GeneratedImage, ImageGenError> {
        let mut image = self.generate(prompt, options).await?;
        if let Some(path) = save_path {
            image.local_path = Some(self.persist(&image.url, path).await?);
        }
        Ok(image)
    }
}

/// One entry of [`generate_variations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub variation: String,
    pub image: GeneratedImage,
}

/// Generate one image per variation, in order, using the prompt
/// `"{base_prompt}. {variation}"`. Stops at the first failure.
pub async fn generate_variations<P>(
    provider: &P,
    base_prompt: &str,
    variations: &[String],
    options: ImageOptions,
) -> Result<Vec<Variation>, ImageGenError>
where
    P: ImageProvider + ?Sized,
{
    let mut results = Vec::with_capacity(variations.len());

    for (i, variation) in variations.iter().enumerate() {
        tracing::info!(
            index = i + 1,
            total = variations.len(),
            "Generating variation"
        );
        let prompt = format!("{base_prompt}. {variation}");
        let image = provider.generate(&prompt, options).await?;
        results.push(Variation {
            variation: variation.clone(),
            image,
        });
    }

    Ok(results)
}
