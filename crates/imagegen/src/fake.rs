use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use adgen_core::image::{validate_prompt, ImageOptions};

use crate::download::write_file;
use crate::error::ImageGenError;
use crate::provider::{GeneratedImage, ImageProvider};

/// Encode a small solid PNG. Used wherever a real, decodable image file
/// is needed without calling the image API.
pub fn png_fixture_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::new_rgb8(8, 8)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encoding an in-memory PNG cannot fail");
    buf
}

/// `FakeImageProvider` is an in-memory implementation of [`ImageProvider`]
/// for tests. Generated URLs are `fake://image/<n>`; persisting writes a
/// real PNG so downstream upload checks pass.
#[derive(Clone, Default)]
pub struct FakeImageProvider {
    prompts: Arc<Mutex<Vec<String>>>,
    fail_generation: Arc<Mutex<Option<String>>>,
}

impl FakeImageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `generate` call fail with an API error
    /// carrying `body`.
    pub async fn fake_fail_generation(&self, body: &str) {
        *self.fail_generation.lock().await = Some(body.to_string());
    }

    /// Prompts received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl ImageProvider for FakeImageProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: ImageOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        validate_prompt(prompt)?;

        if let Some(body) = self.fail_generation.lock().await.clone() {
            return Err(ImageGenError::Api { status: 500, body });
        }

        let mut prompts = self.prompts.lock().await;
        prompts.push(prompt.to_string());

        Ok(GeneratedImage {
            url: format!("fake://image/{}", prompts.len()),
            revised_prompt: format!("Revised: {prompt}"),
            options,
            local_path: None,
        })
    }

    async fn persist(&self, _url: &str, path: &Path) -> Result<PathBuf, ImageGenError> {
        write_file(path, &png_fixture_bytes()).await?;
        Ok(path.to_path_buf())
    }
}
