// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Person detection and scene classification through an Ollama vision model

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use super::{parse_classification, parse_detection, PersonDetector, SceneClassifier};
use crate::config::{EngineConfig, PromptConfig};
use crate::ollama::OllamaClient;
use crate::record::RankedClass;
use crate::Result;

/// Longest side sent to the model, in pixels
const MAX_EDGE: u32 = 1024;

pub struct OllamaVision {
    client: OllamaClient,
    model: String,
    prompts: PromptConfig,
    /// Last encoded image; detection and classification of one photo share it
    last_payload: Mutex<Option<(PathBuf, Arc<String>)>>,
}

impl OllamaVision {
    pub fn new(engine: &EngineConfig, prompts: &PromptConfig) -> Result<Self> {
        let client = OllamaClient::new(&engine.url, Duration::from_secs(engine.timeout_secs))?;
        Ok(Self {
            client,
            model: engine.vision_model.clone(),
            prompts: prompts.clone(),
            last_payload: Mutex::new(None),
        })
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Convert image to base64 for the vision model
    fn encode_image(path: &Path) -> Result<String> {
        let data = match Self::prepare_image(path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Could not downscale {:?} ({}), sending original bytes", path, e);
                std::fs::read(path)?
            }
        };
        Ok(general_purpose::STANDARD.encode(&data))
    }

    /// Resize large images for faster processing
    fn prepare_image(path: &Path) -> Result<Vec<u8>> {
        let img = image::open(path)?;

        let img = if img.width() > MAX_EDGE || img.height() > MAX_EDGE {
            img.resize(MAX_EDGE, MAX_EDGE, image::imageops::FilterType::Triangle)
        } else {
            img
        };
        debug!("Prepared {:?} at {:?}", path, img.dimensions());

        // JPEG has no alpha channel
        let img = DynamicImage::ImageRgb8(img.to_rgb8());

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

        Ok(buffer)
    }

    /// Base64 payload for `path`, encoded at most once per consecutive use.
    fn payload(&self, path: &Path) -> Result<Arc<String>> {
        if let Ok(cached) = self.last_payload.lock() {
            if let Some((cached_path, data)) = cached.as_ref() {
                if cached_path == path {
                    return Ok(Arc::clone(data));
                }
            }
        }

        let data = Arc::new(Self::encode_image(path)?);
        if let Ok(mut cached) = self.last_payload.lock() {
            *cached = Some((path.to_path_buf(), Arc::clone(&data)));
        }
        Ok(data)
    }

    async fn ask(&self, path: &Path, prompt: &str) -> Result<String> {
        let image_data = self.payload(path)?;
        self.client
            .generate_with_image(&self.model, prompt, &image_data)
            .await
    }
}

#[async_trait]
impl PersonDetector for OllamaVision {
    async fn count_people(&self, path: &Path) -> Result<u32> {
        let answer = self.ask(path, &self.prompts.detect).await?;
        parse_detection(&answer)
    }
}

#[async_trait]
impl SceneClassifier for OllamaVision {
    async fn classify(&self, path: &Path, top_k: usize) -> Result<Vec<RankedClass>> {
        let prompt = self.prompts.classify.replace("{top_k}", &top_k.to_string());
        let answer = self.ask(path, &prompt).await?;
        parse_classification(&answer, top_k)
    }
}
