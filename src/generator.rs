//! Content generators producing the bytes for each upload
//!
//! Two variants are selected per batch:
//!
//! - [`TextGenerator`] builds a short random sentence from a fixed
//!   vocabulary, named `uploads/text_<millis>_<index>.txt`.
//! - [`ImageGenerator`] fetches a seeded random image, named
//!   `uploads/image_<seed>_<w>x<h>.jpg`, and falls back to a block of
//!   random bytes named `uploads/random_<millis>_<index>.bin` when the
//!   fetch fails. Generation itself never fails.

use crate::config::GeneratorConfig;
use crate::error::{PilotError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const SUBJECTS: &[&str] = &["I", "She", "They", "We", "My friend"];
const VERBS: &[&str] = &["ate at", "saw", "liked", "went to"];
const OBJECTS: &[&str] = &["the house", "the park", "the mall", "the beach"];
const TIME_WORDS: &[&str] = &["yesterday", "tomorrow", "earlier"];

/// Which generator a batch uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Synthetic sentences
    Text,
    /// Random images with random-bytes fallback
    Image,
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(format!("unknown content mode '{}', expected text or image", other)),
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// One generated item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    /// Storage name the item will be registered under
    pub name: String,
    /// Raw bytes
    pub data: Vec<u8>,
}

/// Source of upload content
///
/// `index` is the 0-based position of the item within its batch.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Produce the next item; must not fail
    async fn generate(&self, index: usize) -> GeneratedContent;
}

/// Build the generator for `mode`
///
/// # Errors
///
/// Returns `PilotError::Generator` if the HTTP client for the image
/// variant cannot be built.
pub fn for_mode(mode: ContentMode, config: &GeneratorConfig) -> Result<Arc<dyn ContentSource>> {
    match mode {
        ContentMode::Text => Ok(Arc::new(TextGenerator)),
        ContentMode::Image => Ok(Arc::new(ImageGenerator::new(config)?)),
    }
}

/// Random sentences from a small fixed vocabulary
#[derive(Debug, Clone, Copy, Default)]
pub struct TextGenerator;

impl TextGenerator {
    /// Build the sentence for item `index`
    pub fn sentence(index: usize) -> String {
        let mut rng = rand::rng();
        let pick = |words: &[&'static str], rng: &mut rand::rngs::ThreadRng| {
            words.choose(rng).copied().unwrap_or_default()
        };
        format!(
            "{} {} {} {}. Sentence {}.",
            pick(SUBJECTS, &mut rng),
            pick(VERBS, &mut rng),
            pick(OBJECTS, &mut rng),
            pick(TIME_WORDS, &mut rng),
            index + 1
        )
    }
}

#[async_trait]
impl ContentSource for TextGenerator {
    async fn generate(&self, index: usize) -> GeneratedContent {
        GeneratedContent {
            name: format!(
                "uploads/text_{}_{}.txt",
                Utc::now().timestamp_millis(),
                index
            ),
            data: Self::sentence(index).into_bytes(),
        }
    }
}

/// Seeded random images with a random-bytes fallback
#[derive(Debug, Clone)]
pub struct ImageGenerator {
    client: reqwest::Client,
    base_url: String,
    width: u32,
    height: u32,
    fallback_size: usize,
}

impl ImageGenerator {
    /// Create an image generator from configuration
    ///
    /// # Errors
    ///
    /// Returns `PilotError::Generator` if the HTTP client cannot be built.
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .build()
            .map_err(|e| PilotError::Generator(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.image_url.trim_end_matches('/').to_string(),
            width: config.image_width,
            height: config.image_height,
            fallback_size: config.fallback_size_bytes,
        })
    }

    async fn fetch(&self, seed: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/seed/{}/{}/{}",
            self.base_url, seed, self.width, self.height
        );
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PilotError::Generator(format!("image fetch returned {}", status)).into());
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(PilotError::Generator("image fetch returned an empty body".into()).into());
        }
        Ok(body.to_vec())
    }

    /// Random bytes used when no image could be fetched
    pub fn fallback(&self, index: usize) -> GeneratedContent {
        let mut data = vec![0u8; self.fallback_size];
        rand::rng().fill_bytes(&mut data);
        GeneratedContent {
            name: format!(
                "uploads/random_{}_{}.bin",
                Utc::now().timestamp_millis(),
                index
            ),
            data,
        }
    }
}

#[async_trait]
impl ContentSource for ImageGenerator {
    async fn generate(&self, index: usize) -> GeneratedContent {
        let seed = hex::encode(rand::random::<[u8; 4]>());
        match self.fetch(&seed).await {
            Ok(data) => GeneratedContent {
                name: format!(
                    "uploads/image_{}_{}x{}.jpg",
                    seed, self.width, self.height
                ),
                data,
            },
            Err(e) => {
                tracing::warn!(item = index + 1, error = %e, "Image fetch failed, using random bytes");
                self.fallback(index)
            }
        }
    }
}
