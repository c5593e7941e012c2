//! TTS backend trait and types.

pub mod command;

use anyhow::Result;
use async_trait::async_trait;
use log::warn;
use std::path::{Path, PathBuf};

pub use command::CommandBackend;

/// Per-request synthesis options.
#[derive(Debug, Clone)]
pub struct TtsOptions {
    /// Path to voice reference audio for cloning
    pub voice_ref: Option<PathBuf>,
    /// Language code, e.g. "en"
    pub language: String,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            voice_ref: None,
            language: "en".to_string(),
        }
    }
}

impl TtsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice_ref(mut self, path: impl Into<PathBuf>) -> Self {
        self.voice_ref = Some(path.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// TTS backend trait - all TTS engines implement this.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize text to an audio file.
    async fn synthesize(&self, text: &str, output_path: &Path, options: &TtsOptions) -> Result<()>;

    /// Synthesize, retrying up to `max_retries` attempts in total.
    async fn synthesize_with_retry(
        &self,
        text: &str,
        output_path: &Path,
        options: &TtsOptions,
        max_retries: u32,
    ) -> Result<()> {
        let attempts = max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.synthesize(text, output_path, options).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "{}: generation failed (attempt {}/{}): {:#}",
                        self.name(),
                        attempt,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("All retry attempts failed")))
    }

    /// Backend name for logs.
    fn name(&self) -> &str;
}
