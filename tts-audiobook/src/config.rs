//! tts-audiobook configuration management.

use crate::text::{LongWordPolicy, SegmenterConfig, DEFAULT_MAX_LENGTH};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiobookConfig {
    /// Upper bound in characters for each text unit sent to the TTS engine
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Clean smart quotes, dashes, and control characters before segmenting
    #[serde(default = "default_true")]
    pub normalize_text: bool,

    /// What to do with a word longer than `max_length`
    #[serde(default)]
    pub long_word_policy: LongWordPolicy,

    /// Default voice reference audio for cloning
    #[serde(default)]
    pub voice_ref: Option<PathBuf>,

    /// Language code passed to the TTS engine
    #[serde(default = "default_language")]
    pub language: String,

    /// Directory for per-book chapter audio. None means next to the input file.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Synthesis attempts per segment
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default)]
    pub tts: TtsCommandConfig,
}

/// External TTS program invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsCommandConfig {
    #[serde(default = "default_tts_program")]
    pub program: String,

    /// Arguments; `{output}`, `{voice}`, `{language}`, and `{text}` are substituted
    #[serde(default = "default_tts_args")]
    pub args: Vec<String>,
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_tts_program() -> String {
    "piper".to_string()
}

fn default_tts_args() -> Vec<String> {
    vec!["--output_file".to_string(), "{output}".to_string()]
}

impl Default for TtsCommandConfig {
    fn default() -> Self {
        Self {
            program: default_tts_program(),
            args: default_tts_args(),
        }
    }
}

impl Default for AudiobookConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            normalize_text: true,
            long_word_policy: LongWordPolicy::default(),
            voice_ref: None,
            language: default_language(),
            output_dir: None,
            max_retries: default_max_retries(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            tts: TtsCommandConfig::default(),
        }
    }
}

impl AudiobookConfig {
    /// Get the config file path: <config dir>/tts-audiobook/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(base.join("tts-audiobook").join("config.toml"))
    }

    /// Load config from file, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate TOML config text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: AudiobookConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            anyhow::bail!("max_length must be greater than zero");
        }
        if self.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }
        if self.tts.program.trim().is_empty() {
            anyhow::bail!("tts.program must not be empty");
        }
        Ok(())
    }

    /// Segmenter settings derived from this config.
    pub fn segmenter_config(&self) -> Result<SegmenterConfig> {
        Ok(SegmenterConfig::new(self.max_length)?.with_long_word_policy(self.long_word_policy))
    }
}
