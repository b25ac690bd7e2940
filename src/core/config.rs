use crate::core::error::GenerationError;
use crate::core::messages::Locale;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_total_pages")]
    pub total_pages: usize,

    #[serde(default)]
    pub display_mode: DisplayMode,

    #[serde(default)]
    pub locale: Locale,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// How pages are published while illustrations are generated.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Wait for every image, then show the whole book.
    #[default]
    Sequential,
    /// Show the text at once and fill images in page by page.
    Progressive,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            aspect_ratio: default_aspect_ratio(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_pages: default_total_pages(),
            display_mode: DisplayMode::default(),
            locale: Locale::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

fn default_total_pages() -> usize {
    10
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_image_model() -> String {
    "imagen-4.0-generate-001".to_string()
}
fn default_aspect_ratio() -> String {
    "16:9".to_string()
}
fn default_timeout_seconds() -> u64 {
    120
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.yml"))
    }

    /// Reads a YAML config. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if config.total_pages == 0 {
            anyhow::bail!("total_pages must be at least 1");
        }
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn env_api_key() -> Option<String> {
        std::env::var(API_KEY_ENV).ok()
    }

    /// In the browser there is no process environment; the key is baked in at build time.
    #[cfg(target_arch = "wasm32")]
    pub fn env_api_key() -> Option<String> {
        option_env!("API_KEY").map(str::to_string)
    }

    /// The API credential: the environment value if given, then `gemini.api_key`.
    pub fn api_key_with(&self, env_value: Option<String>) -> Result<String, GenerationError> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.gemini
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
            })
            .ok_or_else(|| {
                GenerationError::Config(format!("{} environment variable not set.", API_KEY_ENV))
            })
    }
}
