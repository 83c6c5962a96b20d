//! Configuration loading, validation, and management for BananaFit.
//!
//! Loads configuration from `~/.bananafit/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use bananafit_core::ImageAsset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.bananafit/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the image model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Remote image model settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Asset encoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Preset catalog
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("generation", &self.generation)
            .field("encoder", &self.encoder)
            .field("gateway", &self.gateway)
            .field("catalog", &self.catalog)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Backend name ("gemini")
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Upper bound on one generation call. Unset means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash-image".into()
}
fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_url: default_api_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Largest image accepted from a file or URL
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Request body limit; uploads are raw image bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Browser origins allowed by CORS; empty disables cross-origin access
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
            allowed_origins: Vec::new(),
        }
    }
}

/// A catalog entry as written in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetConfig {
    pub id: String,
    pub url: String,
}

impl PresetConfig {
    fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    pub fn to_asset(&self) -> ImageAsset {
        ImageAsset::preset(&self.id, &self.url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_persons")]
    pub persons: Vec<PresetConfig>,

    #[serde(default = "default_clothing")]
    pub clothing: Vec<PresetConfig>,
}

fn default_persons() -> Vec<PresetConfig> {
    vec![
        PresetConfig::new(
            "p1",
            "https://L.mji.rip/2025/11/19/51362f10bf3635242516915166323f46.png",
        ),
        PresetConfig::new(
            "p2",
            "https://L.mji.rip/2025/11/19/d42af8d2f41175683d1467bc2c857cbe.png",
        ),
        PresetConfig::new("p3", "https://picsum.photos/seed/person1/400/600"),
    ]
}

fn default_clothing() -> Vec<PresetConfig> {
    vec![
        PresetConfig::new("c1", "https://picsum.photos/seed/jacket/400/400"),
        PresetConfig::new("c2", "https://picsum.photos/seed/dress/400/400"),
        PresetConfig::new("c3", "https://picsum.photos/seed/suit/400/400"),
    ]
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            persons: default_persons(),
            clothing: default_clothing(),
        }
    }
}

impl CatalogConfig {
    pub fn person_assets(&self) -> Vec<ImageAsset> {
        self.persons.iter().map(PresetConfig::to_asset).collect()
    }

    pub fn clothing_assets(&self) -> Vec<ImageAsset> {
        self.clothing.iter().map(PresetConfig::to_asset).collect()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.bananafit/config.toml).
    ///
    /// Also checks environment variables for the API key:
    /// - `BANANAFIT_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    /// - `API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("BANANAFIT_API_KEY")
                .or_else(|| lookup("GEMINI_API_KEY"))
                .or_else(|| lookup("API_KEY"));
        }

        if let Some(model) = lookup("BANANAFIT_MODEL") {
            self.generation.model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".bananafit")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generation.model must not be empty".into(),
            ));
        }

        if self.generation.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0 when set".into(),
            ));
        }

        if self.encoder.max_image_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "encoder.max_image_bytes must be > 0".into(),
            ));
        }

        validate_presets("catalog.persons", &self.catalog.persons)?;
        validate_presets("catalog.clothing", &self.catalog.clothing)?;

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn validate_presets(section: &str, presets: &[PresetConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for preset in presets {
        if !seen.insert(preset.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "{section}: duplicate preset id '{}'",
                preset.id
            )));
        }
        if !preset.url.starts_with("http://") && !preset.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{section}: preset '{}' must use an http(s) URL",
                preset.id
            )));
        }
    }
    Ok(())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            generation: GenerationConfig::default(),
            encoder: EncoderConfig::default(),
            gateway: GatewayConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
