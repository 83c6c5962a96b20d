//! Image model gateway implementations for BananaFit.
//!
//! All gateways implement the `bananafit_core::GenerationGateway` trait.
//! [`build_from_config`] selects the backend named in configuration.

pub mod gemini;

pub use gemini::GeminiGateway;

use bananafit_config::AppConfig;
use bananafit_core::GenerationGateway;
use bananafit_core::error::GenerationError;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured generation gateway.
///
/// Fails with [`GenerationError::NotConfigured`] when no API key is available
/// or the backend name is unknown.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn GenerationGateway>, GenerationError> {
    let generation = &config.generation;

    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            GenerationError::NotConfigured(
                "no API key; set BANANAFIT_API_KEY, GEMINI_API_KEY or api_key in config.toml"
                    .into(),
            )
        })?;

    match generation.provider.as_str() {
        "gemini" => {
            let gateway = GeminiGateway::new(
                api_key,
                &generation.model,
                generation.timeout_secs.map(Duration::from_secs),
            )?
            .with_base_url(&generation.api_url);
            Ok(Arc::new(gateway))
        }
        other => Err(GenerationError::NotConfigured(format!(
            "unknown image model provider '{other}'"
        ))),
    }
}
