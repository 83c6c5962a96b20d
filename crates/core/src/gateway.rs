//! Generation gateway trait: the abstraction over the remote image model.
//!
//! A gateway knows how to synthesize a garment from a text description and a
//! try-on composite from a person and a garment. It never touches workflow
//! state; the coordinator owns every slot and the history log.
//!
//! Implementations: `bananafit_providers::GeminiGateway`.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::image::InlineImage;

/// The two remote generation calls.
///
/// Implementations hold no per-request mutable state, so both calls may run
/// concurrently for different requests.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// A human-readable name for this backend (e.g., "gemini").
    fn name(&self) -> &str;

    /// Synthesize a standalone product photo of a garment.
    async fn synthesize_clothing(&self, prompt: &str) -> Result<InlineImage, GenerationError>;

    /// Synthesize the person wearing the garment.
    async fn synthesize_try_on(
        &self,
        person: &InlineImage,
        clothing: &InlineImage,
    ) -> Result<InlineImage, GenerationError>;
}
