//! Scripted collaborators for exercising the coordinator without a network.
//!
//! Both doubles derive their output deterministically from their input, count
//! their calls, and can be held in flight with a [`Notify`] gate.

use async_trait::async_trait;
use bananafit_core::error::{EncodeError, FetchError, GenerationError};
use bananafit_core::{AssetEncoder, GenerationGateway, InlineImage, LocalFile};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// The image [`ScriptedEncoder`] produces for a remote URL.
pub fn image_for_url(url: &str) -> InlineImage {
    InlineImage::from_bytes("image/png", url.as_bytes())
}

/// The image [`ScriptedGateway`] produces for a clothing prompt.
pub fn image_for_prompt(prompt: &str) -> InlineImage {
    InlineImage::from_bytes("image/png", format!("garment:{prompt}").as_bytes())
}

/// The image [`ScriptedGateway`] produces for a try-on.
pub fn image_for_try_on(person: &InlineImage, clothing: &InlineImage) -> InlineImage {
    InlineImage::from_bytes(
        "image/png",
        format!("tryon:{}+{}", person.data(), clothing.data()).as_bytes(),
    )
}

/// Encoder that never touches the network or filesystem.
#[derive(Default)]
pub struct ScriptedEncoder {
    failing_urls: Mutex<HashSet<String>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl ScriptedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call until the gate is notified once per call.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn fail_url(&self, url: &str) {
        self.failing_urls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl AssetEncoder for ScriptedEncoder {
    async fn encode_local_file(&self, file: &LocalFile) -> Result<InlineImage, EncodeError> {
        self.enter().await;
        match file {
            LocalFile::Memory {
                content_type,
                bytes,
                ..
            } if !bytes.is_empty() => Ok(InlineImage::from_bytes(
                content_type.as_deref().unwrap_or("image/png"),
                bytes,
            )),
            LocalFile::Memory { name, .. } => Err(EncodeError::Empty(name.clone())),
            LocalFile::Path(path) => Err(EncodeError::Read {
                name: path.display().to_string(),
                reason: "scripted encoder does not read files".into(),
            }),
        }
    }

    async fn encode_remote_url(&self, url: &str) -> Result<InlineImage, FetchError> {
        self.enter().await;
        let failing = self
            .failing_urls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(url);
        if failing {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(image_for_url(url))
    }
}

/// Gateway with switchable failure.
#[derive(Default)]
pub struct ScriptedGateway {
    failure: Mutex<Option<GenerationError>>,
    gate: Option<Arc<Notify>>,
    clothing_calls: AtomicUsize,
    try_on_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call until the gate is notified once per call.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Make subsequent calls fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<GenerationError>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }

    pub fn clothing_calls(&self) -> usize {
        self.clothing_calls.load(Ordering::SeqCst)
    }

    pub fn try_on_calls(&self) -> usize {
        self.try_on_calls.load(Ordering::SeqCst)
    }

    async fn finish(&self, image: InlineImage) -> Result<InlineImage, GenerationError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let failure = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match failure {
            Some(error) => Err(error),
            None => Ok(image),
        }
    }
}

#[async_trait]
impl GenerationGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn synthesize_clothing(&self, prompt: &str) -> Result<InlineImage, GenerationError> {
        self.clothing_calls.fetch_add(1, Ordering::SeqCst);
        self.finish(image_for_prompt(prompt)).await
    }

    async fn synthesize_try_on(
        &self,
        person: &InlineImage,
        clothing: &InlineImage,
    ) -> Result<InlineImage, GenerationError> {
        self.try_on_calls.fetch_add(1, Ordering::SeqCst);
        self.finish(image_for_try_on(person, clothing)).await
    }
}
