//! Asset encoder trait: turns raw image sources into inline images.
//!
//! Implementations: `bananafit_encoder::HttpAssetEncoder` (reqwest + tokio::fs).

use async_trait::async_trait;

use crate::asset::LocalFile;
use crate::error::{EncodeError, FetchError};
use crate::image::InlineImage;

/// Converts a local file or a remote URL into an [`InlineImage`].
///
/// Both operations are idempotent but never cached: every call re-reads or
/// re-fetches its source.
#[async_trait]
pub trait AssetEncoder: Send + Sync {
    /// Read a user-supplied file.
    async fn encode_local_file(&self, file: &LocalFile) -> Result<InlineImage, EncodeError>;

    /// Fetch a remote image.
    async fn encode_remote_url(&self, url: &str) -> Result<InlineImage, FetchError>;
}
