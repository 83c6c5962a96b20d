//! Image assets and local file handles.

use crate::image::InlineImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where an asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOrigin {
    /// A stable catalog entry.
    Preset,
    /// Synthesized by the image model during this process.
    Generated,
}

/// The image behind an asset: already inline, or still a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AssetPayload {
    Inline(InlineImage),
    Remote(String),
}

/// A selectable image (person or garment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Identity of the asset; selection is compared by id only.
    pub id: String,
    pub payload: AssetPayload,
    pub origin: AssetOrigin,
}

impl ImageAsset {
    /// A catalog entry pointing at a remote URL.
    pub fn preset(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: AssetPayload::Remote(url.into()),
            origin: AssetOrigin::Preset,
        }
    }

    /// A model-synthesized asset. Generated payloads are always inline.
    pub fn generated(id: impl Into<String>, image: InlineImage) -> Self {
        Self {
            id: id.into(),
            payload: AssetPayload::Inline(image),
            origin: AssetOrigin::Generated,
        }
    }

    pub fn is_preset(&self) -> bool {
        self.origin == AssetOrigin::Preset
    }

    pub fn inline(&self) -> Option<&InlineImage> {
        match &self.payload {
            AssetPayload::Inline(image) => Some(image),
            AssetPayload::Remote(_) => None,
        }
    }

    pub fn remote_url(&self) -> Option<&str> {
        match &self.payload {
            AssetPayload::Remote(url) => Some(url),
            AssetPayload::Inline(_) => None,
        }
    }
}

/// A user-supplied image file.
///
/// Either a path on disk or bytes already held in memory (an HTTP upload).
#[derive(Clone)]
pub enum LocalFile {
    Path(PathBuf),
    Memory {
        name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl LocalFile {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn memory(
        name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self::Memory {
            name: name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    /// A human-readable name for notices and logs.
    pub fn display_name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Memory { name, .. } => name.clone(),
        }
    }
}

impl std::fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Memory {
                name,
                content_type,
                bytes,
            } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("content_type", content_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_is_remote() {
        let asset = ImageAsset::preset("c1", "https://picsum.photos/seed/jacket/400/400");
        assert!(asset.is_preset());
        assert!(asset.inline().is_none());
        assert_eq!(
            asset.remote_url(),
            Some("https://picsum.photos/seed/jacket/400/400")
        );
    }

    #[test]
    fn generated_is_inline() {
        let image = InlineImage::new("image/png", "AAAA");
        let asset = ImageAsset::generated("gen_1", image.clone());
        assert!(!asset.is_preset());
        assert_eq!(asset.inline(), Some(&image));
        assert!(asset.remote_url().is_none());
    }

    #[test]
    fn payload_serialization_is_tagged() {
        let asset = ImageAsset::preset("p1", "https://x/p.png");
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["payload"]["kind"], "remote");
        assert_eq!(json["payload"]["value"], "https://x/p.png");
        assert_eq!(json["origin"], "preset");
    }

    #[test]
    fn memory_file_debug_omits_bytes() {
        let file = LocalFile::memory("upload.png", Some("image/png".into()), vec![1u8; 64]);
        let debug = format!("{file:?}");
        assert!(debug.contains("upload.png"));
        assert!(debug.contains("64"));
        assert_eq!(file.display_name(), "upload.png");
    }
}
