//! Inline images: the self-describing payload every component exchanges.
//!
//! An [`InlineImage`] is a MIME type plus base64-encoded bytes. It serializes
//! as a data URL (`data:<mime>;base64,<bytes>`), which is the form used for
//! display, and exposes the bare base64 body for transmission to the image
//! model.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A MIME-tagged, base64-encoded image.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InlineImage {
    mime_type: String,
    data: String,
}

impl InlineImage {
    /// Wrap an already base64-encoded body.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, BASE64.encode(bytes))
    }

    /// Parse a `data:<mime>;base64,<bytes>` string.
    pub fn parse_data_url(url: &str) -> Result<Self, DataUrlError> {
        let rest = url
            .strip_prefix(DATA_URL_SCHEME)
            .ok_or(DataUrlError::MissingScheme)?;
        let (mime_type, data) = rest
            .split_once(BASE64_MARKER)
            .ok_or(DataUrlError::NotBase64)?;
        if mime_type.is_empty() {
            return Err(DataUrlError::MissingMimeType);
        }
        if data.is_empty() {
            return Err(DataUrlError::EmptyBody);
        }
        Ok(Self::new(mime_type, data))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The bare base64 body, with no data-URL framing.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn to_data_url(&self) -> String {
        format!("{DATA_URL_SCHEME}{}{BASE64_MARKER}{}", self.mime_type, self.data)
    }

    /// Decode the body back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, DataUrlError> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| DataUrlError::InvalidBase64(e.to_string()))
    }

    /// Size of the decoded image, computed from the base64 length.
    pub fn approx_byte_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        ((self.data.len() / 4) * 3).saturating_sub(padding.min(2))
    }

    /// File extension for the MIME type, used when saving a result.
    pub fn file_extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" => "heic",
            _ => "png",
        }
    }
}

// Payloads can be several megabytes; never dump them into logs.
impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("base64_len", &self.data.len())
            .finish()
    }
}

impl From<InlineImage> for String {
    fn from(image: InlineImage) -> Self {
        image.to_data_url()
    }
}

impl TryFrom<String> for InlineImage {
    type Error = DataUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_data_url(&value)
    }
}

/// Strip a leading `data:image/<subtype>;base64,` prefix, if present.
///
/// The subtype must be lowercase ASCII letters; anything else is returned
/// unchanged.
pub fn strip_data_url_prefix(value: &str) -> &str {
    let Some(rest) = value.strip_prefix("data:image/") else {
        return value;
    };
    let subtype_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_lowercase())
        .count();
    if subtype_len == 0 {
        return value;
    }
    rest[subtype_len..]
        .strip_prefix(BASE64_MARKER)
        .unwrap_or(value)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,

    #[error("data URL is not base64-encoded")]
    NotBase64,

    #[error("data URL has no MIME type")]
    MissingMimeType,

    #[error("data URL has an empty body")]
    EmptyBody,

    #[error("invalid base64 body: {0}")]
    InvalidBase64(String),
}
