//! HTTP + filesystem encoder.

use async_trait::async_trait;
use bananafit_config::EncoderConfig;
use bananafit_core::error::{EncodeError, FetchError};
use bananafit_core::{AssetEncoder, InlineImage, LocalFile};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::sniff::detect_mime;

/// Encodes local files and remote URLs into inline images.
pub struct HttpAssetEncoder {
    client: reqwest::Client,
    max_image_bytes: usize,
}

impl HttpAssetEncoder {
    pub fn new(
        fetch_timeout: Duration,
        max_image_bytes: usize,
    ) -> Result<Self, bananafit_core::Error> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| bananafit_core::Error::Config {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_image_bytes,
        })
    }

    pub fn from_config(config: &EncoderConfig) -> Result<Self, bananafit_core::Error> {
        Self::new(
            Duration::from_secs(config.fetch_timeout_secs),
            config.max_image_bytes,
        )
    }

    fn encode_bytes(
        &self,
        name: &str,
        declared: Option<&str>,
        path_hint: Option<&Path>,
        bytes: &[u8],
    ) -> Result<InlineImage, EncodeError> {
        if bytes.is_empty() {
            return Err(EncodeError::Empty(name.to_string()));
        }
        if bytes.len() > self.max_image_bytes {
            return Err(EncodeError::TooLarge {
                name: name.to_string(),
                limit: self.max_image_bytes,
            });
        }
        let mime = detect_mime(declared, path_hint, bytes).ok_or_else(|| {
            EncodeError::NotAnImage {
                name: name.to_string(),
            }
        })?;
        debug!(file = %name, mime = %mime, bytes = bytes.len(), "Encoded local image");
        Ok(InlineImage::from_bytes(mime, bytes))
    }
}

#[async_trait]
impl AssetEncoder for HttpAssetEncoder {
    async fn encode_local_file(&self, file: &LocalFile) -> Result<InlineImage, EncodeError> {
        match file {
            LocalFile::Path(path) => {
                let name = path.display().to_string();
                let bytes = tokio::fs::read(path).await.map_err(|e| EncodeError::Read {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
                self.encode_bytes(&name, None, Some(path), &bytes)
            }
            LocalFile::Memory {
                name,
                content_type,
                bytes,
            } => self.encode_bytes(name, content_type.as_deref(), Some(Path::new(name)), bytes),
        }
    }

    async fn encode_remote_url(&self, url: &str) -> Result<InlineImage, FetchError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "{url}: only http and https are supported"
            )));
        }

        debug!(url = %url, "Fetching remote image");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_image_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_image_bytes,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        // Content-Length may be absent; enforce the cap while streaming.
        let mut bytes = Vec::new();
        let mut byte_stream = response.bytes_stream();
        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            if bytes.len() + chunk.len() > self.max_image_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_image_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let mime = detect_mime(content_type.as_deref(), None, &bytes).ok_or_else(|| {
            FetchError::NotAnImage {
                url: url.to_string(),
                content_type: content_type.unwrap_or_else(|| "unknown".into()),
            }
        })?;

        debug!(url = %url, mime = %mime, bytes = bytes.len(), "Fetched remote image");
        Ok(InlineImage::from_bytes(mime, &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::tests::{JPEG_BYTES, PNG_BYTES};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::get;

    fn encoder() -> HttpAssetEncoder {
        HttpAssetEncoder::new(Duration::from_secs(5), 1024).unwrap()
    }

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn image_routes() -> Router {
        Router::new()
            .route(
                "/p.png",
                get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES) }),
            )
            .route(
                "/blob",
                get(|| async {
                    (
                        [(header::CONTENT_TYPE, "application/octet-stream")],
                        JPEG_BYTES,
                    )
                }),
            )
            .route(
                "/page",
                get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }),
            )
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/chunked.png",
                get(|| async {
                    let chunks = PNG_BYTES
                        .chunks(8)
                        .map(|c| Ok::<_, std::io::Error>(c.to_vec()))
                        .collect::<Vec<_>>();
                    Body::from_stream(futures::stream::iter(chunks))
                }),
            )
            .route(
                "/endless.png",
                get(|| async {
                    Body::from_stream(futures::stream::repeat_with(|| {
                        Ok::<_, std::io::Error>(vec![0u8; 512])
                    }))
                }),
            )
            .route(
                "/huge.png",
                get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0u8; 4096]) }),
            )
    }

    #[tokio::test]
    async fn remote_png_is_encoded_with_its_content_type() {
        let base = serve(image_routes()).await;
        let image = encoder()
            .encode_remote_url(&format!("{base}/p.png"))
            .await
            .unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.decode().unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn remote_octet_stream_is_sniffed() {
        let base = serve(image_routes()).await;
        let image = encoder()
            .encode_remote_url(&format!("{base}/blob"))
            .await
            .unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn repeated_fetches_are_equivalent() {
        let base = serve(image_routes()).await;
        let enc = encoder();
        let url = format!("{base}/p.png");
        let first = enc.encode_remote_url(&url).await.unwrap();
        let second = enc.encode_remote_url(&url).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn remote_html_is_rejected() {
        let base = serve(image_routes()).await;
        let err = encoder()
            .encode_remote_url(&format!("{base}/page"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotAnImage { ref content_type, .. } if content_type == "text/html"));
    }

    #[tokio::test]
    async fn remote_404_is_a_status_error() {
        let base = serve(image_routes()).await;
        let err = encoder()
            .encode_remote_url(&format!("{base}/missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn remote_oversized_is_rejected() {
        let base = serve(image_routes()).await;
        let err = encoder()
            .encode_remote_url(&format!("{base}/huge.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn chunked_image_without_length_is_encoded() {
        let base = serve(image_routes()).await;
        let image = encoder()
            .encode_remote_url(&format!("{base}/chunked.png"))
            .await
            .unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.decode().unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn endless_body_stops_at_the_size_cap() {
        let base = serve(image_routes()).await;
        let err = encoder()
            .encode_remote_url(&format!("{base}/endless.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = encoder()
            .encode_remote_url(&format!("http://{addr}/p.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn non_http_urls_are_invalid() {
        let enc = encoder();
        assert!(matches!(
            enc.encode_remote_url("file:///etc/passwd").await,
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            enc.encode_remote_url("not a url").await,
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn local_path_is_read_and_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.bin");
        std::fs::write(&path, JPEG_BYTES).unwrap();

        let image = encoder()
            .encode_local_file(&LocalFile::path(&path))
            .await
            .unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        assert_eq!(image.decode().unwrap(), JPEG_BYTES);
    }

    #[tokio::test]
    async fn missing_local_file_is_a_read_error() {
        let err = encoder()
            .encode_local_file(&LocalFile::path("/nonexistent/me.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, EncodeError::Read { .. }));
    }

    #[tokio::test]
    async fn empty_local_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let err = encoder()
            .encode_local_file(&LocalFile::path(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, EncodeError::Empty(_)));
    }

    #[tokio::test]
    async fn in_memory_upload_uses_declared_type() {
        let file = LocalFile::memory("upload", Some("image/png".into()), PNG_BYTES);
        let image = encoder().encode_local_file(&file).await.unwrap();
        assert_eq!(image.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn html_labelled_as_png_is_rejected() {
        let file = LocalFile::memory(
            "shirt.png",
            Some("image/png".into()),
            b"<html><body>not found</body></html>".to_vec(),
        );
        let err = encoder().encode_local_file(&file).await.unwrap_err();
        assert!(matches!(err, EncodeError::NotAnImage { .. }));
    }

    #[tokio::test]
    async fn in_memory_text_upload_is_rejected() {
        let file = LocalFile::memory("notes.txt", Some("text/plain".into()), b"hello".to_vec());
        let err = encoder().encode_local_file(&file).await.unwrap_err();
        assert!(matches!(err, EncodeError::NotAnImage { .. }));
    }
}
