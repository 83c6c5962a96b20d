//! Asset encoder implementations for BananaFit.
//!
//! Implements `bananafit_core::AssetEncoder`: local files are read with
//! `tokio::fs`, remote URLs are fetched with `reqwest`, and both are tagged
//! with a MIME type before being base64-encoded.

pub mod http;
pub mod sniff;

pub use http::HttpAssetEncoder;
pub use sniff::detect_mime;
