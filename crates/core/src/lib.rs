//! # BananaFit Core
//!
//! Domain types, traits, and error definitions for the BananaFit try-on
//! workflow. This crate has **zero framework dependencies** and defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping the remote image model via configuration
//! - Easy testing with scripted encoder/gateway implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod asset;
pub mod encoder;
pub mod error;
pub mod event;
pub mod gateway;
pub mod image;
pub mod stage;

// Re-export key types at crate root for ergonomics
pub use asset::{AssetOrigin, AssetPayload, ImageAsset, LocalFile};
pub use encoder::AssetEncoder;
pub use error::{EncodeError, Error, FetchError, GenerationError, Result};
pub use event::{DomainEvent, EventBus};
pub use gateway::GenerationGateway;
pub use image::{DataUrlError, InlineImage, strip_data_url_prefix};
pub use stage::Stage;
