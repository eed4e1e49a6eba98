//! Capability traits
//!
//! Each API area is its own object-safe trait; [`Client`] bundles them so a
//! decorator such as the response cache can stand in for the HTTP client.

mod chat;
mod embedding;
mod model_listing;

pub use chat::ChatCapability;
pub use embedding::EmbeddingCapability;
pub use model_listing::ModelListingCapability;

/// Everything a La Plateforme client can do.
pub trait Client: ChatCapability + EmbeddingCapability + ModelListingCapability {}

impl<T> Client for T where T: ChatCapability + EmbeddingCapability + ModelListingCapability {}
