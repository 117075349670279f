//! Admin API access: the HTTP client, its response types and the cached wrapper.

pub mod cached_client;
pub mod client;
pub mod resources;
pub mod types;

pub use cached_client::CachedAdminClient;
pub use client::{AdminClient, ApiError};
pub use resources::ResourceKey;
