//! Folio texture cache
//!
//! Capacity-bounded store of rasterized page textures keyed by
//! (page index, scale), with LRU eviction and in-use protection.

mod store;
mod texture;

pub use store::{CacheKey, CacheStats, EntryInfo, TextureCache, TextureLease};
pub use texture::GpuTexture;
