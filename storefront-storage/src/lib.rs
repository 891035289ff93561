//! Storefront Storage - Origin Trait and Cache Layer
//!
//! Defines the origin store abstraction ([`CatalogRepository`]) with an
//! in-memory implementation, and the tag-invalidated cache-aside layer
//! that sits in front of it.

pub mod cache;
pub mod in_memory;
pub mod repository;

pub use in_memory::InMemoryCatalog;
pub use repository::CatalogRepository;

// Re-export cache types for API integration
pub use cache::{
    CacheError, CacheKey, CacheLayer, CachePolicy, CacheRead, CacheResult, CacheStats,
    CacheStore, FilterSet, InMemoryCacheStore, InvalidationCoordinator, InvalidationReport,
    KeyComposer, MutationKind, ReadThroughCache, Selector, Tag, TagIndex, TtlPolicy,
};

#[cfg(feature = "redis")]
pub use cache::{RedisCacheStore, RedisConfig};
