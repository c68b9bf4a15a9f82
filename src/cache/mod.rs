//! Optional Redis cache for retrieval results.

mod macros;
mod redis;

pub use self::redis::{connect, Cache, CacheKey, CacheWriterHandle};
