//! Caching layer for sellboard-core
//!
//! Provides the in-memory session cache that keeps dashboard data fresh
//! for a bounded time between refreshes.

pub mod session_cache;

pub use session_cache::{CacheConfig, CachePayload, CacheStats, Freshness, SessionCache, DEFAULT_TTL};
