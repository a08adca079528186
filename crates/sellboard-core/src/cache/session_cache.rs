//! In-memory session cache with TTL
//!
//! Holds the collections and derived stats of the logged-in seller so that
//! switching dashboard sections does not refetch everything.
//!
//! Lifecycle:
//! - `init(token, shop_id)` on login: starts a clean session
//! - `clear()` on logout: destroys it
//! - `invalidate()`: forces a cold cache but keeps token and shop
//!
//! Freshness:
//! - `Shared` (default): one `last_update` stamp for the whole cache; every
//!   `set` refreshes it, so writing one key extends the apparent freshness
//!   of all others
//! - `PerKey`: each entry is judged by its own write time
//!
//! Calls made without a session never fail: reads answer `None`/`false`
//! and writes are dropped.

use crate::models::{ResourceKey, Stats};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default time-to-live (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// How entry freshness is judged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// One timestamp for the whole cache
    #[default]
    Shared,
    /// One timestamp per entry
    PerKey,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub freshness: Freshness,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            freshness: Freshness::Shared,
        }
    }
}

/// Cached value for one resource key
#[derive(Debug, Clone)]
pub enum CachePayload {
    /// Raw records in upstream order
    Records(Arc<Vec<Value>>),
    /// Derived summary
    Stats(Arc<Stats>),
}

impl CachePayload {
    pub fn records(records: Vec<Value>) -> Self {
        CachePayload::Records(Arc::new(records))
    }

    pub fn stats(stats: Stats) -> Self {
        CachePayload::Stats(Arc::new(stats))
    }

    pub fn len(&self) -> usize {
        match self {
            CachePayload::Records(records) => records.len(),
            CachePayload::Stats(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: CachePayload,
    written_at: Instant,
}

#[derive(Debug)]
struct CacheSession {
    token: String,
    shop_id: Option<i64>,
    entries: HashMap<ResourceKey, CacheEntry>,
    last_update: Option<Instant>,
    last_update_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl CacheSession {
    fn new(token: String, shop_id: Option<i64>) -> Self {
        Self {
            token,
            shop_id,
            entries: HashMap::new(),
            last_update: None,
            last_update_at: None,
            created_at: Utc::now(),
        }
    }

    fn reset_entries(&mut self) {
        self.entries.clear();
        self.last_update = None;
        self.last_update_at = None;
    }
}

/// Summary of the cache state (for status output)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub initialized: bool,
    pub shop_id: Option<i64>,
    pub keys: Vec<ResourceKey>,
    pub total_records: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub session_started: Option<DateTime<Utc>>,
    pub valid: bool,
}

/// Session-scoped cache of seller data (thread-safe)
#[derive(Debug)]
pub struct SessionCache {
    config: CacheConfig,
    session: RwLock<Option<CacheSession>>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl SessionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    // ===================
    // Lifecycle
    // ===================

    /// Start a clean session, discarding any previous one and its entries
    pub fn init(&self, token: impl Into<String>, shop_id: Option<i64>) {
        let mut guard = self.session.write();
        let replaced = guard.is_some();
        *guard = Some(CacheSession::new(token.into(), shop_id));
        debug!(replaced, ?shop_id, "Session cache initialized");
    }

    /// Destroy the session (logout)
    pub fn clear(&self) {
        let mut guard = self.session.write();
        if guard.take().is_some() {
            debug!("Session cache cleared");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.read().is_some()
    }

    // ===================
    // Freshness
    // ===================

    /// Whether the cached data as a whole is still fresh
    pub fn is_valid(&self) -> bool {
        let guard = self.session.read();
        let Some(session) = guard.as_ref() else {
            return false;
        };

        match self.config.freshness {
            Freshness::Shared => self.is_fresh(session.last_update),
            Freshness::PerKey => {
                !session.entries.is_empty()
                    && session
                        .entries
                        .values()
                        .all(|entry| self.is_fresh(Some(entry.written_at)))
            }
        }
    }

    /// Whether `key` holds data that is still fresh
    pub fn is_key_valid(&self, key: ResourceKey) -> bool {
        let guard = self.session.read();
        let Some(session) = guard.as_ref() else {
            return false;
        };
        let Some(entry) = session.entries.get(&key) else {
            return false;
        };

        match self.config.freshness {
            Freshness::Shared => self.is_fresh(session.last_update),
            Freshness::PerKey => self.is_fresh(Some(entry.written_at)),
        }
    }

    fn is_fresh(&self, stamp: Option<Instant>) -> bool {
        stamp.is_some_and(|t| t.elapsed() < self.config.ttl)
    }

    /// Wall-clock time of the most recent write
    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        self.session.read().as_ref().and_then(|s| s.last_update_at)
    }

    // ===================
    // Entries
    // ===================

    pub fn has(&self, key: ResourceKey) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|s| s.entries.contains_key(&key))
    }

    pub fn get(&self, key: ResourceKey) -> Option<CachePayload> {
        self.session
            .read()
            .as_ref()
            .and_then(|s| s.entries.get(&key))
            .map(|entry| entry.payload.clone())
    }

    pub fn get_records(&self, key: ResourceKey) -> Option<Arc<Vec<Value>>> {
        match self.get(key)? {
            CachePayload::Records(records) => Some(records),
            CachePayload::Stats(_) => None,
        }
    }

    pub fn get_stats(&self) -> Option<Arc<Stats>> {
        match self.get(ResourceKey::Stats)? {
            CachePayload::Stats(stats) => Some(stats),
            CachePayload::Records(_) => None,
        }
    }

    /// Store `payload` under `key`; always refreshes the shared `last_update`
    pub fn set(&self, key: ResourceKey, payload: CachePayload) {
        let mut guard = self.session.write();
        let Some(session) = guard.as_mut() else {
            debug!(%key, "Cache not initialized, dropping write");
            return;
        };

        let now = Instant::now();
        debug!(%key, size = payload.len(), "Cache entry stored");
        session.entries.insert(
            key,
            CacheEntry {
                payload,
                written_at: now,
            },
        );
        session.last_update = Some(now);
        session.last_update_at = Some(Utc::now());
    }

    pub fn set_records(&self, key: ResourceKey, records: Vec<Value>) {
        self.set(key, CachePayload::records(records));
    }

    pub fn set_stats(&self, stats: Stats) {
        self.set(ResourceKey::Stats, CachePayload::stats(stats));
    }

    /// Keys currently holding data
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self
            .session
            .read()
            .as_ref()
            .map(|s| s.entries.keys().copied().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    // ===================
    // Invalidation
    // ===================

    /// Drop every entry and the freshness stamp; keep token and shop
    pub fn invalidate(&self) {
        let mut guard = self.session.write();
        if let Some(session) = guard.as_mut() {
            session.reset_entries();
            debug!("Session cache invalidated");
        }
    }

    /// Drop a single entry
    ///
    /// The shared stamp is left alone; when the last entry goes, the stamp
    /// goes with it.
    pub fn invalidate_key(&self, key: ResourceKey) {
        let mut guard = self.session.write();
        if let Some(session) = guard.as_mut() {
            if session.entries.remove(&key).is_some() {
                debug!(%key, "Cache entry invalidated");
            }
            if session.entries.is_empty() {
                session.last_update = None;
                session.last_update_at = None;
            }
        }
    }

    // ===================
    // Session identity
    // ===================

    pub fn update_shop_id(&self, shop_id: i64) {
        let mut guard = self.session.write();
        if let Some(session) = guard.as_mut() {
            session.shop_id = Some(shop_id);
        }
    }

    pub fn shop_id(&self) -> Option<i64> {
        self.session.read().as_ref().and_then(|s| s.shop_id)
    }

    pub fn token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.token.clone())
    }

    /// Snapshot of the cache state
    pub fn stats(&self) -> CacheStats {
        let valid = self.is_valid();
        let guard = self.session.read();
        match guard.as_ref() {
            Some(session) => {
                let mut keys: Vec<_> = session.entries.keys().copied().collect();
                keys.sort();
                CacheStats {
                    initialized: true,
                    shop_id: session.shop_id,
                    keys,
                    total_records: session
                        .entries
                        .values()
                        .map(|entry| match &entry.payload {
                            CachePayload::Records(records) => records.len(),
                            CachePayload::Stats(_) => 0,
                        })
                        .sum(),
                    last_update: session.last_update_at,
                    session_started: Some(session.created_at),
                    valid,
                }
            }
            None => CacheStats {
                initialized: false,
                shop_id: None,
                keys: Vec::new(),
                total_records: 0,
                last_update: None,
                session_started: None,
                valid: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn per_key_cache(ttl: Duration) -> SessionCache {
        SessionCache::new(CacheConfig {
            ttl,
            freshness: Freshness::PerKey,
        })
    }

    #[test]
    fn test_uninitialized_cache_is_inert() {
        let cache = SessionCache::default();

        assert!(!cache.is_initialized());
        assert!(!cache.is_valid());
        assert!(!cache.has(ResourceKey::Orders));
        assert!(cache.get(ResourceKey::Orders).is_none());
        assert!(cache.shop_id().is_none());
        assert!(cache.token().is_none());

        // Writes are dropped, not panics
        cache.set_records(ResourceKey::Orders, vec![json!({})]);
        cache.invalidate();
        cache.invalidate_key(ResourceKey::Orders);
        cache.update_shop_id(5);
        assert!(!cache.has(ResourceKey::Orders));
        assert!(cache.shop_id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_shared_stamp() {
        let cache = SessionCache::default();
        cache.init("token", Some(1));
        assert!(!cache.is_valid(), "fresh session has no data yet");

        cache.set_records(ResourceKey::Orders, vec![json!({"id": 1})]);
        assert!(cache.is_valid());

        tokio::time::advance(DEFAULT_TTL - Duration::from_millis(1)).await;
        assert!(cache.is_valid());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!cache.is_valid(), "expires exactly at last_update + ttl");
        assert!(!cache.is_key_valid(ResourceKey::Orders));
        // Expired data is still readable; freshness is the caller's decision
        assert!(cache.has(ResourceKey::Orders));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_stamp_extended_by_any_write() {
        let cache = SessionCache::default();
        cache.init("token", Some(1));

        cache.set_records(ResourceKey::Orders, vec![]);
        tokio::time::advance(Duration::from_secs(240)).await;
        cache.set_records(ResourceKey::Stocks, vec![]);
        tokio::time::advance(Duration::from_secs(120)).await;

        // Orders were written 6 minutes ago but share the stocks stamp
        assert!(cache.is_key_valid(ResourceKey::Orders));
        assert!(cache.is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_key_freshness() {
        let cache = per_key_cache(Duration::from_secs(300));
        cache.init("token", Some(1));

        cache.set_records(ResourceKey::Orders, vec![]);
        tokio::time::advance(Duration::from_secs(240)).await;
        cache.set_records(ResourceKey::Stocks, vec![]);
        tokio::time::advance(Duration::from_secs(120)).await;

        assert!(!cache.is_key_valid(ResourceKey::Orders));
        assert!(cache.is_key_valid(ResourceKey::Stocks));
        assert!(!cache.is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_key_expires_with_ttl() {
        for freshness in [Freshness::Shared, Freshness::PerKey] {
            let cache = SessionCache::new(CacheConfig {
                ttl: DEFAULT_TTL,
                freshness,
            });
            cache.init("token", Some(1));

            for key in ResourceKey::ALL.into_iter().filter(ResourceKey::is_collection) {
                cache.set_records(key, vec![json!({"key": key.as_str()})]);
            }
            cache.set(ResourceKey::Stats, CachePayload::stats(Stats::default()));
            assert!(cache.is_valid());
            assert!(ResourceKey::ALL.iter().all(|key| cache.is_key_valid(*key)));

            tokio::time::advance(DEFAULT_TTL).await;

            assert!(!cache.is_valid(), "{:?}", freshness);
            for key in ResourceKey::ALL {
                assert!(!cache.is_key_valid(key), "{} still fresh under {:?}", key, freshness);
                assert!(cache.has(key));
            }
        }
    }

    #[test]
    fn test_invalidate_keeps_identity() {
        let cache = SessionCache::default();
        cache.init("token-a", Some(7));
        for key in [ResourceKey::Orders, ResourceKey::FinanceOrders, ResourceKey::Stocks] {
            cache.set_records(key, vec![json!({"k": key.as_str()})]);
        }
        cache.set_stats(Stats::default());

        cache.invalidate();

        for key in ResourceKey::ALL {
            assert!(!cache.has(key), "{key} survived invalidate");
        }
        assert!(!cache.is_valid());
        assert!(cache.last_update_at().is_none());
        assert_eq!(cache.shop_id(), Some(7));
        assert_eq!(cache.token().as_deref(), Some("token-a"));
    }

    #[test]
    fn test_reinit_discards_entries() {
        let cache = SessionCache::default();
        cache.init("token-a", Some(1));
        cache.set_records(ResourceKey::Shops, vec![json!({"id": 1})]);

        cache.init("token-b", Some(1));

        assert!(!cache.has(ResourceKey::Shops));
        assert_eq!(cache.token().as_deref(), Some("token-b"));
    }

    #[test]
    fn test_invalidate_single_key() {
        let cache = SessionCache::default();
        cache.init("token", None);
        cache.set_records(ResourceKey::Orders, vec![]);
        cache.set_records(ResourceKey::Returns, vec![]);

        cache.invalidate_key(ResourceKey::Orders);
        assert!(!cache.has(ResourceKey::Orders));
        assert!(cache.has(ResourceKey::Returns));
        assert!(cache.is_valid());

        cache.invalidate_key(ResourceKey::Returns);
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_typed_getters() {
        let cache = SessionCache::default();
        cache.init("token", None);
        cache.set_records(ResourceKey::Orders, vec![json!({"id": 1}), json!({"id": 2})]);
        cache.set_stats(Stats {
            revenue: 10.0,
            ..Default::default()
        });

        assert_eq!(cache.get_records(ResourceKey::Orders).unwrap().len(), 2);
        assert_eq!(cache.get_stats().unwrap().revenue, 10.0);
        assert!(cache.get_records(ResourceKey::Stats).is_none());
        assert_eq!(cache.keys(), vec![ResourceKey::Orders, ResourceKey::Stats]);
    }

    #[test]
    fn test_clear_destroys_session() {
        let cache = SessionCache::default();
        cache.init("token", Some(3));
        cache.set_records(ResourceKey::Orders, vec![]);

        cache.clear();

        assert!(!cache.is_initialized());
        assert!(cache.token().is_none());
        assert!(!cache.stats().initialized);
    }

    #[test]
    fn test_update_shop_id() {
        let cache = SessionCache::default();
        cache.init("token", None);
        cache.update_shop_id(99);
        assert_eq!(cache.shop_id(), Some(99));
        assert_eq!(cache.stats().shop_id, Some(99));
    }
}
