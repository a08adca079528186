//! Data store: cache lookup, collection and aggregation in one place
//!
//! Flow for every read: session cache, then on miss or expiry the paginated
//! collector, proxy gateway, aggregation and back into the cache.
//!
//! Refreshes are serialized by an async mutex so the cache has exactly one
//! writer at a time even when the front end fires overlapping requests.

use crate::aggregation::{
    compute_stats, decode_records, filter_expenses, filter_orders, financial_summary, DateRange,
    FinancialSummary, StatsInputs,
};
use crate::cache::{CacheConfig, CachePayload, SessionCache};
use crate::collector::{CollectQuery, CollectorConfig, PaginatedCollector, ResourceSpec};
use crate::error::{CoreError, DegradedState, RefreshReport};
use crate::event::{DataEvent, EventBus};
use crate::gateway::ProxyGateway;
use crate::models::{RawExpense, RawOrder, ResourceKey, Stats, StockRecord};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Collections a stats refresh is computed from
const STATS_SOURCES: [ResourceKey; 4] = [
    ResourceKey::Products,
    ResourceKey::Orders,
    ResourceKey::FinanceOrders,
    ResourceKey::Stocks,
];

/// Configuration for the data store
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub collector: CollectorConfig,
    pub cache: CacheConfig,
}

/// Central data store for sellboard
pub struct DataStore<G> {
    collector: PaginatedCollector<G>,

    cache: SessionCache,

    event_bus: EventBus,

    /// Held for the duration of any fetch that writes to the cache
    refresh_lock: Mutex<()>,

    /// Last successfully computed stats; survives failed refreshes and
    /// cache invalidation
    last_stats: RwLock<Option<Arc<Stats>>>,

    degraded_state: RwLock<DegradedState>,
}

impl<G: ProxyGateway> DataStore<G> {
    pub fn new(gateway: G, config: StoreConfig) -> Self {
        Self {
            collector: PaginatedCollector::new(gateway, config.collector),
            cache: SessionCache::new(config.cache),
            event_bus: EventBus::default(),
            refresh_lock: Mutex::new(()),
            last_stats: RwLock::new(None),
            degraded_state: RwLock::new(DegradedState::Empty),
        }
    }

    pub fn with_defaults(gateway: G) -> Self {
        Self::new(gateway, StoreConfig::default())
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn collector(&self) -> &PaginatedCollector<G> {
        &self.collector
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn degraded_state(&self) -> DegradedState {
        self.degraded_state.read().clone()
    }

    /// Most recent stats: the cached snapshot, else the last good one
    pub fn stats(&self) -> Option<Arc<Stats>> {
        self.cache
            .get_stats()
            .or_else(|| self.last_stats.read().clone())
    }

    // ===================
    // Session lifecycle
    // ===================

    /// Start a session; any data from a previous session is dropped
    pub fn login(&self, token: impl Into<String>, shop_id: Option<i64>) {
        self.cache.init(token, shop_id);
        *self.last_stats.write() = None;
        *self.degraded_state.write() = DegradedState::Empty;
        self.event_bus.publish(DataEvent::SessionStarted);
        info!(?shop_id, "Session started");
    }

    pub fn logout(&self) {
        self.cache.clear();
        *self.last_stats.write() = None;
        *self.degraded_state.write() = DegradedState::Empty;
        self.event_bus.publish(DataEvent::SessionCleared);
        info!("Session cleared");
    }

    /// Select another shop; cached data belongs to the old one
    pub fn switch_shop(&self, shop_id: i64) -> Result<(), CoreError> {
        if !self.cache.is_initialized() {
            return Err(CoreError::NotInitialized);
        }
        self.cache.update_shop_id(shop_id);
        self.cache.invalidate();
        *self.last_stats.write() = None;
        *self.degraded_state.write() = DegradedState::Empty;
        self.event_bus.publish(DataEvent::CacheInvalidated);
        info!(shop_id, "Switched shop");
        Ok(())
    }

    /// Force the next reads to refetch
    pub fn invalidate(&self) {
        self.cache.invalidate();
        self.event_bus.publish(DataEvent::CacheInvalidated);
    }

    fn session_query(&self) -> Result<CollectQuery, CoreError> {
        let token = self.cache.token().ok_or(CoreError::NotInitialized)?;
        Ok(CollectQuery::new(token, self.cache.shop_id()))
    }

    // ===================
    // Resources
    // ===================

    /// Records for `key`, served from cache while fresh
    pub async fn resource(&self, key: ResourceKey) -> Result<Arc<Vec<Value>>, CoreError> {
        let _guard = self.refresh_lock.lock().await;
        let mut report = RefreshReport::new();
        self.load(key, false, &mut report).await
    }

    /// Fetch `key` from upstream regardless of cache state
    pub async fn refetch(&self, key: ResourceKey) -> Result<Arc<Vec<Value>>, CoreError> {
        let _guard = self.refresh_lock.lock().await;
        let mut report = RefreshReport::new();
        self.load(key, true, &mut report).await
    }

    /// Fetch `key` narrowed by extra query parameters (status, date range)
    ///
    /// Filtered results are partial views of the collection and never enter
    /// the cache.
    pub async fn collect_filtered(
        &self,
        key: ResourceKey,
        params: &[(String, String)],
    ) -> Result<Vec<Value>, CoreError> {
        let spec = fetchable(key)?;
        let query = params
            .iter()
            .fold(self.session_query()?, |query, (name, value)| {
                query.with_param(name.as_str(), value)
            });

        let collection = self.collector.collect(&spec, &query).await?;
        debug!(%key, filters = params.len(), records = collection.len(), "Filtered collection");
        Ok(collection.records)
    }

    /// Caller must hold `refresh_lock`
    async fn load(
        &self,
        key: ResourceKey,
        force: bool,
        report: &mut RefreshReport,
    ) -> Result<Arc<Vec<Value>>, CoreError> {
        let query = self.session_query()?;

        if !force && self.cache.is_key_valid(key) {
            if let Some(records) = self.cache.get_records(key) {
                debug!(%key, records = records.len(), "Cache hit");
                return Ok(records);
            }
        }

        let collection = self.collector.collect(&fetchable(key)?, &query).await?;

        if collection.truncated {
            report.add_warning(
                key.as_str(),
                format!(
                    "Collection stopped early after {} pages; data may be incomplete",
                    collection.pages_fetched
                ),
            );
        }
        report.resources_fetched += 1;
        report.records_fetched += collection.len();

        let records = Arc::new(collection.records);
        self.cache
            .set(key, CachePayload::Records(Arc::clone(&records)));
        self.event_bus.resource_updated(key);

        Ok(records)
    }

    /// Which of `keys` must be refetched, decided before any of them is
    /// loaded: a write in the middle of a batch refreshes the shared stamp
    /// and would make the remaining expired keys look fresh.
    fn stale_snapshot<const N: usize>(&self, keys: [ResourceKey; N], force: bool) -> [bool; N] {
        keys.map(|key| force || !self.cache.is_key_valid(key))
    }

    // ===================
    // Aggregates
    // ===================

    /// Recompute dashboard stats
    ///
    /// Without `force`, a valid cache answers directly. On failure the
    /// previous stats stay available through [`DataStore::stats`] and the
    /// store reports [`DegradedState::Stale`].
    pub async fn refresh_stats(&self, force: bool) -> Result<(Arc<Stats>, RefreshReport), CoreError> {
        let _guard = self.refresh_lock.lock().await;
        let mut report = RefreshReport::new();

        if !force && self.cache.is_valid() {
            if let Some(stats) = self.cache.get_stats() {
                debug!("Stats served from cache");
                report.served_from_cache = true;
                return Ok((stats, report));
            }
        }

        match self.compute_fresh_stats(force, &mut report).await {
            Ok(stats) => {
                let stats = Arc::new(stats);
                self.cache
                    .set(ResourceKey::Stats, CachePayload::Stats(Arc::clone(&stats)));
                *self.last_stats.write() = Some(Arc::clone(&stats));
                *self.degraded_state.write() = DegradedState::Healthy;
                self.event_bus.publish(DataEvent::StatsUpdated);

                info!(
                    resources = report.resources_fetched,
                    records = report.records_fetched,
                    revenue = stats.revenue,
                    "Stats refreshed"
                );
                Ok((stats, report))
            }
            Err(e) => {
                warn!(error = %e, "Stats refresh failed, keeping previous data");
                // Partial writes bumped the stamp; old stats and sources must
                // not pass as fresh on the next refresh
                self.cache.invalidate_key(ResourceKey::Stats);
                for key in STATS_SOURCES {
                    self.cache.invalidate_key(key);
                }
                let reason = e.to_string();
                {
                    let mut state = self.degraded_state.write();
                    *state = if self.last_stats.read().is_some() {
                        DegradedState::Stale {
                            reason: reason.clone(),
                        }
                    } else {
                        DegradedState::Empty
                    };
                }
                self.event_bus.publish(DataEvent::RefreshFailed(reason));
                Err(e)
            }
        }
    }

    async fn compute_fresh_stats(
        &self,
        force: bool,
        report: &mut RefreshReport,
    ) -> Result<Stats, CoreError> {
        let [products_stale, orders_stale, finance_stale, stocks_stale] =
            self.stale_snapshot(STATS_SOURCES, force);

        let products = self.load(ResourceKey::Products, products_stale, report).await?;
        let orders = self.load(ResourceKey::Orders, orders_stale, report).await?;
        let finance_orders = self.load(ResourceKey::FinanceOrders, finance_stale, report).await?;
        let stocks = self.load(ResourceKey::Stocks, stocks_stale, report).await?;

        let orders: Vec<RawOrder> = decode_records(&orders);
        let finance_orders: Vec<RawOrder> = decode_records(&finance_orders);
        let stocks: Vec<StockRecord> = decode_records(&stocks);

        Ok(compute_stats(StatsInputs {
            products: &products,
            orders: &orders,
            finance_orders: &finance_orders,
            stocks: &stocks,
        }))
    }

    /// Revenue, profit and expenses for `range`
    pub async fn financial_summary(&self, range: DateRange) -> Result<FinancialSummary, CoreError> {
        let _guard = self.refresh_lock.lock().await;
        let mut report = RefreshReport::new();

        let [orders_stale, expenses_stale] = self.stale_snapshot(
            [ResourceKey::FinanceOrders, ResourceKey::FinanceExpenses],
            false,
        );

        let orders = self.load(ResourceKey::FinanceOrders, orders_stale, &mut report).await?;
        let expenses = self.load(ResourceKey::FinanceExpenses, expenses_stale, &mut report).await?;

        let orders: Vec<RawOrder> = decode_records(&orders);
        let expenses: Vec<RawExpense> = decode_records(&expenses);

        let summary = financial_summary(
            filter_orders(&orders, &range),
            filter_expenses(&expenses, &range),
        );

        debug!(
            range = %range.display(),
            revenue = summary.orders.revenue,
            expenses = summary.expenses.total,
            "Financial summary computed"
        );

        Ok(summary)
    }
}

fn fetchable(key: ResourceKey) -> Result<ResourceSpec, CoreError> {
    ResourceSpec::for_key(key).ok_or_else(|| CoreError::InvalidConfig {
        message: format!("{} is derived and cannot be fetched", key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RetryPolicy;
    use crate::gateway::{GatewayResponse, RequestEnvelope};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use parking_lot::Mutex as SyncMutex;
    use std::time::Duration;

    /// Answers by path prefix; requests under `fail_on` get a transport error
    struct RoutedGateway {
        routes: SyncMutex<Vec<(&'static str, Value)>>,
        paths: SyncMutex<Vec<String>>,
        fail_on: SyncMutex<Option<&'static str>>,
    }

    impl RoutedGateway {
        fn dashboard() -> Self {
            Self {
                routes: SyncMutex::new(vec![
                    (
                        "/v1/product/shop/",
                        json!({"productList": [{"id": 1}, {"id": 2}, {"id": 3}]}),
                    ),
                    (
                        "/v2/fbs/orders",
                        json!({"payload": {"orders": [
                            {"id": 1, "status": "CREATED"},
                            {"id": 2, "status": "DELIVERING"},
                            {"id": 3, "status": "CANCELED"}
                        ]}}),
                    ),
                    (
                        "/v1/finance/orders",
                        json!({"orderItems": [
                            {"id": 10, "date": 1_700_000_000_000i64, "sellPrice": 1000, "sellerProfit": 800, "amount": 2, "status": "PROCESSING"},
                            {"id": 11, "date": 1_700_000_000_000i64, "sellPrice": 500, "sellerProfit": 400, "amount": 1, "status": "CANCELED"}
                        ]}),
                    ),
                    (
                        "/v1/finance/expenses",
                        json!({"payload": {"payments": [
                            {"id": 1, "dateCreated": 1_700_000_000_000i64, "paymentPrice": 150, "amount": 2, "source": "FBS"}
                        ]}}),
                    ),
                    (
                        "/v2/fbs/sku/stocks",
                        json!({"payload": {"skuAmountList": [
                            {"skuId": 1, "amount": 5, "fulfillmentType": "FBS"},
                            {"skuId": 2, "amount": 3, "fulfillmentType": "FBO"}
                        ]}}),
                    ),
                ]),
                paths: SyncMutex::new(Vec::new()),
                fail_on: SyncMutex::new(None),
            }
        }

        fn request_count(&self) -> usize {
            self.paths.lock().len()
        }

        fn calls_to(&self, prefix: &str) -> usize {
            self.paths.lock().iter().filter(|p| p.starts_with(prefix)).count()
        }

        fn set_route(&self, prefix: &'static str, body: Value) {
            let mut routes = self.routes.lock();
            if let Some(route) = routes.iter_mut().find(|(p, _)| *p == prefix) {
                route.1 = body;
            }
        }

        fn fail_on(&self, prefix: Option<&'static str>) {
            *self.fail_on.lock() = prefix;
        }
    }

    #[async_trait]
    impl ProxyGateway for RoutedGateway {
        async fn forward(&self, envelope: RequestEnvelope) -> Result<GatewayResponse, CoreError> {
            self.paths.lock().push(envelope.path.clone());

            let failing = (*self.fail_on.lock()).is_some_and(|p| envelope.path.starts_with(p));
            if failing {
                return Err(CoreError::Transport {
                    path: envelope.path,
                    message: "connection refused".to_string(),
                });
            }

            let body = self
                .routes
                .lock()
                .iter()
                .find(|(prefix, _)| envelope.path.starts_with(prefix))
                .map(|(_, body)| body.clone())
                .unwrap_or_else(|| json!([]));
            Ok(GatewayResponse::new(200, body))
        }
    }

    fn store() -> DataStore<Arc<RoutedGateway>> {
        let config = StoreConfig {
            collector: CollectorConfig {
                request_delay: Duration::ZERO,
                retry: RetryPolicy::none(),
                ..CollectorConfig::default()
            },
            cache: CacheConfig::default(),
        };
        DataStore::new(Arc::new(RoutedGateway::dashboard()), config)
    }

    #[tokio::test]
    async fn test_refresh_stats_computes_dashboard() {
        let store = store();
        store.login("Bearer abc", Some(7));

        let (stats, report) = store.refresh_stats(false).await.unwrap();

        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.active_orders, 2);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.revenue, 2000.0);
        assert_eq!(stats.profit, 1600.0);
        assert_eq!(stats.to_pay, 1600.0);
        assert_eq!(stats.fbs_stock, 5);
        assert_eq!(stats.fbo_stock, 3);
        assert_eq!(report.resources_fetched, 4);
        assert!(!report.served_from_cache);
        assert!(store.degraded_state().is_healthy());
    }

    #[tokio::test]
    async fn test_second_refresh_served_from_cache() {
        let store = store();
        store.login("Bearer abc", Some(7));

        store.refresh_stats(false).await.unwrap();
        let requests = store.collector().gateway().request_count();

        let (_, report) = store.refresh_stats(false).await.unwrap();

        assert!(report.served_from_cache);
        assert_eq!(store.collector().gateway().request_count(), requests);
    }

    #[tokio::test]
    async fn test_resource_cache_hit_skips_gateway() {
        let store = store();
        store.login("Bearer abc", Some(7));

        let first = store.resource(ResourceKey::Orders).await.unwrap();
        let second = store.resource(ResourceKey::Orders).await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.collector().gateway().request_count(), 1);

        store.refetch(ResourceKey::Orders).await.unwrap();
        assert_eq!(store.collector().gateway().request_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_stats() {
        let store = store();
        store.login("Bearer abc", Some(7));
        let (good, _) = store.refresh_stats(false).await.unwrap();

        store.collector().gateway().fail_on(Some("/"));
        let mut events = store.event_bus().subscribe();

        let err = store.refresh_stats(true).await.unwrap_err();

        assert!(matches!(err, CoreError::Transport { .. }));
        assert!(matches!(store.degraded_state(), DegradedState::Stale { .. }));
        assert_eq!(store.stats().unwrap().revenue, good.revenue);
        assert!(matches!(events.next().await, Some(DataEvent::RefreshFailed(_))));
    }

    #[tokio::test]
    async fn test_failed_first_refresh_is_empty() {
        let store = store();
        store.login("Bearer abc", Some(7));
        store.collector().gateway().fail_on(Some("/"));

        assert!(store.refresh_stats(false).await.is_err());
        assert_eq!(store.degraded_state(), DegradedState::Empty);
        assert!(store.stats().is_none());
    }

    #[tokio::test]
    async fn test_requires_session() {
        let store = store();

        let err = store.resource(ResourceKey::Shops).await.unwrap_err();
        assert!(matches!(err, CoreError::NotInitialized));
        assert!(matches!(store.switch_shop(1), Err(CoreError::NotInitialized)));
        assert_eq!(store.collector().gateway().request_count(), 0);
    }

    #[tokio::test]
    async fn test_switch_shop_refetches_for_new_shop() {
        let store = store();
        store.login("Bearer abc", Some(7));
        store.refresh_stats(false).await.unwrap();

        store.switch_shop(9).unwrap();
        assert!(store.stats().is_none());

        let (_, report) = store.refresh_stats(false).await.unwrap();

        assert!(!report.served_from_cache);
        let paths = store.collector().gateway().paths.lock().clone();
        assert!(paths.iter().any(|p| p.starts_with("/v1/product/shop/9")));
        assert!(paths.iter().any(|p| p.contains("shopIds=9")));
    }

    #[tokio::test]
    async fn test_financial_summary_for_range() {
        let store = store();
        store.login("Bearer abc", Some(7));

        let range = DateRange::new(
            Utc.timestamp_millis_opt(1_699_000_000_000).unwrap(),
            Utc.timestamp_millis_opt(1_701_000_000_000).unwrap(),
        );
        let summary = store.financial_summary(range).await.unwrap();

        assert_eq!(summary.orders.revenue, 2000.0);
        assert_eq!(summary.expenses.total, 300.0);
        assert_eq!(summary.net_profit, 1700.0);

        let empty = DateRange::new(
            Utc.timestamp_millis_opt(0).unwrap(),
            Utc.timestamp_millis_opt(1_000).unwrap(),
        );
        let summary = store.financial_summary(empty).await.unwrap();
        assert_eq!(summary.orders.included_orders, 0);
    }

    fn finance_body(sell_price: u64) -> Value {
        json!({"orderItems": [
            {"id": 10, "date": 1_700_000_000_000i64, "sellPrice": sell_price, "sellerProfit": 1, "amount": 1, "status": "DELIVERED"}
        ]})
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_refetches_every_source() {
        let store = store();
        store.login("Bearer abc", Some(7));
        let gateway = Arc::clone(store.collector().gateway());
        gateway.set_route("/v1/finance/orders", finance_body(100));

        let (before, _) = store.refresh_stats(false).await.unwrap();
        assert_eq!(before.revenue, 100.0);

        gateway.set_route("/v1/finance/orders", finance_body(999));
        tokio::time::advance(Duration::from_secs(600)).await;

        let (after, report) = store.refresh_stats(false).await.unwrap();

        assert!(!report.served_from_cache);
        assert_eq!(report.resources_fetched, 4);
        assert_eq!(after.revenue, 999.0);
        for prefix in ["/v1/product/shop/", "/v2/fbs/orders", "/v1/finance/orders", "/v2/fbs/sku/stocks"] {
            assert_eq!(gateway.calls_to(prefix), 2, "{prefix} not refetched");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_finance_refetched_for_summary() {
        let store = store();
        store.login("Bearer abc", Some(7));
        let gateway = Arc::clone(store.collector().gateway());
        let range = DateRange::new(
            Utc.timestamp_millis_opt(1_699_000_000_000).unwrap(),
            Utc.timestamp_millis_opt(1_701_000_000_000).unwrap(),
        );

        store.financial_summary(range).await.unwrap();
        gateway.set_route("/v1/finance/orders", finance_body(999));
        tokio::time::advance(Duration::from_secs(301)).await;

        let summary = store.financial_summary(range).await.unwrap();

        assert_eq!(summary.orders.revenue, 999.0);
        assert_eq!(gateway.calls_to("/v1/finance/orders"), 2);
        assert_eq!(gateway.calls_to("/v1/finance/expenses"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_does_not_leave_stats_fresh() {
        let store = store();
        store.login("Bearer abc", Some(7));
        let gateway = Arc::clone(store.collector().gateway());
        store.refresh_stats(false).await.unwrap();

        tokio::time::advance(Duration::from_secs(290)).await;
        // Products succeed, orders fail
        gateway.fail_on(Some("/v2/fbs/orders"));
        assert!(store.refresh_stats(true).await.is_err());

        tokio::time::advance(Duration::from_secs(200)).await;
        gateway.fail_on(None);

        assert!(!store.cache().has(ResourceKey::Stats));
        assert!(store.stats().is_some(), "last good stats stay readable");

        let (_, report) = store.refresh_stats(false).await.unwrap();
        assert!(!report.served_from_cache);
        assert_eq!(report.resources_fetched, 4);
        assert!(store.degraded_state().is_healthy());
    }

    #[tokio::test]
    async fn test_collect_filtered_bypasses_cache() {
        let store = store();
        store.login("Bearer abc", Some(7));
        let gateway = Arc::clone(store.collector().gateway());
        store.resource(ResourceKey::Orders).await.unwrap();

        let params = vec![("status".to_string(), "CREATED".to_string())];
        let records = store
            .collect_filtered(ResourceKey::Orders, &params)
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(gateway.request_count(), 2);
        let filtered = gateway.paths.lock()[1].clone();
        assert!(filtered.contains("status=CREATED"), "{}", filtered);
        assert!(filtered.contains("page=0"));

        // Cached unfiltered collection is untouched
        let cached = store.cache().get_records(ResourceKey::Orders).unwrap();
        assert_eq!(cached.len(), 3);
        store.resource(ResourceKey::Orders).await.unwrap();
        assert_eq!(gateway.request_count(), 2);
    }

    #[tokio::test]
    async fn test_collect_filtered_rejects_derived_key() {
        let store = store();
        store.login("Bearer abc", Some(7));
        let err = store
            .collect_filtered(ResourceKey::Stats, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }
}
