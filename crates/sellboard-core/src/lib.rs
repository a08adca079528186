//! sellboard-core - Core library for sellboard
//!
//! Provides the session cache, the paginated collector behind the proxy
//! gateway, and the aggregation engine for marketplace seller dashboards.

pub mod aggregation;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod models;
pub mod store;

pub use cache::{CacheConfig, Freshness, SessionCache};
pub use collector::{CollectQuery, Collection, CollectorConfig, PaginatedCollector, ResourceSpec};
pub use config::SellboardConfig;
pub use error::{CoreError, DegradedState, RefreshReport};
pub use event::{DataEvent, EventBus};
pub use gateway::{BodyPolicy, HttpGateway, ProxyGateway, RequestEnvelope};
pub use store::{DataStore, StoreConfig};
