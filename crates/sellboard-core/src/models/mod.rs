//! Data models for sellboard

pub mod expense;
pub mod order;
pub mod resource;
pub mod serde_utils;
pub mod stats;
pub mod stock;

pub use expense::{RawExpense, UNKNOWN_BUCKET};
pub use order::{RawOrder, CANCELED_STATUS};
pub use resource::ResourceKey;
pub use stats::Stats;
pub use stock::{Fulfillment, StockRecord};
