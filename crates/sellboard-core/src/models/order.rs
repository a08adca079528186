//! Order records from the FBS and finance endpoints

use super::serde_utils::{
    deserialize_f64, deserialize_flag, deserialize_opt_string, deserialize_timestamp,
    deserialize_u64,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream status that excludes an order from revenue and profit
pub const CANCELED_STATUS: &str = "CANCELED";

/// Raw order as returned by the seller API
///
/// Both `/v2/fbs/orders` and `/v1/finance/orders` items decode into this
/// shape; fields one endpoint does not send stay at their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,

    /// Order timestamp (the finance endpoint calls it `date`)
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_f64")]
    pub sell_price: f64,

    #[serde(default, deserialize_with = "deserialize_f64")]
    pub seller_profit: f64,

    #[serde(default, deserialize_with = "deserialize_f64")]
    pub commission: f64,

    #[serde(default, deserialize_with = "deserialize_f64")]
    pub logistic_delivery_fee: f64,

    /// Quantity of units in this line
    #[serde(default, deserialize_with = "deserialize_u64")]
    pub amount: u64,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub cancelled: bool,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub product_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub sku_title: Option<String>,
}

impl RawOrder {
    /// Upstream status, or "" when absent
    pub fn status_str(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    /// Counts toward revenue and profit
    pub fn is_included(&self) -> bool {
        self.status_str() != CANCELED_STATUS && !self.cancelled
    }

    pub fn quantity(&self) -> f64 {
        self.amount as f64
    }
}
