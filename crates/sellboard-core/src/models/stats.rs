//! Dashboard summary statistics
//!
//! A `Stats` value is produced whole by each refresh and replaced, never
//! patched field by field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_products: u64,
    /// FBS orders in an active (not yet completed) status
    pub active_orders: u64,
    /// FBS orders waiting to be handed over for delivery
    pub pending_orders: u64,
    /// Sum of sellPrice * amount over non-cancelled finance orders
    pub revenue: f64,
    /// Seller profit not yet paid out
    pub to_pay: f64,
    /// Sum of sellerProfit * amount over non-cancelled finance orders
    pub profit: f64,
    pub fbo_stock: u64,
    pub fbs_stock: u64,
    pub dbs_stock: u64,
}

impl Stats {
    pub fn total_stock(&self) -> u64 {
        self.fbo_stock
            .saturating_add(self.fbs_stock)
            .saturating_add(self.dbs_stock)
    }

    /// Profit share of revenue (0.0 when there is no revenue)
    pub fn margin(&self) -> f64 {
        if self.revenue > 0.0 {
            self.profit / self.revenue
        } else {
            0.0
        }
    }
}
