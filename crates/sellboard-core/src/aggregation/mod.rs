//! Aggregation engine
//!
//! Turns complete collections of raw records into dashboard figures:
//! summary `Stats`, order totals, expense breakdowns and date-ranged views.

use crate::models::{Fulfillment, RawOrder, Stats, StockRecord};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub mod expenses;
pub mod orders;
pub mod period;


pub use expenses::{financial_summary, group_expenses, ExpenseBreakdown, FinancialSummary};
pub use orders::{
    classify, daily_revenue, is_payout_pending, is_pending, status_breakdown, summarize_orders,
    OrderTotals, StatusBreakdown, StatusClass,
};
pub use period::{filter_expenses, filter_orders, DateRange};

/// Decode raw records, skipping the ones that do not fit `T`
pub fn decode_records<T: DeserializeOwned>(records: &[Value]) -> Vec<T> {
    let mut skipped = 0usize;
    let decoded: Vec<T> = records
        .iter()
        .filter_map(|record| match T::deserialize(record) {
            Ok(value) => Some(value),
            Err(e) => {
                skipped += 1;
                debug!(error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!(
            skipped,
            decoded = decoded.len(),
            record_type = std::any::type_name::<T>(),
            "Some records could not be decoded"
        );
    }

    decoded
}

/// Collections a stats refresh is computed from
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsInputs<'a> {
    /// Product records; only their count matters
    pub products: &'a [Value],
    /// FBS orders (operational statuses)
    pub orders: &'a [RawOrder],
    /// Finance orders (money)
    pub finance_orders: &'a [RawOrder],
    pub stocks: &'a [StockRecord],
}

/// Compute a complete `Stats` snapshot
pub fn compute_stats(inputs: StatsInputs<'_>) -> Stats {
    let totals = summarize_orders(inputs.finance_orders);
    let breakdown = status_breakdown(inputs.orders);
    let pending_orders = inputs.orders.iter().filter(|o| is_pending(o)).count() as u64;

    let to_pay = inputs
        .finance_orders
        .iter()
        .filter(|o| is_payout_pending(o))
        .map(|o| o.seller_profit * o.quantity())
        .sum();

    let mut stats = Stats {
        total_products: inputs.products.len() as u64,
        active_orders: breakdown.active,
        pending_orders,
        revenue: totals.revenue,
        to_pay,
        profit: totals.profit,
        ..Default::default()
    };

    for stock in inputs.stocks {
        let bucket = match stock.fulfillment() {
            Some(Fulfillment::Fbo) => &mut stats.fbo_stock,
            Some(Fulfillment::Fbs) => &mut stats.fbs_stock,
            Some(Fulfillment::Dbs) => &mut stats.dbs_stock,
            None => {
                debug!(sku = ?stock.sku_id, "Stock line without fulfillment type ignored");
                continue;
            }
        };
        // Lenient decoding clamps huge amounts to u64::MAX
        *bucket = bucket.saturating_add(stock.amount);
    }

    if breakdown.unrecognized > 0 {
        debug!(count = breakdown.unrecognized, "Orders with unrecognized status");
    }

    stats
}
