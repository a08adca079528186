//! Order totals, status classification and daily revenue

use crate::models::RawOrder;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub const ACTIVE_STATUSES: [&str; 5] = [
    "CREATED",
    "PACKING",
    "PENDING_DELIVERY",
    "DELIVERING",
    "ACCEPTED_AT_DP",
];

pub const COMPLETED_STATUSES: [&str; 3] = [
    "DELIVERED",
    "DELIVERED_TO_CUSTOMER_DELIVERY_POINT",
    "COMPLETED",
];

pub const CANCELLED_STATUSES: [&str; 2] = ["CANCELED", "RETURNED"];

/// Active orders not yet handed over for delivery
pub const PENDING_STATUSES: [&str; 3] = ["CREATED", "PACKING", "PENDING_DELIVERY"];

/// Finance order statuses whose seller profit has not been paid out yet
pub const PAYOUT_PENDING_STATUSES: [&str; 2] = ["PROCESSING", "TO_WITHDRAW"];

/// Lifecycle bucket of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusClass {
    Active,
    Completed,
    Cancelled,
    /// Status outside the known sets; counted nowhere else
    Unrecognized,
}

/// Classify an order; the explicit cancelled flag wins over the status
pub fn classify(order: &RawOrder) -> StatusClass {
    if order.cancelled {
        return StatusClass::Cancelled;
    }

    let status = order.status_str();
    if ACTIVE_STATUSES.contains(&status) {
        StatusClass::Active
    } else if COMPLETED_STATUSES.contains(&status) {
        StatusClass::Completed
    } else if CANCELLED_STATUSES.contains(&status) {
        StatusClass::Cancelled
    } else {
        StatusClass::Unrecognized
    }
}

pub fn is_pending(order: &RawOrder) -> bool {
    !order.cancelled && PENDING_STATUSES.contains(&order.status_str())
}

pub fn is_payout_pending(order: &RawOrder) -> bool {
    order.is_included() && PAYOUT_PENDING_STATUSES.contains(&order.status_str())
}

/// Order counts per lifecycle bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub active: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub unrecognized: u64,
}

impl StatusBreakdown {
    pub fn total(&self) -> u64 {
        self.active + self.completed + self.cancelled + self.unrecognized
    }
}

pub fn status_breakdown<'a, I>(orders: I) -> StatusBreakdown
where
    I: IntoIterator<Item = &'a RawOrder>,
{
    let mut breakdown = StatusBreakdown::default();
    for order in orders {
        match classify(order) {
            StatusClass::Active => breakdown.active += 1,
            StatusClass::Completed => breakdown.completed += 1,
            StatusClass::Cancelled => breakdown.cancelled += 1,
            StatusClass::Unrecognized => breakdown.unrecognized += 1,
        }
    }
    breakdown
}

/// Monetary totals over non-cancelled orders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub revenue: f64,
    pub profit: f64,
    pub commission: f64,
    pub logistics: f64,
    pub included_orders: u64,
    pub items_sold: u64,
}

/// Sum of field * amount over orders with `status != CANCELED && !cancelled`
pub fn summarize_orders<'a, I>(orders: I) -> OrderTotals
where
    I: IntoIterator<Item = &'a RawOrder>,
{
    let mut totals = OrderTotals::default();

    for order in orders.into_iter().filter(|o| o.is_included()) {
        let qty = order.quantity();
        totals.revenue += order.sell_price * qty;
        totals.profit += order.seller_profit * qty;
        totals.commission += order.commission * qty;
        totals.logistics += order.logistic_delivery_fee * qty;
        totals.included_orders += 1;
        totals.items_sold = totals.items_sold.saturating_add(order.amount);
    }

    totals
}

/// Included revenue per UTC day (undated orders are skipped)
pub fn daily_revenue<'a, I>(orders: I) -> BTreeMap<NaiveDate, f64>
where
    I: IntoIterator<Item = &'a RawOrder>,
{
    let mut by_day = BTreeMap::new();

    for order in orders.into_iter().filter(|o| o.is_included()) {
        let Some(date) = order.date else { continue };
        *by_day.entry(date.date_naive()).or_insert(0.0) += order.sell_price * order.quantity();
    }

    by_day
}
