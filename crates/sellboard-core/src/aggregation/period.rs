//! Date-range filtering for orders and expenses
//!
//! Orders carry their timestamp in `date`, expenses in `dateCreated`. Each
//! filter reads its own field.

use crate::models::{RawExpense, RawOrder};
use chrono::{DateTime, Duration, Utc};

/// Inclusive time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[now - days, now]`
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(days as i64),
            end: now,
        }
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start <= *timestamp && *timestamp <= self.end
    }

    /// Display label for the range
    pub fn display(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Orders whose `date` lies inside `range`; undated orders are dropped
pub fn filter_orders<'a>(orders: &'a [RawOrder], range: &DateRange) -> Vec<&'a RawOrder> {
    orders
        .iter()
        .filter(|o| o.date.as_ref().is_some_and(|d| range.contains(d)))
        .collect()
}

/// Expenses whose `dateCreated` lies inside `range`; undated ones are dropped
pub fn filter_expenses<'a>(expenses: &'a [RawExpense], range: &DateRange) -> Vec<&'a RawExpense> {
    expenses
        .iter()
        .filter(|e| e.date_created.as_ref().is_some_and(|d| range.contains(d)))
        .collect()
}
