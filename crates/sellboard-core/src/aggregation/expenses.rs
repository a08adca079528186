//! Expense grouping and net profit

use super::orders::{summarize_orders, OrderTotals};
use crate::models::{RawExpense, RawOrder};
use serde::Serialize;
use std::collections::BTreeMap;

/// Expense totals grouped two ways
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseBreakdown {
    pub by_source: BTreeMap<String, f64>,
    pub by_code: BTreeMap<String, f64>,
    pub total: f64,
}

impl ExpenseBreakdown {
    /// Buckets sorted by amount, largest first
    pub fn top_sources(&self, n: usize) -> Vec<(&str, f64)> {
        top(&self.by_source, n)
    }

    pub fn top_codes(&self, n: usize) -> Vec<(&str, f64)> {
        top(&self.by_code, n)
    }
}

fn top(map: &BTreeMap<String, f64>, n: usize) -> Vec<(&str, f64)> {
    let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries.truncate(n);
    entries
}

/// Group `paymentPrice * amount` by `source` and by `code`
///
/// Missing keys go to the "Unknown" bucket.
pub fn group_expenses<'a, I>(expenses: I) -> ExpenseBreakdown
where
    I: IntoIterator<Item = &'a RawExpense>,
{
    let mut breakdown = ExpenseBreakdown::default();

    for expense in expenses {
        let total = expense.total();
        *breakdown
            .by_source
            .entry(expense.source_bucket().to_string())
            .or_insert(0.0) += total;
        *breakdown
            .by_code
            .entry(expense.code_bucket().to_string())
            .or_insert(0.0) += total;
        breakdown.total += total;
    }

    breakdown
}

/// Orders and expenses side by side
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub orders: OrderTotals,
    pub expenses: ExpenseBreakdown,
    /// Revenue minus all expenses; not the same figure as seller profit
    pub net_profit: f64,
}

pub fn financial_summary<'a, O, E>(orders: O, expenses: E) -> FinancialSummary
where
    O: IntoIterator<Item = &'a RawOrder>,
    E: IntoIterator<Item = &'a RawExpense>,
{
    let orders = summarize_orders(orders);
    let expenses = group_expenses(expenses);
    let net_profit = orders.revenue - expenses.total;

    FinancialSummary {
        orders,
        expenses,
        net_profit,
    }
}
