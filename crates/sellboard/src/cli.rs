//! Output formatting for the CLI
//!
//! Tables via comfy-table for humans, pretty JSON for scripts.

use clap::ValueEnum;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use sellboard_core::aggregation::{DateRange, ExpenseBreakdown, FinancialSummary};
use sellboard_core::error::LoadError;
use sellboard_core::models::Stats;
use sellboard_core::CoreError;

/// Expense grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Source,
    Code,
}

// ============================================================================
// Formatters
// ============================================================================

pub fn format_stats(stats: &Stats) -> String {
    let mut table = table(&["Metric", "Value"]);

    let rows = [
        ("Products", format_count(stats.total_products)),
        ("Active orders", format_count(stats.active_orders)),
        ("Pending orders", format_count(stats.pending_orders)),
        ("Revenue", format_money(stats.revenue)),
        ("Profit", format_money(stats.profit)),
        ("Margin", format!("{:.1}%", stats.margin() * 100.0)),
        ("To pay", format_money(stats.to_pay)),
        ("Stock FBO", format_count(stats.fbo_stock)),
        ("Stock FBS", format_count(stats.fbs_stock)),
        ("Stock DBS", format_count(stats.dbs_stock)),
        ("Stock total", format_count(stats.total_stock())),
    ];

    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn format_financial_summary(summary: &FinancialSummary, range: &DateRange) -> String {
    let mut table = table(&["", "Amount"]);
    let orders = &summary.orders;

    let rows = [
        ("Orders", format_count(orders.included_orders)),
        ("Items sold", format_count(orders.items_sold)),
        ("Revenue", format_money(orders.revenue)),
        ("Seller profit", format_money(orders.profit)),
        ("Commission", format_money(orders.commission)),
        ("Logistics", format_money(orders.logistics)),
        ("Expenses", format_money(summary.expenses.total)),
        ("Net profit", format_money(summary.net_profit)),
    ];

    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("Period: {}\n{}", range.display(), table)
}

pub fn format_expenses(breakdown: &ExpenseBreakdown, by: GroupBy, json: bool) -> String {
    let buckets = match by {
        GroupBy::Source => &breakdown.by_source,
        GroupBy::Code => &breakdown.by_code,
    };

    if json {
        return serde_json::to_string_pretty(buckets).unwrap_or_else(|_| "{}".to_string());
    }

    if buckets.is_empty() {
        return "No expenses in this period.".to_string();
    }

    let header = match by {
        GroupBy::Source => "Source",
        GroupBy::Code => "Code",
    };
    let mut table = table(&[header, "Amount", "Share"]);

    let ranked = match by {
        GroupBy::Source => breakdown.top_sources(buckets.len()),
        GroupBy::Code => breakdown.top_codes(buckets.len()),
    };

    for (name, amount) in ranked {
        let share = if breakdown.total > 0.0 {
            amount / breakdown.total * 100.0
        } else {
            0.0
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format_money(amount)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", share)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.add_row(vec![
        Cell::new("Total").fg(Color::Cyan),
        Cell::new(format_money(breakdown.total))
            .fg(Color::Cyan)
            .set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);

    table.to_string()
}

/// Suggestion line printed under a failed command, if one applies
pub fn failure_hint(source: &str, error: &CoreError) -> Option<String> {
    LoadError::from_core_error(source, error)
        .suggestion
        .map(|suggestion| format!("hint: {}", suggestion))
}

/// `--param name=value`
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

// ============================================================================
// Utilities
// ============================================================================

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(*h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// Two decimals with thousands separators
fn format_money(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, cents)
}

fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 10_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn breakdown() -> ExpenseBreakdown {
        ExpenseBreakdown {
            by_source: BTreeMap::from([("FBS".to_string(), 200.0), ("Unknown".to_string(), 50.0)]),
            by_code: BTreeMap::from([("LOGISTICS".to_string(), 250.0)]),
            total: 250.0,
        }
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(999.5), "999.50");
        assert_eq!(format_money(1234567.891), "1 234 567.89");
        assert_eq!(format_money(-2500.0), "-2 500.00");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(42), "42");
        assert_eq!(format_count(9_999), "9999");
        assert_eq!(format_count(12_500), "12.5K");
        assert_eq!(format_count(3_200_000), "3.2M");
    }

    #[test]
    fn test_format_stats_lists_every_metric() {
        let stats = Stats {
            total_products: 12,
            revenue: 2000.0,
            profit: 500.0,
            fbs_stock: 7,
            ..Default::default()
        };
        let output = format_stats(&stats);
        assert!(output.contains("Products"));
        assert!(output.contains("2 000.00"));
        assert!(output.contains("25.0%"));
        assert!(output.contains("Stock total"));
    }

    #[test]
    fn test_format_expenses_by_source_sorted() {
        let output = format_expenses(&breakdown(), GroupBy::Source, false);
        let fbs = output.find("FBS").unwrap();
        let unknown = output.find("Unknown").unwrap();
        assert!(fbs < unknown);
        assert!(output.contains("80.0%"));
    }

    #[test]
    fn test_format_expenses_json() {
        let output = format_expenses(&breakdown(), GroupBy::Code, true);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["LOGISTICS"], 250.0);
    }

    #[test]
    fn test_format_expenses_empty() {
        let output = format_expenses(&ExpenseBreakdown::default(), GroupBy::Source, false);
        assert!(output.contains("No expenses"));
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("status=CREATED").unwrap(),
            ("status".to_string(), "CREATED".to_string())
        );
        assert_eq!(
            parse_param("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_param("status").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_failure_hint() {
        let unauthorized = CoreError::UpstreamStatus {
            path: "/v1/shops".to_string(),
            status: 403,
            code: None,
            message: "forbidden".to_string(),
        };
        let hint = failure_hint("shops", &unauthorized).unwrap();
        assert!(hint.starts_with("hint: "));
        assert!(hint.contains("token"));

        assert_eq!(failure_hint("stats", &CoreError::NotInitialized), None);
    }

    #[test]
    fn test_format_financial_summary_shows_period() {
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
        );
        let output = format_financial_summary(&FinancialSummary::default(), &range);
        assert!(output.starts_with("Period: 2024-03-01 00:00 - 2024-03-31 00:00"));
        assert!(output.contains("Net profit"));
    }
}
