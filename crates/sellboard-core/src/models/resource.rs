//! Resource names shared by the cache, the collector and the CLI

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical resource held in the session cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKey {
    Shops,
    Products,
    Orders,
    FinanceOrders,
    FinanceExpenses,
    Stocks,
    Invoices,
    Returns,
    ShopInvoices,
    Stats,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 10] = [
        ResourceKey::Shops,
        ResourceKey::Products,
        ResourceKey::Orders,
        ResourceKey::FinanceOrders,
        ResourceKey::FinanceExpenses,
        ResourceKey::Stocks,
        ResourceKey::Invoices,
        ResourceKey::Returns,
        ResourceKey::ShopInvoices,
        ResourceKey::Stats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKey::Shops => "shops",
            ResourceKey::Products => "products",
            ResourceKey::Orders => "orders",
            ResourceKey::FinanceOrders => "financeOrders",
            ResourceKey::FinanceExpenses => "financeExpenses",
            ResourceKey::Stocks => "stocks",
            ResourceKey::Invoices => "invoices",
            ResourceKey::Returns => "returns",
            ResourceKey::ShopInvoices => "shopInvoices",
            ResourceKey::Stats => "stats",
        }
    }

    /// Whether this key holds a fetched collection (everything but `stats`)
    pub fn is_collection(&self) -> bool {
        !matches!(self, ResourceKey::Stats)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKey {
    type Err = String;

    /// Accepts the camelCase cache name or a kebab/snake variant
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        ResourceKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str().to_lowercase() == normalized)
            .ok_or_else(|| format!("Unknown resource: {}", s))
    }
}
