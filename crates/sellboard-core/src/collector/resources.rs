//! Catalog of seller API listing endpoints

use super::envelope::Envelope;
use crate::error::CoreError;
use crate::models::ResourceKey;

/// How an endpoint is scoped to the selected shop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopScope {
    /// Not shop-specific
    None,
    /// `{shopId}` placeholder in the path
    Path,
    /// Query parameter carrying the shop id
    Query(&'static str),
}

/// One listing endpoint and the shape of its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub key: ResourceKey,
    pub path: &'static str,
    pub envelope: Envelope,
    pub shop_scope: ShopScope,
    pub paginated: bool,
}

impl ResourceSpec {
    pub fn shops() -> Self {
        Self {
            key: ResourceKey::Shops,
            path: "/v1/shops",
            envelope: Envelope::PlainArray,
            shop_scope: ShopScope::None,
            paginated: false,
        }
    }

    pub fn products() -> Self {
        Self {
            key: ResourceKey::Products,
            path: "/v1/product/shop/{shopId}",
            envelope: Envelope::Field("productList"),
            shop_scope: ShopScope::Path,
            paginated: true,
        }
    }

    pub fn orders() -> Self {
        Self {
            key: ResourceKey::Orders,
            path: "/v2/fbs/orders",
            envelope: Envelope::PayloadField("orders"),
            shop_scope: ShopScope::Query("shopIds"),
            paginated: true,
        }
    }

    pub fn finance_orders() -> Self {
        Self {
            key: ResourceKey::FinanceOrders,
            path: "/v1/finance/orders",
            envelope: Envelope::Field("orderItems"),
            shop_scope: ShopScope::Query("shopIds"),
            paginated: true,
        }
    }

    pub fn finance_expenses() -> Self {
        Self {
            key: ResourceKey::FinanceExpenses,
            path: "/v1/finance/expenses",
            envelope: Envelope::PayloadField("payments"),
            shop_scope: ShopScope::Query("shopIds"),
            paginated: true,
        }
    }

    pub fn stocks() -> Self {
        Self {
            key: ResourceKey::Stocks,
            path: "/v2/fbs/sku/stocks",
            envelope: Envelope::PayloadField("skuAmountList"),
            shop_scope: ShopScope::None,
            paginated: false,
        }
    }

    pub fn invoices() -> Self {
        Self {
            key: ResourceKey::Invoices,
            path: "/v1/fbs/invoice",
            envelope: Envelope::PayloadResult,
            shop_scope: ShopScope::None,
            paginated: true,
        }
    }

    pub fn returns() -> Self {
        Self {
            key: ResourceKey::Returns,
            path: "/v1/shop/{shopId}/return",
            envelope: Envelope::PlainArray,
            shop_scope: ShopScope::Path,
            paginated: true,
        }
    }

    pub fn shop_invoices() -> Self {
        Self {
            key: ResourceKey::ShopInvoices,
            path: "/v1/shop/{shopId}/invoice",
            envelope: Envelope::PlainArray,
            shop_scope: ShopScope::Path,
            paginated: true,
        }
    }

    /// Endpoint for a collection key; `None` for `stats`, which is derived
    pub fn for_key(key: ResourceKey) -> Option<Self> {
        Some(match key {
            ResourceKey::Shops => Self::shops(),
            ResourceKey::Products => Self::products(),
            ResourceKey::Orders => Self::orders(),
            ResourceKey::FinanceOrders => Self::finance_orders(),
            ResourceKey::FinanceExpenses => Self::finance_expenses(),
            ResourceKey::Stocks => Self::stocks(),
            ResourceKey::Invoices => Self::invoices(),
            ResourceKey::Returns => Self::returns(),
            ResourceKey::ShopInvoices => Self::shop_invoices(),
            ResourceKey::Stats => return None,
        })
    }

    /// Path with the shop substituted and shop query parameter appended
    pub fn resolve(&self, shop_id: Option<i64>) -> Result<(String, Vec<(String, String)>), CoreError> {
        let missing = || CoreError::MissingShopId { key: self.key };

        match self.shop_scope {
            ShopScope::None => Ok((self.path.to_string(), Vec::new())),
            ShopScope::Path => {
                let id = shop_id.ok_or_else(missing)?;
                Ok((self.path.replace("{shopId}", &id.to_string()), Vec::new()))
            }
            ShopScope::Query(param) => {
                let id = shop_id.ok_or_else(missing)?;
                Ok((self.path.to_string(), vec![(param.to_string(), id.to_string())]))
            }
        }
    }
}
