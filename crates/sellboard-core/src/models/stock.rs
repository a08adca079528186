//! SKU stock records

use super::serde_utils::{deserialize_opt_string, deserialize_u64};
use serde::{Deserialize, Serialize};

/// Warehouse model a stock line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fulfillment {
    /// Stored and shipped by the marketplace
    Fbo,
    /// Stored by the seller, shipped by the marketplace
    Fbs,
    /// Stored and delivered by the seller
    Dbs,
}

impl Fulfillment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FBO" => Some(Fulfillment::Fbo),
            "FBS" => Some(Fulfillment::Fbs),
            "DBS" => Some(Fulfillment::Dbs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub sku_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub sku_title: Option<String>,

    #[serde(default, deserialize_with = "deserialize_u64")]
    pub amount: u64,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub fulfillment_type: Option<String>,
}

impl StockRecord {
    pub fn fulfillment(&self) -> Option<Fulfillment> {
        self.fulfillment_type.as_deref().and_then(Fulfillment::parse)
    }
}
