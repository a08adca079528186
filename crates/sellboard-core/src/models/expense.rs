//! Expense records from `/v1/finance/expenses`

use super::serde_utils::{
    deserialize_f64, deserialize_opt_string, deserialize_timestamp, deserialize_u64,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bucket name for expenses without a source or code
pub const UNKNOWN_BUCKET: &str = "Unknown";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExpense {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,

    /// Creation timestamp; expenses use `dateCreated`, not `date`
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub date_created: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_f64")]
    pub payment_price: f64,

    #[serde(default, deserialize_with = "deserialize_u64")]
    pub amount: u64,

    /// Expense channel (FBS, FBO, marketing, ...)
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub source: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub code: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub status: Option<String>,
}

impl RawExpense {
    pub fn total(&self) -> f64 {
        self.payment_price * self.amount as f64
    }

    pub fn source_bucket(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN_BUCKET)
    }

    pub fn code_bucket(&self) -> &str {
        self.code.as_deref().unwrap_or(UNKNOWN_BUCKET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_source_is_unknown() {
        let expense: RawExpense = serde_json::from_value(json!({
            "source": "  ",
            "paymentPrice": 50,
            "amount": 3
        }))
        .unwrap();
        assert_eq!(expense.source_bucket(), UNKNOWN_BUCKET);
        assert_eq!(expense.code_bucket(), UNKNOWN_BUCKET);
        assert_eq!(expense.total(), 150.0);
    }

    #[test]
    fn test_date_created_field() {
        let expense: RawExpense = serde_json::from_value(json!({
            "date": "2024-01-01",
            "dateCreated": "2024-02-01"
        }))
        .unwrap();
        assert_eq!(
            expense.date_created.unwrap().date_naive().to_string(),
            "2024-02-01"
        );
    }
}
